//! The four client operations.
//!
//! Each function owns the whole wire conversation for its operation and
//! returns the status it settled on; `Err` means the transport or the
//! storage backend gave out mid-exchange. Synchronization brackets are
//! structured so that every exit path — including errors — releases
//! exactly what it acquired: shared access via an explicit
//! acquire/run/release sandwich, exclusive access via an RAII guard.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use ferry_protocol::{wire, ProtocolError, ProtocolResult, Status};
use ferry_registry::FileResource;

use crate::error::{OpError, OpResult};
use crate::service::Service;

/// Await a client-supplied reply, bounding the wait. The bound is a
/// liveness check on a peer that owes us bytes; expiry is a transport
/// failure, not a normal end-of-stream.
async fn timed<T, F>(limit: Duration, fut: F) -> OpResult<T>
where
    F: Future<Output = ProtocolResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(OpError::from),
        Err(_) => Err(OpError::Protocol(ProtocolError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "client reply timed out",
        )))),
    }
}

/// Download: join the file's reader group, stream the contents, leave.
/// Any number of downloads of the same file run concurrently; a writer
/// waits until the whole group has left.
pub async fn download<S>(svc: &Service, res: &FileResource, stream: &mut S) -> OpResult<Status>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    res.join_readers().await;
    debug!(file = res.name(), "download holds shared access");
    let outcome = download_shared(svc, res, stream).await;
    res.leave_readers().await;
    outcome
}

async fn download_shared<S>(
    svc: &Service,
    res: &FileResource,
    stream: &mut S,
) -> OpResult<Status>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let name = res.name();
    // A file marked for deletion answers "not found" without touching
    // storage, even if the physical removal has not happened yet.
    if res.is_defunct() || !svc.store().exists(name).await? {
        wire::write_answer(stream, false).await?;
        return Ok(Status::NOT_FOUND);
    }
    wire::write_answer(stream, true).await?;
    if !timed(svc.config().read_timeout(), wire::read_answer(stream)).await? {
        return Ok(Status::DOWNLOAD_ABORTED);
    }

    let data = svc.store().read(name).await?;
    wire::write_content(stream, &data).await?;

    // The client's verdict is for the log only; resource state is not
    // affected by what it reports.
    let status = timed(svc.config().read_timeout(), wire::read_status(stream)).await?;
    if status.is_success() {
        info!(file = name, bytes = data.len(), "download sent");
        Ok(Status::SUCCESS)
    } else {
        warn!(file = name, %status, "client reported download failure");
        Ok(Status::CLIENT_REPORTED_FAILURE)
    }
}

/// Upload: announce intent, take the file exclusively, receive and store
/// the content. The announcement is visible to a concurrent delete before
/// this task ever holds the lock, which is what keeps the resource from
/// being evicted out from under a queued upload.
pub async fn upload<S>(svc: &Service, res: &FileResource, stream: &mut S) -> OpResult<Status>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    res.announce_writer();
    let guard = res.lock_exclusive().await;
    res.retire_writer();
    debug!(file = res.name(), "upload holds exclusive access");

    let outcome = upload_locked(svc, res, stream).await;
    if matches!(&outcome, Ok(s) if s.is_success()) {
        if let Err(e) = svc.refresh_snapshot().await {
            warn!(error = %e, "snapshot rebuild failed after upload");
        }
    }
    drop(guard);
    outcome
}

async fn upload_locked<S>(svc: &Service, res: &FileResource, stream: &mut S) -> OpResult<Status>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let name = res.name();
    let exists = svc.store().exists(name).await?;
    wire::write_answer(stream, exists).await?;
    if exists && !timed(svc.config().read_timeout(), wire::read_answer(stream)).await? {
        // Declined overwrite: nothing written, lifecycle untouched.
        return Ok(Status::UPLOAD_ABORTED);
    }

    // The timeout lives inside read_content, per arrival of bytes: a
    // slow client that keeps sending is never cut off mid-upload.
    let data = match wire::read_content(
        stream,
        svc.config().max_file_size,
        svc.config().read_timeout(),
    )
    .await
    {
        Ok(data) => data,
        Err(ProtocolError::PayloadTooLarge { size, max }) => {
            warn!(file = name, size, max, "upload refused, payload too large");
            wire::write_status(stream, Status::TRANSFER_FAILED).await?;
            return Ok(Status::TRANSFER_FAILED);
        }
        Err(e) => return Err(e.into()),
    };

    match svc.store().write(name, &data).await {
        Ok(()) => {
            // A stored upload resurrects the filename even if a delete
            // had marked it and not yet been evicted.
            res.resurrect();
            wire::write_status(stream, Status::SUCCESS).await?;
            info!(file = name, bytes = data.len(), "upload stored");
            Ok(Status::SUCCESS)
        }
        Err(e) => {
            // The write may have landed partially; either way the file
            // is no longer known to be removed.
            res.resurrect();
            let _ = wire::write_status(stream, Status::TRANSFER_FAILED).await;
            Err(e.into())
        }
    }
}

/// Delete: announce on the resource before waiting for the lock, remove
/// the file, then decide eviction while still holding exclusive access.
pub async fn delete<S>(svc: &Service, res: &Arc<FileResource>, stream: &mut S) -> OpResult<Status>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if !res.begin_delete() {
        // A prior delete already claimed this file; answer without
        // waiting for the lock.
        wire::write_answer(stream, false).await?;
        return Ok(Status::NOT_FOUND);
    }
    let guard = res.lock_exclusive().await;
    debug!(file = res.name(), "delete holds exclusive access");
    let outcome = delete_locked(svc, res, stream).await;
    // Anything short of a committed removal returns the resource to
    // live; after a commit this is a no-op.
    res.abort_delete();
    drop(guard);
    outcome
}

async fn delete_locked<S>(svc: &Service, res: &Arc<FileResource>, stream: &mut S) -> OpResult<Status>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let name = res.name();
    if !svc.store().exists(name).await? {
        wire::write_answer(stream, false).await?;
        return Ok(Status::NOT_FOUND);
    }
    wire::write_answer(stream, true).await?;
    if !timed(svc.config().read_timeout(), wire::read_answer(stream)).await? {
        info!(file = name, "delete aborted by client");
        return Ok(Status::DELETE_ABORTED);
    }

    svc.store().remove(name).await?;
    res.commit_delete();
    let status_write = wire::write_status(stream, Status::SUCCESS).await;

    // The eviction check runs while exclusive access is still held, so
    // no new reader or writer can slip between the removal and the
    // decision. An upload that already announced keeps the entry alive
    // and will resurrect it.
    let evicted = svc.registry().evict_if_unclaimed(res);
    info!(file = name, evicted, "file deleted");
    if let Err(e) = svc.refresh_snapshot().await {
        warn!(error = %e, "snapshot rebuild failed after delete");
    }
    status_write?;
    Ok(Status::SUCCESS)
}

/// List: join the snapshot's lister group for the whole conversation, so
/// a rebuild never runs mid-listing, then stream the cached names.
pub async fn list<S>(svc: &Service, stream: &mut S) -> OpResult<Status>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let names = svc.snapshot().begin_listing().await;
    let outcome = list_shared(svc, &names, stream).await;
    svc.snapshot().end_listing().await;
    outcome
}

async fn list_shared<S>(svc: &Service, names: &[String], stream: &mut S) -> OpResult<Status>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    for name in names {
        wire::write_filename(stream, name).await?;
    }
    // End of listing is signaled by closing our write side.
    stream
        .shutdown()
        .await
        .map_err(|e| OpError::Protocol(e.into()))?;

    let status = timed(svc.config().read_timeout(), wire::read_status(stream)).await?;
    if status.is_success() {
        info!(files = names.len(), "listing sent");
        Ok(Status::SUCCESS)
    } else {
        warn!(%status, "client reported listing failure");
        Ok(Status::LIST_FAILED)
    }
}
