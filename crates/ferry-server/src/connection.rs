//! Per-connection dispatcher: reads the opcode and filename, resolves
//! the resource, and hands off to the matching operation.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use ferry_protocol::{wire, OpCode, ProtocolError, Status};
use ferry_store::validate_name;

use crate::error::OpResult;
use crate::ops;
use crate::service::Service;

/// Run one client conversation to completion. Malformed requests get a
/// `400` status and the connection is dropped; everything else resolves
/// to the operation's own status.
pub async fn serve_connection<S>(svc: &Service, stream: &mut S) -> OpResult<Status>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let op = match wire::read_opcode(stream).await {
        Ok(op) => op,
        Err(e @ ProtocolError::UnknownOp(_)) => {
            warn!(error = %e, "rejecting request");
            let _ = wire::write_status(stream, Status::BAD_REQUEST).await;
            return Ok(Status::BAD_REQUEST);
        }
        Err(e) => return Err(e.into()),
    };

    if op == OpCode::List {
        debug!("dispatching list");
        return ops::list(svc, stream).await;
    }

    let name = match wire::read_filename(stream, svc.config().max_filename_len).await {
        Ok(name) => name,
        Err(e @ (ProtocolError::FilenameTooLong { .. } | ProtocolError::FilenameNotUtf8)) => {
            warn!(error = %e, "rejecting request");
            let _ = wire::write_status(stream, Status::BAD_REQUEST).await;
            return Ok(Status::BAD_REQUEST);
        }
        Err(e) => return Err(e.into()),
    };
    if let Err(e) = validate_name(&name) {
        warn!(error = %e, "rejecting request");
        let _ = wire::write_status(stream, Status::BAD_REQUEST).await;
        return Ok(Status::BAD_REQUEST);
    }

    let resource = svc.registry().get_or_create(&name);
    debug!(op = %op, file = %name, "dispatching");
    let outcome = match op {
        OpCode::Download => ops::download(svc, &resource, stream).await,
        OpCode::Upload => ops::upload(svc, &resource, stream).await,
        OpCode::Delete => ops::delete(svc, &resource, stream).await,
        OpCode::List => unreachable!("list is dispatched before the filename read"),
    };
    match &outcome {
        Ok(status) => info!(op = %op, file = %name, %status, "operation finished"),
        Err(e) => warn!(op = %op, file = %name, error = %e, "operation failed"),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use ferry_protocol::StatusClass;
    use ferry_registry::LifeState;
    use ferry_store::{FileStore, MemoryStore};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    const IDLE: Duration = Duration::from_secs(5);

    fn test_service() -> Arc<Service> {
        Arc::new(Service::new(
            ServerConfig {
                read_timeout_secs: 5,
                ..ServerConfig::default()
            },
            Arc::new(MemoryStore::new()),
        ))
    }

    /// Spawn the server side of one conversation and hand back the
    /// client end of the pipe.
    fn connect(svc: &Arc<Service>) -> (DuplexStream, tokio::task::JoinHandle<OpResult<Status>>) {
        let (client, mut server) = tokio::io::duplex(4 * 4096);
        let svc = Arc::clone(svc);
        let task = tokio::spawn(async move { serve_connection(&svc, &mut server).await });
        (client, task)
    }

    async fn client_download(svc: &Arc<Service>, name: &str) -> Option<Vec<u8>> {
        let (mut client, task) = connect(svc);
        wire::write_opcode(&mut client, OpCode::Download).await.unwrap();
        wire::write_filename(&mut client, name).await.unwrap();
        if !wire::read_answer(&mut client).await.unwrap() {
            task.await.unwrap().unwrap();
            return None;
        }
        wire::write_answer(&mut client, true).await.unwrap();
        let data = wire::read_content(&mut client, u64::MAX, IDLE).await.unwrap();
        wire::write_status(&mut client, Status::SUCCESS).await.unwrap();
        assert_eq!(task.await.unwrap().unwrap(), Status::SUCCESS);
        Some(data.to_vec())
    }

    async fn client_upload(svc: &Arc<Service>, name: &str, data: &[u8], overwrite: bool) -> Status {
        let (mut client, task) = connect(svc);
        wire::write_opcode(&mut client, OpCode::Upload).await.unwrap();
        wire::write_filename(&mut client, name).await.unwrap();
        if wire::read_answer(&mut client).await.unwrap() {
            wire::write_answer(&mut client, overwrite).await.unwrap();
            if !overwrite {
                return task.await.unwrap().unwrap();
            }
        }
        wire::write_content(&mut client, data).await.unwrap();
        let status = wire::read_status(&mut client).await.unwrap();
        assert_eq!(task.await.unwrap().unwrap(), status);
        status
    }

    async fn client_delete(svc: &Arc<Service>, name: &str, confirm: bool) -> Status {
        let (mut client, task) = connect(svc);
        wire::write_opcode(&mut client, OpCode::Delete).await.unwrap();
        wire::write_filename(&mut client, name).await.unwrap();
        if !wire::read_answer(&mut client).await.unwrap() {
            let outcome = task.await.unwrap().unwrap();
            assert_eq!(outcome, Status::NOT_FOUND);
            return outcome;
        }
        wire::write_answer(&mut client, confirm).await.unwrap();
        if !confirm {
            return task.await.unwrap().unwrap();
        }
        let status = wire::read_status(&mut client).await.unwrap();
        assert_eq!(task.await.unwrap().unwrap(), status);
        status
    }

    async fn client_list(svc: &Arc<Service>) -> Vec<String> {
        let (mut client, task) = connect(svc);
        wire::write_opcode(&mut client, OpCode::List).await.unwrap();
        let mut listing = String::new();
        client.read_to_string(&mut listing).await.unwrap();
        wire::write_status(&mut client, Status::SUCCESS).await.unwrap();
        assert_eq!(task.await.unwrap().unwrap(), Status::SUCCESS);
        listing.lines().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn miss_then_upload_then_hit() {
        let svc = test_service();
        svc.refresh_snapshot().await.unwrap();

        // First download finds nothing.
        assert_eq!(client_download(&svc, "report.pdf").await, None);

        // Upload sees no existing file, so no overwrite prompt, and wins.
        let status = client_upload(&svc, "report.pdf", b"quarterly numbers", true).await;
        assert_eq!(status, Status::SUCCESS);

        // Second download streams exactly what was uploaded.
        assert_eq!(
            client_download(&svc, "report.pdf").await.unwrap(),
            b"quarterly numbers"
        );
        assert_eq!(client_list(&svc).await, vec!["report.pdf"]);
    }

    #[tokio::test]
    async fn overwrite_prompt_and_decline() {
        let svc = test_service();
        client_upload(&svc, "data.bin", b"old", true).await;

        let status = client_upload(&svc, "data.bin", b"new", false).await;
        assert_eq!(status, Status::UPLOAD_ABORTED);
        assert_eq!(svc.store().read("data.bin").await.unwrap(), b"old");

        let status = client_upload(&svc, "data.bin", b"new", true).await;
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(svc.store().read("data.bin").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn delete_and_eviction() {
        let svc = test_service();
        client_upload(&svc, "data.bin", b"payload", true).await;
        assert!(svc.registry().contains("data.bin"));

        assert_eq!(client_delete(&svc, "data.bin", true).await, Status::SUCCESS);
        assert!(!svc.registry().contains("data.bin"), "resource not evicted");
        assert!(!svc.store().exists("data.bin").await.unwrap());
        assert!(client_list(&svc).await.is_empty());

        // The filename is fully reusable afterwards.
        assert_eq!(client_delete(&svc, "data.bin", true).await, Status::NOT_FOUND);
        assert_eq!(
            client_upload(&svc, "data.bin", b"reborn", true).await,
            Status::SUCCESS
        );
        assert_eq!(client_download(&svc, "data.bin").await.unwrap(), b"reborn");
    }

    #[tokio::test]
    async fn declined_delete_leaves_the_file_usable() {
        let svc = test_service();
        client_upload(&svc, "keep.txt", b"precious", true).await;

        assert_eq!(
            client_delete(&svc, "keep.txt", false).await,
            Status::DELETE_ABORTED
        );
        // The decline rolled the announcement back: the file is still
        // reachable, not wedged behind a stale deletion mark.
        assert_eq!(client_download(&svc, "keep.txt").await.unwrap(), b"precious");
        assert_eq!(client_delete(&svc, "keep.txt", true).await, Status::SUCCESS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn delete_defers_to_announced_upload() {
        let svc = test_service();
        client_upload(&svc, "data.bin", b"original", true).await;
        let resource = svc.registry().get_or_create("data.bin");

        // Client A starts a delete and stalls at the confirmation
        // prompt, holding exclusive access.
        let (mut deleter, delete_task) = connect(&svc);
        wire::write_opcode(&mut deleter, OpCode::Delete).await.unwrap();
        wire::write_filename(&mut deleter, "data.bin").await.unwrap();
        assert!(wire::read_answer(&mut deleter).await.unwrap());

        // Client B's upload announces itself and queues on the lock.
        let upload_task = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { client_upload(&svc, "data.bin", b"replacement", true).await })
        };
        while resource.pending_writers() == 0 {
            tokio::task::yield_now().await;
        }

        // A confirms; the delete commits but must not evict.
        wire::write_answer(&mut deleter, true).await.unwrap();
        assert_eq!(
            wire::read_status(&mut deleter).await.unwrap(),
            Status::SUCCESS
        );
        assert_eq!(delete_task.await.unwrap().unwrap(), Status::SUCCESS);

        // B's upload now runs on the same resource and resurrects it.
        assert_eq!(upload_task.await.unwrap(), Status::SUCCESS);
        assert_eq!(resource.life_state(), LifeState::Live);
        let registered = svc.registry().get_or_create("data.bin");
        assert!(
            Arc::ptr_eq(&resource, &registered),
            "a duplicate resource was registered for the file"
        );
        assert_eq!(svc.store().read("data.bin").await.unwrap(), b"replacement");
    }

    #[tokio::test]
    async fn client_hangup_mid_upload_releases_the_file() {
        let svc = test_service();
        client_upload(&svc, "data.bin", b"original", true).await;

        let (mut client, task) = connect(&svc);
        wire::write_opcode(&mut client, OpCode::Upload).await.unwrap();
        wire::write_filename(&mut client, "data.bin").await.unwrap();
        assert!(wire::read_answer(&mut client).await.unwrap());
        wire::write_answer(&mut client, true).await.unwrap();
        // Announce a payload, send part of it, vanish.
        client.write_u64(64).await.unwrap();
        client.write_all(b"partial").await.unwrap();
        drop(client);

        assert!(task.await.unwrap().is_err());

        // The exclusive lock was released and the delete mark untouched:
        // the file is immediately usable by the next client.
        assert_eq!(svc.store().read("data.bin").await.unwrap(), b"original");
        assert_eq!(
            client_upload(&svc, "data.bin", b"fresh", true).await,
            Status::SUCCESS
        );
        assert_eq!(client_download(&svc, "data.bin").await.unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn slow_but_live_upload_completes() {
        let svc = Arc::new(Service::new(
            ServerConfig {
                read_timeout_secs: 1,
                ..ServerConfig::default()
            },
            Arc::new(MemoryStore::new()),
        ));

        let (mut client, task) = connect(&svc);
        wire::write_opcode(&mut client, OpCode::Upload).await.unwrap();
        wire::write_filename(&mut client, "slow.bin").await.unwrap();
        assert!(!wire::read_answer(&mut client).await.unwrap());

        // 8 KiB trickled in 1 KiB pieces with pauses well under the idle
        // bound that together exceed it. The upload must not be cut off.
        let payload = vec![7u8; 8 * 1024];
        client.write_u64(payload.len() as u64).await.unwrap();
        for piece in payload.chunks(1024) {
            client.write_all(piece).await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        assert_eq!(
            wire::read_status(&mut client).await.unwrap(),
            Status::SUCCESS
        );
        assert_eq!(task.await.unwrap().unwrap(), Status::SUCCESS);
        assert_eq!(svc.store().read("slow.bin").await.unwrap(), payload);
    }

    #[tokio::test]
    async fn declined_download_releases_shared_access() {
        let svc = test_service();
        client_upload(&svc, "data.bin", b"payload", true).await;

        let (mut client, task) = connect(&svc);
        wire::write_opcode(&mut client, OpCode::Download).await.unwrap();
        wire::write_filename(&mut client, "data.bin").await.unwrap();
        assert!(wire::read_answer(&mut client).await.unwrap());
        wire::write_answer(&mut client, false).await.unwrap();
        assert_eq!(task.await.unwrap().unwrap(), Status::DOWNLOAD_ABORTED);

        // The early return left the reader group: a writer gets straight
        // in instead of waiting on a leaked shared hold.
        assert_eq!(
            client_upload(&svc, "data.bin", b"next", true).await,
            Status::SUCCESS
        );
        assert_eq!(svc.store().read("data.bin").await.unwrap(), b"next");
    }

    #[tokio::test]
    async fn oversized_upload_is_refused_with_a_transfer_status() {
        let svc = Arc::new(Service::new(
            ServerConfig {
                max_file_size: 16,
                read_timeout_secs: 5,
                ..ServerConfig::default()
            },
            Arc::new(MemoryStore::new()),
        ));

        let (mut client, task) = connect(&svc);
        wire::write_opcode(&mut client, OpCode::Upload).await.unwrap();
        wire::write_filename(&mut client, "big.bin").await.unwrap();
        assert!(!wire::read_answer(&mut client).await.unwrap());
        client.write_u64(1024).await.unwrap();

        let status = wire::read_status(&mut client).await.unwrap();
        assert_eq!(status.class(), StatusClass::TransferError);
        assert_eq!(task.await.unwrap().unwrap(), Status::TRANSFER_FAILED);
        assert!(!svc.store().exists("big.bin").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_opcode_and_bad_filename_get_bad_request() {
        let svc = test_service();

        let (mut client, task) = connect(&svc);
        client.write_all(b"xx").await.unwrap();
        assert_eq!(
            wire::read_status(&mut client).await.unwrap(),
            Status::BAD_REQUEST
        );
        assert_eq!(task.await.unwrap().unwrap(), Status::BAD_REQUEST);

        let (mut client, task) = connect(&svc);
        wire::write_opcode(&mut client, OpCode::Download).await.unwrap();
        wire::write_filename(&mut client, "../etc/passwd").await.unwrap();
        assert_eq!(
            wire::read_status(&mut client).await.unwrap(),
            Status::BAD_REQUEST
        );
        assert_eq!(task.await.unwrap().unwrap(), Status::BAD_REQUEST);
        assert!(svc.registry().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_downloads_overlap_and_block_upload() {
        let svc = test_service();
        client_upload(&svc, "data.bin", b"shared read", true).await;
        let resource = svc.registry().get_or_create("data.bin");

        // Two downloads stall mid-conversation, both inside the shared
        // section.
        let mut stalled = Vec::new();
        for _ in 0..2 {
            let (mut client, task) = connect(&svc);
            wire::write_opcode(&mut client, OpCode::Download).await.unwrap();
            wire::write_filename(&mut client, "data.bin").await.unwrap();
            assert!(wire::read_answer(&mut client).await.unwrap());
            stalled.push((client, task));
        }

        // An upload queued now cannot reach its existence answer.
        let (mut writer, writer_task) = connect(&svc);
        wire::write_opcode(&mut writer, OpCode::Upload).await.unwrap();
        wire::write_filename(&mut writer, "data.bin").await.unwrap();
        while resource.pending_writers() == 0 {
            tokio::task::yield_now().await;
        }
        let mut probe = [0u8; 1];
        assert!(
            tokio::time::timeout(Duration::from_millis(100), writer.read_exact(&mut probe))
            .await
            .is_err(),
            "upload progressed while downloads were active"
        );

        // Let both downloads finish; the upload then gets through.
        for (mut client, task) in stalled {
            wire::write_answer(&mut client, true).await.unwrap();
            let data = wire::read_content(&mut client, u64::MAX, IDLE).await.unwrap();
            assert_eq!(&data[..], b"shared read");
            wire::write_status(&mut client, Status::SUCCESS).await.unwrap();
            assert_eq!(task.await.unwrap().unwrap(), Status::SUCCESS);
        }

        assert!(wire::read_answer(&mut writer).await.unwrap());
        wire::write_answer(&mut writer, true).await.unwrap();
        wire::write_content(&mut writer, b"exclusive write").await.unwrap();
        assert_eq!(
            wire::read_status(&mut writer).await.unwrap(),
            Status::SUCCESS
        );
        assert_eq!(writer_task.await.unwrap().unwrap(), Status::SUCCESS);
        assert_eq!(
            svc.store().read("data.bin").await.unwrap(),
            b"exclusive write"
        );
    }
}
