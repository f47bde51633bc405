use crate::error::{ProtocolError, ProtocolResult};

/// Three-digit status code exchanged at the end of an operation.
///
/// Control flow only ever looks at the leading digit (the
/// [`StatusClass`]); the full value is a logging convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status(u16);

/// What the leading digit of a status means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    NotFound,
    Aborted,
    TransferError,
}

impl Status {
    /// Operation completed.
    pub const SUCCESS: Status = Status(100);
    /// File absent or already marked deleted.
    pub const NOT_FOUND: Status = Status(201);
    /// Client declined the download confirmation.
    pub const DOWNLOAD_ABORTED: Status = Status(301);
    /// Client declined the overwrite confirmation.
    pub const UPLOAD_ABORTED: Status = Status(302);
    /// Client declined the delete confirmation.
    pub const DELETE_ABORTED: Status = Status(303);
    /// Malformed request (unknown opcode, bad filename).
    pub const BAD_REQUEST: Status = Status(400);
    /// Client reported a failed download on its side.
    pub const CLIENT_REPORTED_FAILURE: Status = Status(401);
    /// I/O failure while streaming content.
    pub const TRANSFER_FAILED: Status = Status(402);
    /// Client reported a failed listing.
    pub const LIST_FAILED: Status = Status(404);

    pub fn class(self) -> StatusClass {
        match self.0 / 100 {
            1 => StatusClass::Success,
            2 => StatusClass::NotFound,
            3 => StatusClass::Aborted,
            _ => StatusClass::TransferError,
        }
    }

    pub fn is_success(self) -> bool {
        self.class() == StatusClass::Success
    }

    /// The three ASCII digits as sent on the wire.
    pub fn as_bytes(self) -> [u8; 3] {
        let d = self.0;
        [
            b'0' + (d / 100) as u8,
            b'0' + (d / 10 % 10) as u8,
            b'0' + (d % 10) as u8,
        ]
    }

    /// Parse three wire bytes into a status.
    pub fn from_bytes(raw: [u8; 3]) -> ProtocolResult<Self> {
        if raw.iter().any(|b| !b.is_ascii_digit()) {
            return Err(ProtocolError::BadStatus(raw));
        }
        let value = (raw[0] - b'0') as u16 * 100
            + (raw[1] - b'0') as u16 * 10
            + (raw[2] - b'0') as u16;
        if value < 100 {
            return Err(ProtocolError::BadStatus(raw));
        }
        Ok(Status(value))
    }

    pub fn code(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
