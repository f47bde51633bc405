use thiserror::Error;

/// Errors from reading or writing the wire protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The two-byte opcode is not one of `ls`, `dw`, `up`, `dl`.
    #[error("unknown opcode {:?}", String::from_utf8_lossy(.0))]
    UnknownOp([u8; 2]),

    /// A confirmation byte was neither `y` nor `n`.
    #[error("bad confirmation byte 0x{0:02x}")]
    BadAnswer(u8),

    /// A status reply was not three ASCII digits.
    #[error("bad status bytes {:?}", String::from_utf8_lossy(.0))]
    BadStatus([u8; 3]),

    /// The filename line exceeded the permitted length.
    #[error("filename longer than {max} bytes")]
    FilenameTooLong { max: usize },

    /// The filename line was not valid UTF-8.
    #[error("filename is not valid UTF-8")]
    FilenameNotUtf8,

    /// An announced payload exceeds what the receiver accepts.
    #[error("payload of {size} bytes exceeds limit of {max}")]
    PayloadTooLarge { size: u64, max: u64 },

    /// Transport failure, including the peer hanging up mid-exchange.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
