use crate::error::{ProtocolError, ProtocolResult};

/// The four operations a client can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    List,
    Download,
    Upload,
    Delete,
}

impl OpCode {
    /// Decode the two-byte code that opens every conversation.
    pub fn from_bytes(code: [u8; 2]) -> ProtocolResult<Self> {
        match &code {
            b"ls" => Ok(Self::List),
            b"dw" => Ok(Self::Download),
            b"up" => Ok(Self::Upload),
            b"dl" => Ok(Self::Delete),
            _ => Err(ProtocolError::UnknownOp(code)),
        }
    }

    pub fn as_bytes(self) -> [u8; 2] {
        match self {
            Self::List => *b"ls",
            Self::Download => *b"dw",
            Self::Upload => *b"up",
            Self::Delete => *b"dl",
        }
    }

    /// Lowercase operation name, used in log lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Download => "download",
            Self::Upload => "upload",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
