//! Wire protocol for the Ferry transfer service.
//!
//! Every conversation is a synchronous request/reply exchange over one
//! stream connection:
//!
//! 1. Client sends a two-byte opcode (`ls`, `dw`, `up`, `dl`).
//! 2. For everything but `ls`, client sends the filename as one
//!    newline-terminated line.
//! 3. Server answers existence with a single `y`/`n` byte; the client
//!    confirms with its own `y`/`n` where the operation calls for it.
//! 4. File content travels as a `u64` big-endian length prefix followed
//!    by exactly that many raw bytes, in 4 KiB chunks.
//! 5. The side that received something reports a three-ASCII-digit
//!    status (`100` success, `2xx` not found, `3xx` aborted, `4xx`
//!    transfer error). Only the leading digit carries meaning; the exact
//!    values are a logging convention.
//!
//! Directory listings are streamed as `<name>\n` lines, after which the
//! server shuts down its write side and waits for the client's status.

pub mod error;
pub mod opcode;
pub mod status;
pub mod wire;

pub use error::{ProtocolError, ProtocolResult};
pub use opcode::OpCode;
pub use status::{Status, StatusClass};
