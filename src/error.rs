//! Crate-wide error type.
//!
//! The original C library returns a bare `int` error code from every result callback (`0` =
//! success). We keep that contract at the public boundary (`ZnetError::code`) but give the core an
//! honest typed error to propagate with `?`, rather than threading raw integers through internal
//! routines.

use core::fmt;

/// Every failure this crate can produce or surface to a host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZnetError {
    /// A node id outside `[1, 232]` was passed to a public entry.
    InvalidNodeId(u8),
    /// An endpoint id outside `[0, 127]` was passed to a public entry.
    InvalidEndpointId(u8),
    /// A switch-like value outside `{0x00..=0x63, 0xFE, 0xFF}` was passed to an encoder.
    InvalidValue(u8),
    /// A configuration parameter size other than `1`, `2`, or `4`.
    InvalidConfigSize(u8),
    /// A parse routine needed more bytes than it was given.
    ShortFrame { have: usize, need: usize },
    /// The transport's XOR checksum did not match.
    ChecksumMismatch,
    /// The transport exhausted its retransmit budget without an ACK.
    RetriesExhausted,
    /// A session record's deadline elapsed before a matching reply arrived.
    SessionTimeout,
    /// A controller-wide operation was requested while another was already in flight.
    Busy,
    /// The session was drained by a controller-wide reset (`set_default`) before it completed.
    Cancelled,
    /// The radio reported a nonzero command failure code.
    RadioError(u8),
    /// A required host callback was not supplied at `init`.
    CallbackMissing(&'static str),
    /// A host callback (uart/store) reported failure.
    HostCallback(&'static str),
}

impl ZnetError {
    /// The original library's integer error surface: `0` is success, any other value failure.
    /// Never returns `0` — callers construct `Ok(())`/`Ok(value)` for the success path.
    pub fn code(&self) -> i32 {
        match self {
            ZnetError::InvalidNodeId(_) => 1,
            ZnetError::InvalidEndpointId(_) => 2,
            ZnetError::InvalidValue(_) => 3,
            ZnetError::InvalidConfigSize(_) => 4,
            ZnetError::ShortFrame { .. } => 5,
            ZnetError::ChecksumMismatch => 6,
            ZnetError::RetriesExhausted => 7,
            ZnetError::SessionTimeout => 8,
            ZnetError::Busy => 9,
            ZnetError::Cancelled => 10,
            ZnetError::RadioError(_) => 11,
            ZnetError::CallbackMissing(_) => 12,
            ZnetError::HostCallback(_) => 13,
        }
    }
}

impl fmt::Display for ZnetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZnetError::InvalidNodeId(id) => write!(f, "invalid node id: {id}"),
            ZnetError::InvalidEndpointId(id) => write!(f, "invalid endpoint id: {id}"),
            ZnetError::InvalidValue(v) => write!(f, "invalid switch value: {v:#04x}"),
            ZnetError::InvalidConfigSize(s) => write!(f, "invalid configuration parameter size: {s}"),
            ZnetError::ShortFrame { have, need } => {
                write!(f, "frame too short: have {have}, need {need}")
            }
            ZnetError::ChecksumMismatch => write!(f, "checksum mismatch"),
            ZnetError::RetriesExhausted => write!(f, "retry budget exhausted"),
            ZnetError::SessionTimeout => write!(f, "session timed out"),
            ZnetError::Busy => write!(f, "controller busy with another operation"),
            ZnetError::Cancelled => write!(f, "cancelled by controller reset"),
            ZnetError::RadioError(code) => write!(f, "radio reported failure: {code:#04x}"),
            ZnetError::CallbackMissing(name) => write!(f, "required callback missing: {name}"),
            ZnetError::HostCallback(name) => write!(f, "host callback failed: {name}"),
        }
    }
}

impl std::error::Error for ZnetError {}

pub type Result<T> = core::result::Result<T, ZnetError>;
