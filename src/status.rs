use std::fmt;

use crate::error::{ErrorKind, ShapeError};

/// Status reported by an untrusted-side handler.
///
/// Only meaningful when the call itself dispatched and returned; a mechanism
/// failure means no status was received at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum LogicStatus {
    Ok = 0,
    InvalidParameter = 1,
    NotFound = 2,
    BufferTooSmall = 3,
    Unexpected = 4,
    Failure = 5,
    /// The input does not fit the model's declared tensor shape.
    InvalidShape = 6,
}

impl LogicStatus {
    pub const fn is_ok(self) -> bool {
        matches!(self, LogicStatus::Ok)
    }

    /// Error class this status maps to, or `None` for `Ok`.
    pub const fn kind(self) -> Option<ErrorKind> {
        match self {
            LogicStatus::Ok => None,
            LogicStatus::InvalidParameter => Some(ErrorKind::InvalidParameter),
            LogicStatus::NotFound => Some(ErrorKind::NotFound),
            LogicStatus::BufferTooSmall => Some(ErrorKind::BufferTooSmall),
            LogicStatus::Unexpected => Some(ErrorKind::Unexpected),
            LogicStatus::Failure => Some(ErrorKind::Failure),
            LogicStatus::InvalidShape => Some(ErrorKind::InvalidShape),
        }
    }
}

impl fmt::Display for LogicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            None => f.write_str("ok"),
            Some(kind) => kind.fmt(f),
        }
    }
}

impl From<ShapeError> for LogicStatus {
    fn from(_: ShapeError) -> Self {
        LogicStatus::InvalidShape
    }
}
