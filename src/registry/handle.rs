use std::fmt;
use std::hash::Hash;

/// An opaque 64-bit identifier where `0` means "invalid".
pub trait Handle: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Human-readable name of the handle family, used in errors and logs.
    const KIND: &'static str;

    fn from_raw(raw: u64) -> Self;

    fn raw(self) -> u64;

    fn is_valid(self) -> bool {
        self.raw() != 0
    }
}

/// Trusted-side identifier for a live inference session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub const INVALID: Self = Self(0);
}

impl Handle for SessionHandle {
    const KIND: &'static str = "session";

    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s:{}", self.0)
    }
}

/// Untrusted-side identifier for a live engine object.
///
/// Meaningless to the trusted side except as a token to hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DelegateHandle(u64);

impl DelegateHandle {
    pub const INVALID: Self = Self(0);
}

impl Handle for DelegateHandle {
    const KIND: &'static str = "delegate";

    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DelegateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d:{}", self.0)
    }
}
