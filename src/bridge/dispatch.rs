//! The call seam between the trusted and untrusted sides.
//!
//! Every call carries two levels of outcome. The outer `Result` is the
//! mechanism status: `Err` means the call never dispatched or its return
//! channel cannot be trusted, and nothing else in the reply exists. The inner
//! [`LogicStatus`] is the handler's own verdict, and the other reply fields
//! are untrusted until the bridge has checked them against it.

use crate::error::MechanismError;
use crate::registry::DelegateHandle;
use crate::status::LogicStatus;

/// Reply to a model load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReply {
    pub status: LogicStatus,
    /// Non-zero on success. A zero handle with an `Ok` status is a contract violation.
    pub delegate: DelegateHandle,
}

impl LoadReply {
    pub fn failed(status: LogicStatus) -> Self {
        Self {
            status,
            delegate: DelegateHandle::INVALID,
        }
    }
}

/// Reply to an inference call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferReply {
    pub status: LogicStatus,
    /// Bytes the result occupies. Populated for `Ok` and `BufferTooSmall`.
    pub required: usize,
}

impl InferReply {
    pub fn failed(status: LogicStatus) -> Self {
        Self {
            status,
            required: 0,
        }
    }
}

/// Services the untrusted side provides to the trusted side.
///
/// Calls are synchronous and not cancellable: once dispatched they run to
/// completion. `output` passed to `delegate_infer` is only borrowed for the
/// call; its length is the declared capacity.
pub trait HostCalls: Send + Sync {
    fn delegate_load(&self, model: &[u8]) -> Result<LoadReply, MechanismError>;

    fn delegate_infer(
        &self,
        delegate: DelegateHandle,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<InferReply, MechanismError>;

    fn delegate_release(&self, delegate: DelegateHandle) -> Result<LogicStatus, MechanismError>;
}

impl<T: HostCalls + ?Sized> HostCalls for std::sync::Arc<T> {
    fn delegate_load(&self, model: &[u8]) -> Result<LoadReply, MechanismError> {
        (**self).delegate_load(model)
    }

    fn delegate_infer(
        &self,
        delegate: DelegateHandle,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<InferReply, MechanismError> {
        (**self).delegate_infer(delegate, input, output)
    }

    fn delegate_release(&self, delegate: DelegateHandle) -> Result<LogicStatus, MechanismError> {
        (**self).delegate_release(delegate)
    }
}
