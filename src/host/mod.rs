//! Untrusted side: owns the engine objects and serves delegate calls.

pub mod buffer;
pub mod engine;

#[cfg(feature = "mock")]
pub mod mock;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::bridge::dispatch::{HostCalls, InferReply, LoadReply};
use crate::error::MechanismError;
use crate::registry::{DelegateHandle, Handle, Registry};
use crate::status::LogicStatus;

use self::buffer::OutputBuffer;
use self::engine::{EngineSession, InferenceEngine};

/// In-process untrusted side.
///
/// Maps delegate handles to live engine sessions. An engine panic is caught
/// here and surfaces as a mechanism failure instead of unwinding across the
/// boundary.
pub struct DelegateHost<E> {
    engine: E,
    engines: Registry<DelegateHandle, Arc<dyn EngineSession>>,
}

impl<E: InferenceEngine> DelegateHost<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            engines: Registry::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Number of live engine records.
    pub fn live_engines(&self) -> usize {
        self.engines.len()
    }

    pub fn is_live(&self, delegate: DelegateHandle) -> bool {
        self.engines.contains(delegate)
    }

    fn load(&self, model: &[u8]) -> LoadReply {
        if model.is_empty() {
            return LoadReply::failed(LogicStatus::InvalidParameter);
        }

        let session = match self.engine.load(model) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "engine rejected model");
                return LoadReply::failed(LogicStatus::Failure);
            }
        };

        match self.engines.create(session) {
            Ok(delegate) => {
                tracing::debug!(%delegate, model_len = model.len(), "engine session created");
                LoadReply {
                    status: LogicStatus::Ok,
                    delegate,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "engine registry full");
                LoadReply::failed(LogicStatus::Failure)
            }
        }
    }

    fn infer(&self, delegate: DelegateHandle, input: &[u8], output: &mut [u8]) -> InferReply {
        if !delegate.is_valid() || input.is_empty() || output.is_empty() {
            return InferReply::failed(LogicStatus::InvalidParameter);
        }

        let Some(session) = self.engines.lookup(delegate) else {
            return InferReply::failed(LogicStatus::NotFound);
        };

        let spec = session.input_spec();
        let resolved = match spec.resolve(input.len()) {
            Ok(shape) => shape,
            Err(e) => {
                tracing::debug!(%delegate, error = %e, "input does not fit declared shape");
                return InferReply::failed(e.into());
            }
        };
        let tensor = match spec.bind(input, &resolved) {
            Ok(tensor) => tensor,
            Err(e) => return InferReply::failed(e.into()),
        };

        let result = match session.run(tensor) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) => {
                tracing::warn!(%delegate, error = %e, "engine run failed");
                return InferReply::failed(LogicStatus::Failure);
            }
        };

        let reply = OutputBuffer::new(output).fill(&result);
        tracing::debug!(
            %delegate,
            shape = ?resolved,
            required = reply.required,
            status = %reply.status,
            "inference served"
        );
        reply
    }

    fn release(&self, delegate: DelegateHandle) -> LogicStatus {
        // The record goes first so a failing shutdown cannot leave it behind.
        let Some(session) = self.engines.remove(delegate) else {
            return LogicStatus::NotFound;
        };
        match session.shutdown() {
            Ok(()) => {
                tracing::debug!(%delegate, "engine session released");
                LogicStatus::Ok
            }
            Err(e) => {
                tracing::warn!(%delegate, error = %e, "engine shutdown failed");
                LogicStatus::Failure
            }
        }
    }
}

impl<E: InferenceEngine> HostCalls for DelegateHost<E> {
    fn delegate_load(&self, model: &[u8]) -> Result<LoadReply, MechanismError> {
        contain("load", || self.load(model))
    }

    fn delegate_infer(
        &self,
        delegate: DelegateHandle,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<InferReply, MechanismError> {
        contain("infer", || self.infer(delegate, input, output))
    }

    fn delegate_release(&self, delegate: DelegateHandle) -> Result<LogicStatus, MechanismError> {
        contain("release", || self.release(delegate))
    }
}

fn contain<T>(call: &'static str, f: impl FnOnce() -> T) -> Result<T, MechanismError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let reason = panic_message(payload.as_ref());
        tracing::error!(call, %reason, "untrusted handler panicked");
        MechanismError::Panicked(format!("{call}: {reason}"))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::mock::MockEngine;
    use super::*;
    use crate::tensor::{DType, TensorSpec};

    fn host() -> DelegateHost<MockEngine> {
        DelegateHost::new(MockEngine::new(
            TensorSpec::new("x", DType::F32, vec![-1, 4]),
            3,
        ))
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn load_returns_nonzero_handle() {
        let host = host();
        let reply = host.delegate_load(b"model").unwrap();
        assert_eq!(reply.status, LogicStatus::Ok);
        assert!(reply.delegate.is_valid());
        assert_eq!(host.live_engines(), 1);
    }

    #[test]
    fn empty_model_rejected() {
        let host = host();
        let reply = host.delegate_load(b"").unwrap();
        assert_eq!(reply.status, LogicStatus::InvalidParameter);
        assert_eq!(reply.delegate, DelegateHandle::INVALID);
    }

    #[test]
    fn infer_reports_required_when_too_small() {
        let host = host();
        let d = host.delegate_load(b"model").unwrap().delegate;
        let input = f32_bytes(&[1.0; 8]);
        let mut out = [0u8; 8];
        let reply = host.delegate_infer(d, &input, &mut out).unwrap();
        assert_eq!(reply.status, LogicStatus::BufferTooSmall);
        assert_eq!(reply.required, 12);
        assert_eq!(out, [0u8; 8]);
    }

    #[test]
    fn infer_rejects_unresolvable_input() {
        let host = host();
        let d = host.delegate_load(b"model").unwrap().delegate;
        let input = f32_bytes(&[1.0; 3]);
        let mut out = [0u8; 16];
        let reply = host.delegate_infer(d, &input, &mut out).unwrap();
        assert_eq!(reply.status, LogicStatus::InvalidShape);
    }

    #[test]
    fn engine_run_error_is_failure() {
        let host = DelegateHost::new(
            MockEngine::new(TensorSpec::new("x", DType::F32, vec![-1]), 1).with_run_failure(),
        );
        let d = host.delegate_load(b"model").unwrap().delegate;
        let mut out = [0u8; 4];
        let reply = host.delegate_infer(d, &f32_bytes(&[1.0]), &mut out).unwrap();
        assert_eq!(reply.status, LogicStatus::Failure);
        assert_eq!(out, [0u8; 4]);
        assert!(host.is_live(d));
    }

    #[test]
    fn release_twice_is_not_found() {
        let host = host();
        let d = host.delegate_load(b"model").unwrap().delegate;
        assert_eq!(host.delegate_release(d).unwrap(), LogicStatus::Ok);
        assert_eq!(host.delegate_release(d).unwrap(), LogicStatus::NotFound);
    }

    #[test]
    fn failed_shutdown_still_drops_record() {
        let host = DelegateHost::new(
            MockEngine::new(TensorSpec::new("x", DType::F32, vec![-1]), 1)
                .with_shutdown_failure(),
        );
        let d = host.delegate_load(b"model").unwrap().delegate;
        assert_eq!(host.delegate_release(d).unwrap(), LogicStatus::Failure);
        assert!(!host.is_live(d));
        assert_eq!(host.live_engines(), 0);
    }

    #[test]
    fn engine_panic_is_a_mechanism_failure() {
        let host = DelegateHost::new(
            MockEngine::new(TensorSpec::new("x", DType::F32, vec![-1]), 1).with_panic_on_run(),
        );
        let d = host.delegate_load(b"model").unwrap().delegate;
        let mut out = [0u8; 4];
        let err = host
            .delegate_infer(d, &f32_bytes(&[1.0]), &mut out)
            .unwrap_err();
        assert!(matches!(err, MechanismError::Panicked(_)));
    }
}
