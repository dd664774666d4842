//! Trusted side of the bridge.
//!
//! [`Bridge`] owns the session registry and the channel to the untrusted
//! side. Nothing the untrusted side returns reaches caller memory before it
//! has been checked against the call contract.

pub mod config;
pub mod deadline;
pub mod dispatch;

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::attestation::{Evidence, EvidenceGenerator, EvidenceProvider};
use crate::error::{AttestError, BridgeError, EvidenceError, RegistryError};
use crate::registry::{DelegateHandle, Handle, Registry, SessionHandle};
use crate::status::LogicStatus;

pub use config::BridgeConfig;
pub use dispatch::{HostCalls, InferReply, LoadReply};

/// Outcome of a successful [`Bridge::terminate`].
///
/// The session is gone whatever `release` says; the untrusted side's verdict
/// is kept for diagnostics only.
#[derive(Debug)]
pub struct Termination {
    pub delegate: DelegateHandle,
    pub release: Result<(), BridgeError>,
}

impl Termination {
    pub fn is_clean(&self) -> bool {
        self.release.is_ok()
    }
}

/// Trusted-side bridge context.
///
/// Calls block the calling thread for the full round trip. Calls on
/// different sessions may run concurrently; calls on the same session are
/// only as safe as the engine session behind it is reentrant.
pub struct Bridge<H> {
    host: H,
    sessions: Registry<SessionHandle, DelegateHandle>,
    evidence: Option<EvidenceProvider>,
    config: BridgeConfig,
}

impl<H: HostCalls> Bridge<H> {
    pub fn new(host: H, config: BridgeConfig) -> Self {
        Self {
            host,
            sessions: Registry::new(),
            evidence: None,
            config,
        }
    }

    /// Attach an attestation library, using the configured format preferences.
    pub fn with_evidence_generator(mut self, generator: Arc<dyn EvidenceGenerator>) -> Self {
        self.evidence = Some(EvidenceProvider::new(
            generator,
            self.config.evidence_formats.clone(),
        ));
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Number of live sessions.
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_live(&self, session: SessionHandle) -> bool {
        self.sessions.contains(session)
    }

    pub fn session_handles(&self) -> Vec<SessionHandle> {
        self.sessions.handles()
    }

    /// Have the untrusted side load `model` and open a session for it.
    pub fn load_model(&self, model: &[u8]) -> Result<SessionHandle, BridgeError> {
        if model.is_empty() {
            return Err(BridgeError::InvalidParameter("model is empty"));
        }
        if model.len() > self.config.max_model_size {
            return Err(BridgeError::InvalidParameter(
                "model exceeds configured maximum size",
            ));
        }

        let reply = self.host.delegate_load(model)?;
        let mut guard = ReleaseGuard::new(&self.host, reply.delegate);
        if reply.delegate.is_valid() && self.sessions.contains_value(&reply.delegate) {
            // Owned by another live session: releasing it would tear that one down.
            guard.disarm();
        }

        if !reply.status.is_ok() {
            tracing::warn!(status = %reply.status, "untrusted side failed to load model");
            return Err(BridgeError::from_status(
                reply.status,
                "load",
                reply.delegate.raw(),
            ));
        }
        if !reply.delegate.is_valid() {
            tracing::warn!("untrusted side returned a zero delegate handle with ok status");
            return Err(BridgeError::Unexpected(
                "zero delegate handle on successful load".into(),
            ));
        }

        match self.sessions.create_unique(reply.delegate) {
            Ok(session) => {
                guard.disarm();
                tracing::info!(%session, delegate = %reply.delegate, "session opened");
                Ok(session)
            }
            Err(RegistryError::AlreadyBound) => {
                guard.disarm();
                tracing::warn!(delegate = %reply.delegate, "delegate handle reused by untrusted side");
                Err(BridgeError::Unexpected(format!(
                    "delegate handle {} already bound to a live session",
                    reply.delegate
                )))
            }
            Err(e) => Err(BridgeError::Failure(e.to_string())),
        }
    }

    /// Run inference for `session`, writing the result into `output`.
    ///
    /// Returns the number of bytes written. On `BufferTooSmall` the error
    /// carries the exact size needed and `output` is untouched; the same holds
    /// for every other error.
    pub fn infer(
        &self,
        session: SessionHandle,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, BridgeError> {
        if !session.is_valid() {
            return Err(BridgeError::InvalidParameter("session handle is zero"));
        }
        if input.is_empty() {
            return Err(BridgeError::InvalidParameter("input is empty"));
        }
        if output.is_empty() {
            return Err(BridgeError::InvalidParameter("output capacity is zero"));
        }
        if input.len() > self.config.max_input_size {
            return Err(BridgeError::InvalidParameter(
                "input exceeds configured maximum size",
            ));
        }
        if output.len() > self.config.max_output_capacity {
            return Err(BridgeError::InvalidParameter(
                "output capacity exceeds configured maximum",
            ));
        }

        let delegate = self.sessions.lookup(session).ok_or(BridgeError::NotFound {
            what: SessionHandle::KIND,
            handle: session.raw(),
        })?;

        let capacity = output.len();
        let mut staging = Zeroizing::new(vec![0u8; capacity]);
        let reply = self.host.delegate_infer(delegate, input, &mut staging)?;

        match reply.status {
            LogicStatus::Ok => {
                if reply.required > capacity {
                    tracing::warn!(
                        %session,
                        required = reply.required,
                        capacity,
                        "untrusted side claimed success beyond capacity"
                    );
                    return Err(BridgeError::Unexpected(format!(
                        "reported {} bytes written into a {capacity} byte buffer",
                        reply.required
                    )));
                }
                output[..reply.required].copy_from_slice(&staging[..reply.required]);
                tracing::debug!(%session, written = reply.required, "inference complete");
                Ok(reply.required)
            }
            LogicStatus::BufferTooSmall => {
                if reply.required <= capacity {
                    return Err(BridgeError::Unexpected(format!(
                        "buffer too small reported for {} bytes with capacity {capacity}",
                        reply.required
                    )));
                }
                // No caller could ever supply more than the configured maximum.
                if reply.required > self.config.max_output_capacity {
                    tracing::warn!(
                        %session,
                        required = reply.required,
                        max = self.config.max_output_capacity,
                        "untrusted side demanded an output beyond the configured maximum"
                    );
                    return Err(BridgeError::Unexpected(format!(
                        "required size {} exceeds maximum output capacity {}",
                        reply.required, self.config.max_output_capacity
                    )));
                }
                tracing::debug!(%session, required = reply.required, capacity, "output buffer too small");
                Err(BridgeError::BufferTooSmall {
                    required: reply.required,
                    capacity,
                })
            }
            status => Err(BridgeError::from_status(status, DelegateHandle::KIND, delegate.raw())),
        }
    }

    /// Run inference into a fresh buffer, retrying once at the reported size
    /// if `capacity_hint` turns out too small.
    ///
    /// The hint is clamped to the configured maximum output capacity, and a
    /// reported size beyond that maximum never reaches the allocator.
    pub fn infer_to_vec(
        &self,
        session: SessionHandle,
        input: &[u8],
        capacity_hint: usize,
    ) -> Result<Vec<u8>, BridgeError> {
        let mut output = vec![0u8; capacity_hint.clamp(1, self.config.max_output_capacity)];
        let written = match self.infer(session, input, &mut output) {
            Ok(n) => n,
            Err(BridgeError::BufferTooSmall { required, .. }) => {
                output = vec![0u8; required];
                self.infer(session, input, &mut output)?
            }
            Err(e) => return Err(e),
        };
        output.truncate(written);
        Ok(output)
    }

    /// Close `session`.
    ///
    /// The trusted-side record is removed before the untrusted side is asked
    /// to release its engine, so a failing release never leaves it dangling.
    pub fn terminate(&self, session: SessionHandle) -> Result<Termination, BridgeError> {
        if !session.is_valid() {
            return Err(BridgeError::InvalidParameter("session handle is zero"));
        }

        let delegate = self.sessions.remove(session).ok_or(BridgeError::NotFound {
            what: SessionHandle::KIND,
            handle: session.raw(),
        })?;

        let release = match self.host.delegate_release(delegate) {
            Ok(LogicStatus::Ok) => Ok(()),
            Ok(status) => Err(BridgeError::from_status(
                status,
                DelegateHandle::KIND,
                delegate.raw(),
            )),
            Err(e) => Err(BridgeError::Mechanism(e)),
        };

        match &release {
            Ok(()) => tracing::info!(%session, %delegate, "session terminated"),
            Err(e) => tracing::warn!(
                %session,
                %delegate,
                error = %e,
                "session terminated, untrusted release failed"
            ),
        }

        Ok(Termination { delegate, release })
    }

    /// Produce attestation evidence for this trusted side.
    pub fn get_attestation_evidence(&self) -> Result<Evidence, EvidenceError> {
        match &self.evidence {
            Some(provider) => provider.get_evidence(),
            None => Err(EvidenceError::Failure(AttestError::NotConfigured)),
        }
    }
}

/// Releases a delegate handle on drop unless disarmed.
struct ReleaseGuard<'a, H: HostCalls> {
    host: &'a H,
    delegate: DelegateHandle,
    armed: bool,
}

impl<'a, H: HostCalls> ReleaseGuard<'a, H> {
    fn new(host: &'a H, delegate: DelegateHandle) -> Self {
        Self {
            host,
            delegate,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<H: HostCalls> Drop for ReleaseGuard<'_, H> {
    fn drop(&mut self) {
        if !self.armed || !self.delegate.is_valid() {
            return;
        }
        match self.host.delegate_release(self.delegate) {
            Ok(LogicStatus::Ok) => {
                tracing::debug!(delegate = %self.delegate, "released delegate from failed load")
            }
            Ok(status) => tracing::warn!(
                delegate = %self.delegate,
                %status,
                "cleanup release after failed load was rejected"
            ),
            Err(e) => tracing::warn!(
                delegate = %self.delegate,
                error = %e,
                "cleanup release after failed load did not dispatch"
            ),
        }
    }
}
