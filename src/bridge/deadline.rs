use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::{Bridge, HostCalls, Termination};
use crate::error::{BridgeError, MechanismError};
use crate::registry::SessionHandle;

/// Async facade that bounds how long a bridge call may take.
///
/// Bridge calls cannot be cancelled once dispatched, so an overrun leaves the
/// call running on the blocking pool and the untrusted side in an unknown
/// state. The facade then treats the bridge as compromised and fails every
/// later call with [`MechanismError::Compromised`].
pub struct DeadlineBridge<H> {
    bridge: Arc<Bridge<H>>,
    timeout: Duration,
    compromised: Arc<AtomicBool>,
}

impl<H> Clone for DeadlineBridge<H> {
    fn clone(&self) -> Self {
        Self {
            bridge: Arc::clone(&self.bridge),
            timeout: self.timeout,
            compromised: Arc::clone(&self.compromised),
        }
    }
}

impl<H: HostCalls + 'static> DeadlineBridge<H> {
    pub fn new(bridge: Arc<Bridge<H>>, timeout: Duration) -> Self {
        Self {
            bridge,
            timeout,
            compromised: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn bridge(&self) -> &Arc<Bridge<H>> {
        &self.bridge
    }

    pub fn is_compromised(&self) -> bool {
        self.compromised.load(Ordering::SeqCst)
    }

    pub async fn load_model(&self, model: Bytes) -> Result<SessionHandle, BridgeError> {
        self.call("load_model", move |bridge| bridge.load_model(&model))
            .await
    }

    /// Returns exactly the bytes written, at most `capacity` of them.
    ///
    /// `capacity` is checked against the bridge limits before anything is allocated.
    pub async fn infer(
        &self,
        session: SessionHandle,
        input: Bytes,
        capacity: usize,
    ) -> Result<Bytes, BridgeError> {
        if capacity == 0 {
            return Err(BridgeError::InvalidParameter("output capacity is zero"));
        }
        if capacity > self.bridge.config().max_output_capacity {
            return Err(BridgeError::InvalidParameter(
                "output capacity exceeds configured maximum",
            ));
        }
        self.call("infer", move |bridge| {
            let mut output = vec![0u8; capacity];
            let written = bridge.infer(session, &input, &mut output)?;
            output.truncate(written);
            Ok(Bytes::from(output))
        })
        .await
    }

    pub async fn terminate(&self, session: SessionHandle) -> Result<Termination, BridgeError> {
        self.call("terminate", move |bridge| bridge.terminate(session))
            .await
    }

    async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        F: FnOnce(&Bridge<H>) -> Result<T, BridgeError> + Send + 'static,
    {
        if self.is_compromised() {
            return Err(MechanismError::Compromised.into());
        }

        let bridge = Arc::clone(&self.bridge);
        let task = tokio::task::spawn_blocking(move || f(&bridge));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                tracing::error!(op, error = %join_err, "bridge call aborted");
                Err(MechanismError::Panicked(join_err.to_string()).into())
            }
            Err(_) => {
                self.compromised.store(true, Ordering::SeqCst);
                tracing::error!(
                    op,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "bridge call overran its deadline, treating untrusted side as compromised"
                );
                Err(MechanismError::DeadlineExceeded.into())
            }
        }
    }
}
