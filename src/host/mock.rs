use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::engine::{EngineSession, InferenceEngine};
use crate::error::EngineError;
use crate::tensor::{TensorRef, TensorSpec};

/// Mock inference engine for tests and simulation mode.
///
/// Every session produces `output_width` little-endian f32 values for any
/// accepted input: value `j` is `element_count * (j + 1)`.
///
/// # Security Warning
///
/// This engine computes nothing meaningful and must never back a production
/// deployment. Enable it only via `features = ["mock"]`.
#[derive(Clone)]
pub struct MockEngine {
    input: TensorSpec,
    output_width: usize,
    fail_loads: bool,
    fail_runs: bool,
    fail_shutdown: bool,
    panic_on_run: bool,
    counters: Arc<MockCounters>,
}

/// Call counters shared between a [`MockEngine`] and its sessions.
#[derive(Debug, Default)]
pub struct MockCounters {
    loads: AtomicUsize,
    runs: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl MockCounters {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl MockEngine {
    pub fn new(input: TensorSpec, output_width: usize) -> Self {
        Self {
            input,
            output_width,
            fail_loads: false,
            fail_runs: false,
            fail_shutdown: false,
            panic_on_run: false,
            counters: Arc::new(MockCounters::default()),
        }
    }

    /// Reject every model.
    pub fn with_load_failure(mut self) -> Self {
        self.fail_loads = true;
        self
    }

    /// Sessions report an error from every `run`.
    pub fn with_run_failure(mut self) -> Self {
        self.fail_runs = true;
        self
    }

    /// Sessions report an error from `shutdown`.
    pub fn with_shutdown_failure(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    /// Sessions panic inside `run`.
    pub fn with_panic_on_run(mut self) -> Self {
        self.panic_on_run = true;
        self
    }

    pub fn counters(&self) -> Arc<MockCounters> {
        Arc::clone(&self.counters)
    }

    /// Bytes every inference produces.
    pub fn output_size(&self) -> usize {
        self.output_width * std::mem::size_of::<f32>()
    }
}

impl InferenceEngine for MockEngine {
    fn load(&self, model: &[u8]) -> Result<Arc<dyn EngineSession>, EngineError> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads {
            return Err(EngineError::LoadFailed(format!(
                "mock engine refused {} byte model",
                model.len()
            )));
        }
        Ok(Arc::new(MockSession {
            input: self.input.clone(),
            output_width: self.output_width,
            fail_runs: self.fail_runs,
            fail_shutdown: self.fail_shutdown,
            panic_on_run: self.panic_on_run,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockSession {
    input: TensorSpec,
    output_width: usize,
    fail_runs: bool,
    fail_shutdown: bool,
    panic_on_run: bool,
    counters: Arc<MockCounters>,
}

impl EngineSession for MockSession {
    fn input_spec(&self) -> &TensorSpec {
        &self.input
    }

    fn run(&self, input: TensorRef<'_>) -> Result<Vec<u8>, EngineError> {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_run {
            panic!("mock engine fault");
        }
        if self.fail_runs {
            return Err(EngineError::RunFailed(format!(
                "mock engine refused {} byte {} input",
                input.data.len(),
                input.dtype
            )));
        }
        let n = input.element_count() as f32;
        Ok((0..self.output_width)
            .flat_map(|j| (n * (j + 1) as f32).to_le_bytes())
            .collect())
    }

    fn shutdown(&self) -> Result<(), EngineError> {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        if self.fail_shutdown {
            return Err(EngineError::ShutdownFailed("mock shutdown fault".into()));
        }
        Ok(())
    }
}
