use http::request::Parts;
use log::debug;
use qcos_core::{Intercept, Result};
use std::sync::Arc;

/// Ordered steps every outgoing request passes through, each exactly once.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn Intercept>>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn with_step(mut self, step: impl Intercept) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Names of the steps in the order they run.
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order. Stops at the first failing step.
    pub fn apply(&self, req: &mut Parts) -> Result<()> {
        for step in &self.steps {
            step.intercept(req)?;
            debug!("pipeline step {} applied to {} {}", step.name(), req.method, req.uri);
        }
        Ok(())
    }
}
