//! Structured pipeline logging.
//!
//! Every step of a run logs its start, the values it produced and its
//! outcome with the run name and step attached.

use std::fmt::Display;

use tracing::{error, info, warn, Span};

use crate::error::Step;

/// Step logger for a single pipeline run.
#[derive(Debug, Clone)]
pub struct StepLogger {
    run: String,
}

impl StepLogger {
    /// Create a logger for a run, named after the asset being analysed.
    pub fn new(run: impl Into<String>) -> Self {
        Self { run: run.into() }
    }

    pub fn run(&self) -> &str {
        &self.run
    }

    /// Log the start of a step.
    pub fn log_start(&self, step: Step) {
        info!(run = %self.run, step = %step, "Step started");
    }

    /// Log a value produced by a step.
    pub fn log_value(&self, step: Step, label: &str, value: impl Display) {
        info!(run = %self.run, step = %step, "{}: {}", label, value);
    }

    /// Log the HTTP status a step completed with.
    pub fn log_status(&self, step: Step, status: u16) {
        info!(run = %self.run, step = %step, status, "Step completed");
    }

    pub fn log_warning(&self, step: Step, message: &str) {
        warn!(run = %self.run, step = %step, "{}", message);
    }

    pub fn log_error(&self, step: Step, message: &str) {
        error!(run = %self.run, step = %step, "Step failed: {}", message);
    }

    /// Create a tracing span for this run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("pipeline", run = %self.run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_logger_creation() {
        let logger = StepLogger::new("interview");
        assert_eq!(logger.run(), "interview");

        logger.log_start(Step::CreateAsset);
        logger.log_value(Step::CreateAsset, "Media Asset Id", "nb:cid:UUID:1");
        logger.log_status(Step::CreateAsset, 201);
    }
}
