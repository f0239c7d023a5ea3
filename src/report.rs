//! Step outcome reporting for the repair pipeline.
//!
//! The pipeline reports through a capability supplied by the caller instead
//! of writing to process-wide console state; only the binary owns stdout.

/// How a pipeline step resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step changed the working tree (or produced the output archive).
    Applied,
    /// Inspection showed the defect is absent; the step did not run.
    Skipped,
    /// The provider's policy for this step is a documented identity
    /// operation.
    NoOp,
}

impl StepOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::Applied => "applied",
            StepOutcome::Skipped => "skipped",
            StepOutcome::NoOp => "no-op",
        }
    }
}

/// Observer for step outcomes and recoverable warnings.
pub trait Reporter {
    fn step(&mut self, step: &str, outcome: StepOutcome, detail: &str);
    fn warn(&mut self, message: &str);
}

/// Reporter used by the CLI: indented console lines plus tracing events.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn step(&mut self, step: &str, outcome: StepOutcome, detail: &str) {
        tracing::info!(step, outcome = outcome.label(), detail);
        if detail.is_empty() {
            println!("    {step}: {}", outcome.label());
        } else {
            println!("    {step}: {} ({detail})", outcome.label());
        }
    }

    fn warn(&mut self, message: &str) {
        tracing::warn!(message);
        println!("    WARNING: {message}");
    }
}

/// Collects events for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub steps: Vec<(String, StepOutcome)>,
    pub warnings: Vec<String>,
}

impl Reporter for RecordingReporter {
    fn step(&mut self, step: &str, outcome: StepOutcome, _detail: &str) {
        self.steps.push((step.to_string(), outcome));
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

impl RecordingReporter {
    /// Outcome recorded for `step`, if the pipeline reached it.
    pub fn outcome(&self, step: &str) -> Option<StepOutcome> {
        self.steps
            .iter()
            .find(|(name, _)| name == step)
            .map(|(_, outcome)| *outcome)
    }
}
