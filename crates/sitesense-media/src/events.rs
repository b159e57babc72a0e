//! Structured pipeline events.
//!
//! The pipeline reports progress through an [`EventSink`] instead of writing
//! status lines directly; the default sink forwards to `tracing`.

use tracing::{info, warn};

/// One observable step of a pipeline run.
#[derive(Debug, Clone)]
pub enum PipelineEvent<'a> {
    SourceProbed {
        width: u32,
        height: u32,
        fps: f64,
        duration: f64,
    },
    StrategyStarted {
        strategy: &'a str,
    },
    StrategySucceeded {
        strategy: &'a str,
        elapsed_ms: u128,
        bytes: u64,
    },
    StrategyFailed {
        strategy: &'a str,
        elapsed_ms: u128,
        reason: &'a str,
    },
    StrategySkipped {
        strategy: &'a str,
    },
    Completed {
        strategy: &'a str,
        bytes: u64,
        elapsed_ms: u128,
    },
}

/// Receiver for pipeline events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent<'_>);
}

/// Default sink that forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent<'_>) {
        match event {
            PipelineEvent::SourceProbed {
                width,
                height,
                fps,
                duration,
            } => {
                info!(width, height, fps, duration, "Source probed");
            }
            PipelineEvent::StrategyStarted { strategy } => {
                info!(strategy, "Encoding strategy started");
            }
            PipelineEvent::StrategySucceeded {
                strategy,
                elapsed_ms,
                bytes,
            } => {
                info!(strategy, elapsed_ms, bytes, "Encoding strategy succeeded");
            }
            PipelineEvent::StrategyFailed {
                strategy,
                elapsed_ms,
                reason,
            } => {
                warn!(strategy, elapsed_ms, reason, "Encoding strategy failed");
            }
            PipelineEvent::StrategySkipped { strategy } => {
                info!(strategy, "Encoding strategy unavailable, skipped");
            }
            PipelineEvent::Completed {
                strategy,
                bytes,
                elapsed_ms,
            } => {
                info!(strategy, bytes, elapsed_ms, "Pipeline run completed");
            }
        }
    }
}
