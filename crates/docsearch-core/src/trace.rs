//! Stage timing for search requests.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    pub label: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingStep {
    pub label: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub total_ms: u64,
    pub steps: Vec<TimingStep>,
}

/// Append-only while a request runs; `finish` freezes it into a `Trace`.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    steps: Vec<TraceStep>,
}

impl TraceRecorder {
    pub fn new() -> Self { Self::default() }

    pub fn record(&mut self, label: impl Into<String>, elapsed: Duration, detail: Option<String>) {
        let step = TraceStep { label: label.into(), duration_ms: round_ms(elapsed), detail };
        tracing::debug!(label = %step.label, duration_ms = step.duration_ms, detail = ?step.detail, "stage finished");
        self.steps.push(step);
    }

    pub fn len(&self) -> usize { self.steps.len() }

    pub fn is_empty(&self) -> bool { self.steps.is_empty() }

    pub fn finish(self) -> Trace { Trace { steps: self.steps } }
}

/// A completed, immutable stage trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    steps: Vec<TraceStep>,
}

impl Trace {
    pub fn steps(&self) -> &[TraceStep] { &self.steps }

    /// Sum of the observed stage latencies.
    pub fn total_ms(&self) -> u64 { self.steps.iter().map(|s| s.duration_ms).sum() }

    pub fn timing(&self) -> Timing {
        Timing {
            total_ms: self.total_ms(),
            steps: self.steps.iter().map(|s| TimingStep { label: s.label.clone(), duration_ms: s.duration_ms }).collect(),
        }
    }
}

/// Wall-clock timer for one stage.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch(Instant);

impl Stopwatch {
    pub fn start() -> Self { Self(Instant::now()) }

    pub fn elapsed(&self) -> Duration { self.0.elapsed() }
}

fn round_ms(d: Duration) -> u64 {
    (d.as_secs_f64() * 1000.0).round() as u64
}
