use std::collections::HashMap;
use std::time::Instant;

/// Observer for per-frame recording events.
///
/// Runs on the capture thread, so implementations must be cheap.
pub trait PipelineLogger: Send {
    /// A composite frame was handed to the encoder.
    fn frame_submitted(&mut self);

    /// A frame never reached the encoder; `reason` is a short stable label.
    fn frame_dropped(&mut self, reason: &str);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-recording summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_submitted(&mut self) {}
    fn frame_dropped(&mut self, _reason: &str) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running totals for one pipeline stage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTiming {
    pub count: usize,
    pub total_ms: f64,
    pub max_ms: f64,
}

impl StageTiming {
    fn record(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_ms += duration_ms;
        self.max_ms = self.max_ms.max(duration_ms);
    }

    pub fn avg_ms(&self) -> f64 {
        self.total_ms / self.count.max(1) as f64
    }
}

/// Accumulates stage timings and drop counts, and logs a summary through
/// the `log` facade when the recording ends. Memory use is constant for
/// the length of the recording.
pub struct StdoutPipelineLogger {
    timings: HashMap<String, StageTiming>,
    drops: HashMap<String, usize>,
    submitted: usize,
    start_time: Instant,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            drops: HashMap::new(),
            submitted: 0,
            start_time: Instant::now(),
        }
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn drops_for(&self, reason: &str) -> usize {
        self.drops.get(reason).copied().unwrap_or(0)
    }

    pub fn timings_for(&self, stage: &str) -> Option<StageTiming> {
        self.timings.get(stage).copied()
    }

    /// Returns the formatted summary string, or `None` if nothing happened.
    pub fn summary_string(&self) -> Option<String> {
        if self.submitted == 0 && self.drops.is_empty() && self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let dropped: usize = self.drops.values().sum();
        let mut lines = vec![format!(
            "Recording summary ({} frames written, {dropped} dropped, {:.1}s):",
            self.submitted,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let timing = &self.timings[stage];
            lines.push(format!(
                "  {stage:10}: avg {:6.2}ms  max {:6.2}ms",
                timing.avg_ms(),
                timing.max_ms
            ));
        }

        let mut reasons: Vec<_> = self.drops.iter().collect();
        reasons.sort();
        for (reason, count) in reasons {
            lines.push(format!("  dropped ({reason}): {count}"));
        }

        if self.submitted > 0 && elapsed_ms > 0.0 {
            let fps = self.submitted as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame_submitted(&mut self) {
        self.submitted += 1;
    }

    fn frame_dropped(&mut self, reason: &str) {
        *self.drops.entry(reason.to_string()).or_default() += 1;
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
