use std::collections::HashMap;
use std::time::Instant;

/// What became of one completed remote call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
    /// Accepted and drawn.
    Applied,
    /// Arrived for an old session, an old mode, or behind a newer result.
    Discarded,
    Failed,
}

/// Cross-cutting observer for capture session events.
///
/// Keeps the controller free of any particular output: the CLI wants a
/// summary at exit, the desktop and tests want nothing.
pub trait SessionLogger: Send {
    /// A polling tick fired; `dispatched` is false when it was skipped
    /// because too many calls were in flight.
    fn tick(&mut self, dispatched: bool);

    /// A remote call finished after `duration_ms`.
    fn call(&mut self, endpoint: &str, duration_ms: f64, outcome: CallOutcome);

    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn tick(&mut self, _dispatched: bool) {}
    fn call(&mut self, _endpoint: &str, _duration_ms: f64, _outcome: CallOutcome) {}
    fn info(&mut self, _message: &str) {}
}

/// Collects per-endpoint latency and call outcomes and reports them
/// through `log` when the session ends.
pub struct StatsSessionLogger {
    latencies: HashMap<String, Vec<f64>>,
    outcomes: HashMap<CallOutcome, usize>,
    ticks: usize,
    skipped: usize,
    start_time: Instant,
}

impl StatsSessionLogger {
    pub fn new() -> Self {
        Self {
            latencies: HashMap::new(),
            outcomes: HashMap::new(),
            ticks: 0,
            skipped: 0,
            start_time: Instant::now(),
        }
    }

    pub fn latencies_for(&self, endpoint: &str) -> Option<&[f64]> {
        self.latencies.get(endpoint).map(|v| v.as_slice())
    }

    pub fn count(&self, outcome: CallOutcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Returns the formatted summary, or `None` if nothing happened.
    pub fn summary_string(&self) -> Option<String> {
        if self.ticks == 0 && self.latencies.is_empty() {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Session summary ({} ticks, {} skipped, {elapsed:.1}s):",
            self.ticks, self.skipped
        )];

        let mut endpoints: Vec<_> = self.latencies.keys().collect();
        endpoints.sort();
        for endpoint in endpoints {
            let durations = &self.latencies[endpoint];
            let total: f64 = durations.iter().sum();
            let avg = total / durations.len() as f64;
            let max = durations.iter().cloned().fold(0.0, f64::max);
            lines.push(format!(
                "  {endpoint:12}: {:4} calls  avg {avg:6.1}ms  max {max:6.1}ms",
                durations.len()
            ));
        }

        lines.push(format!(
            "  applied {}  discarded {}  failed {}",
            self.count(CallOutcome::Applied),
            self.count(CallOutcome::Discarded),
            self.count(CallOutcome::Failed)
        ));

        let applied = self.count(CallOutcome::Applied);
        if applied > 0 && elapsed > 0.0 {
            lines.push(format!(
                "  Overlay refresh: {:.1} per second",
                applied as f64 / elapsed
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StatsSessionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLogger for StatsSessionLogger {
    fn tick(&mut self, dispatched: bool) {
        self.ticks += 1;
        if !dispatched {
            self.skipped += 1;
        }
    }

    fn call(&mut self, endpoint: &str, duration_ms: f64, outcome: CallOutcome) {
        self.latencies
            .entry(endpoint.to_string())
            .or_default()
            .push(duration_ms);
        *self.outcomes.entry(outcome).or_default() += 1;
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullSessionLogger;
        logger.tick(true);
        logger.call("/detect", 5.0, CallOutcome::Applied);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_call_records_latency_and_outcome() {
        let mut logger = StatsSessionLogger::new();
        logger.call("/detect", 20.0, CallOutcome::Applied);
        logger.call("/detect", 30.0, CallOutcome::Discarded);
        logger.call("/recognize", 5.0, CallOutcome::Failed);

        let detect = logger.latencies_for("/detect").unwrap();
        assert_eq!(detect.len(), 2);
        assert_relative_eq!(detect.iter().sum::<f64>() / 2.0, 25.0);
        assert_eq!(logger.count(CallOutcome::Applied), 1);
        assert_eq!(logger.count(CallOutcome::Discarded), 1);
        assert_eq!(logger.count(CallOutcome::Failed), 1);
    }

    #[test]
    fn test_skipped_ticks_counted() {
        let mut logger = StatsSessionLogger::new();
        logger.tick(true);
        logger.tick(false);
        logger.tick(true);
        assert_eq!(logger.ticks(), 3);
        assert!(logger.summary_string().unwrap().contains("1 skipped"));
    }

    #[test]
    fn test_summary_lists_endpoints() {
        let mut logger = StatsSessionLogger::new();
        logger.tick(true);
        logger.call("/detect", 12.0, CallOutcome::Applied);
        logger.call("/recognize", 40.0, CallOutcome::Applied);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Session summary"));
        assert!(summary.contains("/detect"));
        assert!(summary.contains("/recognize"));
        assert!(summary.contains("applied 2"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StatsSessionLogger::new().summary_string().is_none());
    }
}
