use crate::dashboard::widgets::WidgetId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const SLOW_FETCH_THRESHOLD: Duration = Duration::from_secs(2);

#[derive(Clone, Debug, PartialEq)]
pub struct FetchTiming {
    pub widget: WidgetId,
    pub label: String,
    pub fetches: u64,
    pub last_duration: Duration,
    pub slowest: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct DashboardDiagnosticsSnapshot {
    pub fetch_timings: Vec<FetchTiming>,
    pub discarded_responses: u64,
}

struct FetchState {
    label: String,
    fetches: u64,
    last_duration: Duration,
    slowest: Duration,
    last_fetch_at: Instant,
}

/// Query latency per widget, measured from issue to accepted response.
pub struct DashboardDiagnostics {
    fetches: HashMap<WidgetId, FetchState>,
    discarded: u64,
    warning_threshold: Duration,
}

impl Default for DashboardDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardDiagnostics {
    pub fn new() -> Self {
        Self::new_with_threshold(SLOW_FETCH_THRESHOLD)
    }

    pub fn new_with_threshold(warning_threshold: Duration) -> Self {
        Self {
            fetches: HashMap::new(),
            discarded: 0,
            warning_threshold,
        }
    }

    pub fn record_fetch(&mut self, widget: WidgetId, label: String, duration: Duration) {
        if duration >= self.warning_threshold {
            tracing::warn!(
                widget = %widget,
                ms = duration.as_millis() as u64,
                "slow widget query"
            );
        }
        let now = Instant::now();
        let entry = self.fetches.entry(widget).or_insert(FetchState {
            label: label.clone(),
            fetches: 0,
            last_duration: duration,
            slowest: Duration::ZERO,
            last_fetch_at: now,
        });
        entry.label = label;
        entry.fetches += 1;
        entry.last_duration = duration;
        entry.slowest = entry.slowest.max(duration);
        entry.last_fetch_at = now;
    }

    pub fn record_discard(&mut self) {
        self.discarded += 1;
    }

    pub fn forget(&mut self, widget: WidgetId) {
        self.fetches.remove(&widget);
    }

    /// Time since the widget last received a result.
    pub fn since_last_fetch(&self, widget: WidgetId) -> Option<Duration> {
        self.fetches.get(&widget).map(|s| s.last_fetch_at.elapsed())
    }

    pub fn snapshot(&self) -> DashboardDiagnosticsSnapshot {
        let mut fetch_timings: Vec<FetchTiming> = self
            .fetches
            .iter()
            .map(|(widget, state)| FetchTiming {
                widget: *widget,
                label: state.label.clone(),
                fetches: state.fetches,
                last_duration: state.last_duration,
                slowest: state.slowest,
            })
            .collect();
        fetch_timings.sort_by(|a, b| a.label.cmp(&b.label).then(a.widget.cmp(&b.widget)));
        DashboardDiagnosticsSnapshot {
            fetch_timings,
            discarded_responses: self.discarded,
        }
    }

    pub fn warning_threshold(&self) -> Duration {
        self.warning_threshold
    }
}
