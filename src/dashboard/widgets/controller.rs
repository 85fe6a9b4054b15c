use super::{normalize_column, ChartSeries, ConfigEdit, WidgetConfig, WidgetId};
use crate::backend::ExecutorError;
use crate::catalog::Column;
use crate::dashboard::filters::{FilterPredicate, FilterSet};
use crate::dashboard::query::{QueryRequest, QueryResult};
use crate::dashboard::translate::{translate_with_limit, ValidationError};
use std::time::{Duration, Instant};

/// Shown for every executor failure; the cause goes to the log.
pub const EXECUTOR_FAILURE_MESSAGE: &str = "unable to generate view";

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetFailure {
    Invalid(ValidationError),
    Executor(ExecutorError),
}

impl WidgetFailure {
    pub fn message(&self) -> String {
        match self {
            WidgetFailure::Invalid(err) => err.to_string(),
            WidgetFailure::Executor(_) => EXECUTOR_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Executor failures offer a manual retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WidgetFailure::Executor(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetState {
    Unconfigured,
    Configuring,
    Validating,
    Fetching { seq: u64 },
    Rendered(QueryResult),
    Failed(WidgetFailure),
}

impl WidgetState {
    pub fn name(&self) -> &'static str {
        match self {
            WidgetState::Unconfigured => "unconfigured",
            WidgetState::Configuring => "configuring",
            WidgetState::Validating => "validating",
            WidgetState::Fetching { .. } => "fetching",
            WidgetState::Rendered(_) => "rendered",
            WidgetState::Failed(_) => "failed",
        }
    }
}

/// A query the widget wants executed. The response must come back with the
/// same `seq`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub widget: WidgetId,
    pub seq: u64,
    pub request: QueryRequest,
}

/// Inputs shared by every widget of a dashboard when it validates.
#[derive(Debug, Clone, Copy)]
pub struct TranslateContext<'a> {
    pub filters: &'a FilterSet,
    /// `None` while the column catalog is unavailable.
    pub catalog: Option<&'a [Column]>,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Accepted { elapsed: Duration },
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    seq: u64,
    issued_at: Instant,
}

/// Lifecycle of one widget: hydration, validation, fetching and stale
/// response discarding.
pub struct WidgetController {
    config: WidgetConfig,
    state: WidgetState,
    hydrated: bool,
    next_seq: u64,
    in_flight: Option<InFlight>,
    validations: u64,
    revision: u64,
}

impl WidgetController {
    pub fn new(config: WidgetConfig) -> Self {
        let state = resting_state(&config);
        Self {
            config,
            state,
            hydrated: false,
            next_seq: 0,
            in_flight: None,
            validations: 0,
            revision: 0,
        }
    }

    /// Continue sequence numbering after `seq`. Used when a widget identity is
    /// rebuilt while responses addressed to its predecessor may still arrive.
    pub fn with_seq_floor(mut self, seq: u64) -> Self {
        self.next_seq = self.next_seq.max(seq);
        self
    }

    pub fn id(&self) -> WidgetId {
        self.config.id
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Number of times this widget entered `Validating`.
    pub fn validation_count(&self) -> u64 {
        self.validations
    }

    /// Bumped on every config change that should be persisted.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn result(&self) -> Option<&QueryResult> {
        match &self.state {
            WidgetState::Rendered(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&WidgetFailure> {
        match &self.state {
            WidgetState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Apply the parent's configuration. Happens once per widget identity and
    /// never triggers validation by itself; the caller validates afterwards.
    pub fn hydrate(&mut self, config: WidgetConfig) -> bool {
        if self.hydrated {
            tracing::debug!(widget = %self.config.id, "ignoring repeated hydration");
            return false;
        }
        let id = self.config.id;
        self.config = WidgetConfig { id, ..config };
        self.config.x_axis = normalize_column(self.config.x_axis.take());
        self.config.y_axis = normalize_column(self.config.y_axis.take());
        self.config.sub_group = normalize_column(self.config.sub_group.take());
        self.config.secondary_y_axis = normalize_column(self.config.secondary_y_axis.take());
        self.state = resting_state(&self.config);
        self.hydrated = true;
        true
    }

    /// Apply a user edit. Returns whether the config changed and, when the
    /// change warrants it, the fetch to issue.
    pub fn apply_edit(
        &mut self,
        edit: ConfigEdit,
        ctx: &TranslateContext<'_>,
    ) -> (bool, Option<FetchTicket>) {
        if !self.config.apply(edit) {
            return (false, None);
        }
        self.revision += 1;
        if !self.hydrated {
            self.state = resting_state(&self.config);
            return (true, None);
        }
        if self.state == WidgetState::Unconfigured && !self.config.has_axes() {
            return (true, None);
        }
        (true, self.validate(ctx))
    }

    /// React to a change of the shared filter set.
    pub fn on_filters_changed(&mut self, ctx: &TranslateContext<'_>) -> Option<FetchTicket> {
        if !self.hydrated || !self.config.has_axes() {
            return None;
        }
        self.validate(ctx)
    }

    /// Explicit user request to regenerate the view.
    pub fn refresh(&mut self, ctx: &TranslateContext<'_>) -> Option<FetchTicket> {
        if !self.hydrated {
            return None;
        }
        self.validate(ctx)
    }

    /// Manual retry after a failure.
    pub fn retry(&mut self, ctx: &TranslateContext<'_>) -> Option<FetchTicket> {
        match self.state {
            WidgetState::Failed(_) => self.refresh(ctx),
            _ => None,
        }
    }

    /// Enter `Validating`; on success the widget moves to `Fetching` and the
    /// returned ticket must be dispatched.
    pub fn validate(&mut self, ctx: &TranslateContext<'_>) -> Option<FetchTicket> {
        // Any response still in flight is superseded from here on.
        self.in_flight = None;
        let Some(catalog) = ctx.catalog else {
            tracing::debug!(widget = %self.config.id, "column catalog unavailable; not validating");
            self.state = WidgetState::Unconfigured;
            return None;
        };
        self.validations += 1;
        self.state = WidgetState::Validating;

        match translate_with_limit(&self.config, ctx.filters, catalog, ctx.limit) {
            Err(err) => {
                tracing::debug!(widget = %self.config.id, error = %err, "widget config rejected");
                self.state = WidgetState::Failed(WidgetFailure::Invalid(err));
                None
            }
            Ok(request) => {
                self.next_seq += 1;
                let seq = self.next_seq;
                self.in_flight = Some(InFlight {
                    seq,
                    issued_at: Instant::now(),
                });
                self.state = WidgetState::Fetching { seq };
                tracing::debug!(widget = %self.config.id, seq, "issuing query");
                Some(FetchTicket {
                    widget: self.config.id,
                    seq,
                    request,
                })
            }
        }
    }

    /// Deliver an executor response. Anything but the latest issued fetch is
    /// discarded.
    pub fn complete(
        &mut self,
        seq: u64,
        result: Result<QueryResult, ExecutorError>,
    ) -> CompletionOutcome {
        let Some(flight) = self.in_flight.filter(|f| f.seq == seq) else {
            tracing::debug!(widget = %self.config.id, seq, "discarding stale response");
            return CompletionOutcome::Stale;
        };
        self.in_flight = None;
        self.state = match result {
            Ok(result) => WidgetState::Rendered(result),
            Err(err) => {
                tracing::warn!(widget = %self.config.id, error = %err, "query failed");
                WidgetState::Failed(WidgetFailure::Executor(err))
            }
        };
        CompletionOutcome::Accepted {
            elapsed: flight.issued_at.elapsed(),
        }
    }

    /// Build the filter a click on result row `row` proposes. Only the x axis
    /// value is promoted.
    pub fn activate_point(&self, row: usize) -> Option<FilterPredicate> {
        let record = self.result()?.rows.get(row)?;
        let value = ChartSeries::point_value(&self.config, record)?;
        let x_axis = self.config.x_axis.as_deref()?;
        Some(FilterPredicate::eq(x_axis, value.clone()))
    }

    pub fn series(&self) -> Option<ChartSeries> {
        self.result()
            .map(|result| ChartSeries::from_result(&self.config, result))
    }
}

fn resting_state(config: &WidgetConfig) -> WidgetState {
    if config.has_axes() {
        WidgetState::Configuring
    } else {
        WidgetState::Unconfigured
    }
}
