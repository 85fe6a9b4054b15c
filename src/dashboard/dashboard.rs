use crate::backend::{DashboardId, DashboardStore, DashboardSummary, PersistenceError};
use crate::catalog::{CatalogError, CatalogSource, Column};
use crate::dashboard::config::{ChartEntry, DashboardDocument};
use crate::dashboard::data_cache::CatalogCache;
use crate::dashboard::diagnostics::{DashboardDiagnostics, DashboardDiagnosticsSnapshot};
use crate::dashboard::filters::{is_blank, FilterPredicate, FilterSet, Scalar};
use crate::dashboard::layout::{normalize_placements, LayoutConfig, NormalizedPlacement, Placement};
use crate::dashboard::translate::DEFAULT_QUERY_LIMIT;
use crate::dashboard::widgets::{
    CompletionOutcome, ConfigEdit, FetchTicket, TranslateContext, WidgetConfig, WidgetController,
    WidgetId, WidgetState,
};
use crate::dispatch::{Completion, Dispatcher, Job};
use crate::export::{self, ExportArtifact, ExportError, ExportFormat, ExportRenderer, ExportRequest};
use crate::settings::Settings;
use std::collections::HashSet;
use std::sync::Arc;

/// Upward notifications. None of them is ever fed back into a widget.
#[derive(Clone, Debug, PartialEq)]
pub enum DashboardEvent {
    WidgetConfigChanged {
        widget: WidgetId,
        config: WidgetConfig,
    },
    FiltersChanged,
    Saved(DashboardId),
    SaveFailed(PersistenceError),
    Loaded(DashboardId),
    Deleted(DashboardId),
}

/// Collaborators a dashboard talks to.
pub struct DashboardServices {
    pub catalog: Arc<dyn CatalogSource>,
    pub store: Arc<dyn DashboardStore>,
    pub dispatcher: Box<dyn Dispatcher>,
}

/// Owns the shared filter set, the widgets and the layout of one dashboard.
///
/// All state changes happen on the caller's thread. Queries and saves go
/// out through the [`Dispatcher`] and come back through [`pump`](Self::pump).
pub struct DashboardCoordinator {
    id: Option<DashboardId>,
    name: String,
    dataset_id: String,
    filters: FilterSet,
    widgets: Vec<WidgetController>,
    layout: LayoutConfig,
    catalog: CatalogCache,
    catalog_source: Arc<dyn CatalogSource>,
    store: Arc<dyn DashboardStore>,
    dispatcher: Box<dyn Dispatcher>,
    next_widget_id: u64,
    highest_seq: u64,
    save_generation: u64,
    query_limit: u32,
    events: Vec<DashboardEvent>,
    event_cb: Option<Arc<dyn Fn(&DashboardEvent) + Send + Sync>>,
    diagnostics: DashboardDiagnostics,
    pub warnings: Vec<String>,
}

impl DashboardCoordinator {
    pub fn new(
        name: impl Into<String>,
        dataset_id: impl Into<String>,
        services: DashboardServices,
    ) -> Self {
        let mut dashboard = Self {
            id: None,
            name: name.into(),
            dataset_id: dataset_id.into(),
            filters: FilterSet::new(),
            widgets: Vec::new(),
            layout: LayoutConfig::default(),
            catalog: CatalogCache::new(),
            catalog_source: services.catalog,
            store: services.store,
            dispatcher: services.dispatcher,
            next_widget_id: 1,
            highest_seq: 0,
            save_generation: 0,
            query_limit: DEFAULT_QUERY_LIMIT,
            events: Vec::new(),
            event_cb: None,
            diagnostics: DashboardDiagnostics::new(),
            warnings: Vec::new(),
        };
        let _ = dashboard.load_catalog();
        dashboard
    }

    /// Apply the query limit and grid width from application settings.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.query_limit = settings.query_limit.max(1);
        if self.widgets.is_empty() {
            self.layout = LayoutConfig::with_columns(settings.layout_columns);
        }
    }

    pub fn set_event_callback(&mut self, cb: Arc<dyn Fn(&DashboardEvent) + Send + Sync>) {
        self.event_cb = Some(cb);
    }

    pub fn id(&self) -> Option<DashboardId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn widgets(&self) -> &[WidgetController] {
        &self.widgets
    }

    pub fn widget(&self, id: WidgetId) -> Option<&WidgetController> {
        self.widgets.iter().find(|w| w.id() == id)
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn placements(&self) -> Vec<NormalizedPlacement> {
        let ids: Vec<WidgetId> = self.widgets.iter().map(|w| w.id()).collect();
        normalize_placements(&self.layout, &ids).0
    }

    /// Columns of the current dataset, `None` while the catalog is unavailable.
    pub fn columns(&self) -> Option<&[Column]> {
        self.catalog.columns(&self.dataset_id)
    }

    pub fn catalog_error(&self) -> Option<&CatalogError> {
        self.catalog.last_error()
    }

    pub fn diagnostics(&self) -> DashboardDiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn take_events(&mut self) -> Vec<DashboardEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: DashboardEvent) {
        if let Some(cb) = &self.event_cb {
            (cb)(&event);
        }
        self.events.push(event);
    }

    fn load_catalog(&mut self) -> Result<(), CatalogError> {
        self.catalog
            .load(self.catalog_source.as_ref(), &self.dataset_id)
            .map(|_| ())
    }

    /// Retry the column catalog, then validate widgets that were waiting on it.
    pub fn reload_catalog(&mut self) -> Result<(), CatalogError> {
        self.load_catalog()?;
        let ctx = TranslateContext {
            filters: &self.filters,
            catalog: self.catalog.columns(&self.dataset_id),
            limit: self.query_limit,
        };
        let tickets: Vec<FetchTicket> = self
            .widgets
            .iter_mut()
            .filter(|w| {
                w.is_hydrated() && w.config().has_axes() && *w.state() == WidgetState::Unconfigured
            })
            .filter_map(|w| w.refresh(&ctx))
            .collect();
        self.dispatch_tickets(tickets);
        Ok(())
    }

    fn dispatch_tickets(&mut self, tickets: Vec<FetchTicket>) {
        for ticket in tickets {
            self.highest_seq = self.highest_seq.max(ticket.seq);
            self.dispatcher.dispatch(Job::Query {
                dataset_id: self.dataset_id.clone(),
                ticket,
            });
        }
    }

    /// Append an empty bar chart with a fresh identity.
    pub fn add_widget(&mut self) -> WidgetId {
        let id = WidgetId(self.next_widget_id);
        self.next_widget_id += 1;
        let config = WidgetConfig::new(id);
        let mut widget = WidgetController::new(config.clone()).with_seq_floor(self.highest_seq);
        widget.hydrate(config.clone());
        self.widgets.push(widget);
        self.layout.place(id);
        tracing::debug!(widget = %id, "widget added");
        self.emit(DashboardEvent::WidgetConfigChanged { widget: id, config });
        id
    }

    /// Remove a widget. Responses still in flight for it are dropped on arrival.
    pub fn remove_widget(&mut self, id: WidgetId) -> bool {
        let before = self.widgets.len();
        self.widgets.retain(|w| w.id() != id);
        if self.widgets.len() == before {
            return false;
        }
        self.layout.remove(id);
        self.diagnostics.forget(id);
        tracing::debug!(widget = %id, "widget removed");
        true
    }

    /// Apply a user edit to one widget. Returns whether the config changed.
    pub fn edit_widget(&mut self, id: WidgetId, edit: ConfigEdit) -> bool {
        let ctx = TranslateContext {
            filters: &self.filters,
            catalog: self.catalog.columns(&self.dataset_id),
            limit: self.query_limit,
        };
        let Some(widget) = self.widgets.iter_mut().find(|w| w.id() == id) else {
            tracing::debug!(widget = %id, "edit for unknown widget ignored");
            return false;
        };
        let (changed, ticket) = widget.apply_edit(edit, &ctx);
        if !changed {
            return false;
        }
        let config = widget.config().clone();
        self.dispatch_tickets(ticket.into_iter().collect());
        self.emit(DashboardEvent::WidgetConfigChanged { widget: id, config });
        true
    }

    /// Replace the predicate on `column` and revalidate every widget.
    ///
    /// Re-proposing an identical predicate still revalidates. A blank value
    /// clears the filter on `column` instead.
    pub fn propose_filter(&mut self, column: &str, value: Scalar) {
        let column = column.trim();
        if column.is_empty() {
            return;
        }
        if is_blank(&value) {
            self.filters.remove(column);
        } else {
            self.filters.set(FilterPredicate::eq(column, value));
        }
        tracing::debug!(column, filters = self.filters.len(), "filter set changed");
        self.fan_out();
    }

    /// Explicit filter form edit. Same propagation as [`propose_filter`](Self::propose_filter).
    pub fn set_filter(&mut self, column: &str, value: Scalar) {
        self.propose_filter(column, value);
    }

    /// Drop the predicate on `column`. Widgets revalidate only if one existed.
    pub fn clear_filter(&mut self, column: &str) -> bool {
        if self.filters.remove(column).is_none() {
            return false;
        }
        self.fan_out();
        true
    }

    pub fn clear_filters(&mut self) {
        if self.filters.is_empty() {
            return;
        }
        self.filters.clear();
        self.fan_out();
    }

    /// Notify every widget of the new filter set within this call, so none of
    /// them observes a partial update.
    fn fan_out(&mut self) {
        let ctx = TranslateContext {
            filters: &self.filters,
            catalog: self.catalog.columns(&self.dataset_id),
            limit: self.query_limit,
        };
        let tickets: Vec<FetchTicket> = self
            .widgets
            .iter_mut()
            .filter_map(|w| w.on_filters_changed(&ctx))
            .collect();
        self.dispatch_tickets(tickets);
        self.emit(DashboardEvent::FiltersChanged);
    }

    /// A click on row `row` of a rendered widget cross-filters the dashboard
    /// by that row's x axis value.
    pub fn activate_point(&mut self, id: WidgetId, row: usize) -> Option<FilterPredicate> {
        let predicate = self.widget(id)?.activate_point(row)?;
        self.propose_filter(&predicate.column, predicate.value.clone());
        Some(predicate)
    }

    /// Manual retry of a failed widget.
    pub fn retry_widget(&mut self, id: WidgetId) -> bool {
        self.revalidate_one(id, true)
    }

    pub fn refresh_widget(&mut self, id: WidgetId) -> bool {
        self.revalidate_one(id, false)
    }

    fn revalidate_one(&mut self, id: WidgetId, retry: bool) -> bool {
        let ctx = TranslateContext {
            filters: &self.filters,
            catalog: self.catalog.columns(&self.dataset_id),
            limit: self.query_limit,
        };
        let Some(widget) = self.widgets.iter_mut().find(|w| w.id() == id) else {
            return false;
        };
        let ticket = if retry {
            widget.retry(&ctx)
        } else {
            widget.refresh(&ctx)
        };
        let issued = ticket.is_some();
        self.dispatch_tickets(ticket.into_iter().collect());
        issued
    }

    /// Collect finished jobs from the dispatcher. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let completions = self.dispatcher.drain();
        let count = completions.len();
        for completion in completions {
            self.deliver(completion);
        }
        count
    }

    pub fn deliver(&mut self, completion: Completion) {
        match completion {
            Completion::Query {
                widget,
                seq,
                result,
            } => {
                let Some(ctrl) = self.widgets.iter_mut().find(|w| w.id() == widget) else {
                    tracing::debug!(widget = %widget, seq, "response for removed widget dropped");
                    self.diagnostics.record_discard();
                    return;
                };
                match ctrl.complete(seq, result) {
                    CompletionOutcome::Accepted { elapsed } => {
                        let label = widget_label(ctrl.config());
                        self.diagnostics.record_fetch(widget, label, elapsed);
                    }
                    CompletionOutcome::Stale => self.diagnostics.record_discard(),
                }
            }
            Completion::Saved { generation, result } if generation != self.save_generation => {
                // Issued before the last load; the record belongs to another dashboard.
                match result {
                    Ok(id) => tracing::info!(id = %id, generation, "earlier dashboard saved"),
                    Err(err) => tracing::warn!(error = %err, generation, "earlier dashboard save failed"),
                }
                self.diagnostics.record_discard();
            }
            Completion::Saved {
                result: Ok(id), ..
            } => {
                tracing::info!(id = %id, name = %self.name, "dashboard saved");
                self.id = Some(id);
                self.emit(DashboardEvent::Saved(id));
            }
            Completion::Saved {
                result: Err(err), ..
            } => {
                tracing::warn!(error = %err, "dashboard save failed");
                self.emit(DashboardEvent::SaveFailed(err));
            }
        }
    }

    /// Persisted form of the current state.
    pub fn document(&self) -> DashboardDocument {
        DashboardDocument {
            name: self.name.clone(),
            dataset_id: self.dataset_id.clone(),
            filters: self.filters.to_values(),
            charts: self
                .widgets
                .iter()
                .map(|w| ChartEntry::from_config(w.config()))
                .collect(),
            layout: self.layout.clone(),
        }
    }

    /// Hand the document to the store without waiting. The outcome arrives as
    /// [`DashboardEvent::Saved`] or [`DashboardEvent::SaveFailed`].
    pub fn save(&mut self) {
        let document = self.document();
        tracing::debug!(name = %document.name, charts = document.charts.len(), "saving dashboard");
        self.dispatcher.dispatch(Job::Save {
            generation: self.save_generation,
            document,
        });
    }

    /// Replace the dashboard with a stored one. Every widget and the filter
    /// set are hydrated first; each widget then validates once.
    ///
    /// On failure the current dashboard is left untouched.
    pub fn load(&mut self, id: DashboardId) -> Result<(), PersistenceError> {
        let mut document = self.store.load(id)?;
        let mut warnings = document.sanitize();

        if document.dataset_id != self.dataset_id {
            self.dataset_id = document.dataset_id.clone();
            if let Err(err) = self.load_catalog() {
                warnings.push(format!("column catalog unavailable: {err}"));
            }
        }

        let mut used = HashSet::new();
        let mut next = document
            .charts
            .iter()
            .filter_map(|c| c.id)
            .map(|id| id.0 + 1)
            .max()
            .unwrap_or(1)
            .max(self.next_widget_id);
        let mut widgets = Vec::with_capacity(document.charts.len());
        for entry in &document.charts {
            let widget_id = match entry.id {
                Some(id) if used.insert(id) => id,
                _ => {
                    let id = WidgetId(next);
                    next += 1;
                    used.insert(id);
                    id
                }
            };
            let mut ctrl = WidgetController::new(WidgetConfig::new(widget_id))
                .with_seq_floor(self.highest_seq);
            ctrl.hydrate(entry.to_config(widget_id));
            widgets.push(ctrl);
        }
        let ids: Vec<WidgetId> = widgets.iter().map(|w| w.id()).collect();

        let (placements, layout_warnings) = normalize_placements(&document.layout, &ids);
        warnings.extend(layout_warnings);
        let mut layout = LayoutConfig {
            columns: document.layout.columns,
            placements: placements
                .into_iter()
                .map(|p| Placement {
                    widget: p.widget,
                    x: p.x as i32,
                    y: p.y as i32,
                    w: p.w as u8,
                    h: p.h as u8,
                })
                .collect(),
        };
        for widget_id in &ids {
            if !layout.placements.iter().any(|p| p.widget == *widget_id) {
                layout.place(*widget_id);
            }
        }

        for warning in &warnings {
            tracing::warn!(dashboard = %id, "{warning}");
        }

        self.id = Some(id);
        self.save_generation += 1;
        self.name = document.name;
        self.filters = FilterSet::from_values(&document.filters);
        self.widgets = widgets;
        self.layout = layout;
        self.next_widget_id = next;
        self.warnings = warnings;

        let ctx = TranslateContext {
            filters: &self.filters,
            catalog: self.catalog.columns(&self.dataset_id),
            limit: self.query_limit,
        };
        let tickets: Vec<FetchTicket> = self
            .widgets
            .iter_mut()
            .filter(|w| w.config().has_axes())
            .filter_map(|w| w.refresh(&ctx))
            .collect();
        self.dispatch_tickets(tickets);

        tracing::info!(
            dashboard = %id,
            widgets = self.widgets.len(),
            filters = self.filters.len(),
            "dashboard loaded"
        );
        self.emit(DashboardEvent::Loaded(id));
        Ok(())
    }

    pub fn list_dashboards(&self) -> Result<Vec<DashboardSummary>, PersistenceError> {
        self.store.list()
    }

    /// Delete a stored dashboard. The open dashboard keeps its widgets; if it
    /// was the deleted one it becomes unsaved.
    pub fn delete_dashboard(&mut self, id: DashboardId) -> Result<(), PersistenceError> {
        self.store.delete(id)?;
        if self.id == Some(id) {
            self.id = None;
        }
        tracing::info!(dashboard = %id, "dashboard deleted");
        self.emit(DashboardEvent::Deleted(id));
        Ok(())
    }

    pub fn export(
        &self,
        format: ExportFormat,
        renderer: &dyn ExportRenderer,
    ) -> Result<ExportArtifact, ExportError> {
        let request = ExportRequest::new(self.id, self.name.clone(), format)?;
        export::export(&request, renderer)
    }
}

fn widget_label(config: &WidgetConfig) -> String {
    match (&config.x_axis, &config.y_axis) {
        (Some(x), Some(y)) => format!(
            "{} {} of {y} by {x}",
            config.chart_kind.as_str(),
            config.aggregation.label()
        ),
        _ => config.id.to_string(),
    }
}
