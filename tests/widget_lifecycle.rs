mod common;

use chartdeck::backend::ExecutorError;
use chartdeck::dashboard::query::QueryResult;
use chartdeck::dashboard::translate::ValidationError;
use chartdeck::dashboard::widgets::{
    Aggregation, ConfigEdit, WidgetFailure, WidgetState, EXECUTOR_FAILURE_MESSAGE,
};
use chartdeck::dispatch::Completion;
use common::{add_chart, fixture, rows};
use serde_json::json;

#[test]
fn later_fetch_wins_regardless_of_arrival_order() {
    let mut f = fixture();
    let id = add_chart(&mut f.dashboard, "region", "amount");
    f.dashboard
        .edit_widget(id, ConfigEdit::Aggregation(Aggregation::Avg));
    let tickets = f.dispatcher.take_tickets();
    assert_eq!(tickets.len(), 2);
    let (older, newer) = (&tickets[0], &tickets[1]);
    assert!(newer.seq > older.seq);

    let newer_rows = rows(&[&[("region", json!("Asia")), ("amount_avg", json!(4.0))]]);
    f.dispatcher.complete(Completion::Query {
        widget: id,
        seq: newer.seq,
        result: Ok(newer_rows.clone()),
    });
    f.dispatcher.complete(Completion::Query {
        widget: id,
        seq: older.seq,
        result: Ok(rows(&[&[("region", json!("Asia")), ("amount_sum", json!(8))]])),
    });
    assert_eq!(f.dashboard.pump(), 2);

    let widget = f.dashboard.widget(id).unwrap();
    assert_eq!(widget.result(), Some(&newer_rows));
    assert_eq!(f.dashboard.diagnostics().discarded_responses, 1);
}

#[test]
fn older_response_arriving_first_is_still_discarded() {
    let mut f = fixture();
    let id = add_chart(&mut f.dashboard, "region", "amount");
    f.dashboard.refresh_widget(id);
    let tickets = f.dispatcher.take_tickets();

    f.dispatcher.complete(Completion::Query {
        widget: id,
        seq: tickets[0].seq,
        result: Ok(QueryResult::default()),
    });
    f.dashboard.pump();
    assert!(matches!(
        f.dashboard.widget(id).unwrap().state(),
        WidgetState::Fetching { seq } if *seq == tickets[1].seq
    ));
}

#[test]
fn removing_widget_mid_fetch_discards_response() {
    let mut f = fixture();
    let id = add_chart(&mut f.dashboard, "region", "amount");
    let ticket = f.dispatcher.take_tickets().remove(0);
    assert!(f.dashboard.remove_widget(id));
    assert!(f.dashboard.layout().placements.is_empty());

    f.dispatcher.complete(Completion::Query {
        widget: id,
        seq: ticket.seq,
        result: Ok(QueryResult::default()),
    });
    assert_eq!(f.dashboard.pump(), 1);
    assert!(f.dashboard.widget(id).is_none());
}

#[test]
fn widget_ids_are_not_reused() {
    let mut f = fixture();
    let a = f.dashboard.add_widget();
    let b = f.dashboard.add_widget();
    f.dashboard.remove_widget(a);
    let c = f.dashboard.add_widget();
    assert_ne!(c, a);
    assert_ne!(c, b);
    let ids: Vec<_> = f.dashboard.widgets().iter().map(|w| w.id()).collect();
    assert_eq!(ids, vec![b, c]);
}

#[test]
fn invalid_config_fails_without_a_fetch() {
    let mut f = fixture();
    let id = add_chart(&mut f.dashboard, "region", "channel");
    assert!(f.dispatcher.take_tickets().is_empty());
    match f.dashboard.widget(id).unwrap().failure() {
        Some(WidgetFailure::Invalid(ValidationError::IncompatibleAggregation { column, .. })) => {
            assert_eq!(column, "channel")
        }
        other => panic!("unexpected failure {other:?}"),
    }

    f.dashboard
        .edit_widget(id, ConfigEdit::Aggregation(Aggregation::Count));
    assert_eq!(f.dispatcher.take_tickets().len(), 1);
}

#[test]
fn executor_failure_needs_explicit_retry() {
    let mut f = fixture();
    let id = add_chart(&mut f.dashboard, "region", "amount");
    let ticket = f.dispatcher.take_tickets().remove(0);
    f.dispatcher.complete(Completion::Query {
        widget: id,
        seq: ticket.seq,
        result: Err(ExecutorError::Rejected("boom".into())),
    });
    f.dashboard.pump();

    let failure = f.dashboard.widget(id).unwrap().failure().cloned().unwrap();
    assert_eq!(failure.message(), EXECUTOR_FAILURE_MESSAGE);
    assert!(f.dispatcher.take_tickets().is_empty());

    assert!(f.dashboard.retry_widget(id));
    assert_eq!(f.dispatcher.take_tickets().len(), 1);
}

#[test]
fn edits_to_unchanged_values_do_nothing() {
    let mut f = fixture();
    let id = add_chart(&mut f.dashboard, "region", "amount");
    f.dispatcher.take_tickets();
    f.dashboard.take_events();
    assert!(!f
        .dashboard
        .edit_widget(id, ConfigEdit::XAxis(Some("region".into()))));
    assert!(f.dispatcher.take_tickets().is_empty());
    assert!(f.dashboard.take_events().is_empty());
}

#[test]
fn rendered_widget_exposes_chart_series() {
    let mut f = fixture();
    let id = add_chart(&mut f.dashboard, "region", "amount");
    let ticket = f.dispatcher.take_tickets().remove(0);
    f.dispatcher.complete(Completion::Query {
        widget: id,
        seq: ticket.seq,
        result: Ok(rows(&[
            &[("region", json!("Asia")), ("amount_sum", json!(10))],
            &[("region", json!("Europe")), ("amount_sum", json!(7))],
        ])),
    });
    f.dashboard.pump();
    let series = f.dashboard.widget(id).unwrap().series().unwrap();
    assert_eq!(series.labels, vec!["Asia", "Europe"]);
    assert_eq!(series.datasets[0].label, "SUM of amount");
    assert_eq!(series.datasets[0].values, vec![Some(10.0), Some(7.0)]);

    let timings = f.dashboard.diagnostics().fetch_timings;
    assert_eq!(timings.len(), 1);
    assert_eq!(timings[0].widget, id);
}
