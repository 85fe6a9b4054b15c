mod common;

use chartdeck::dashboard::filters::FilterPredicate;
use chartdeck::dashboard::widgets::{WidgetId, WidgetState};
use chartdeck::dashboard::DashboardEvent;
use chartdeck::dispatch::Completion;
use common::{add_chart, fixture, rows, Fixture};
use serde_json::json;

fn two_charts() -> (Fixture, WidgetId, WidgetId) {
    let mut f = fixture();
    let a = add_chart(&mut f.dashboard, "region", "amount");
    let b = add_chart(&mut f.dashboard, "channel", "quantity");
    f.dispatcher.take_jobs();
    f.dashboard.take_events();
    (f, a, b)
}

#[test]
fn proposal_revalidates_every_widget_exactly_once() {
    let (mut f, a, b) = two_charts();
    let before: Vec<u64> = f
        .dashboard
        .widgets()
        .iter()
        .map(|w| w.validation_count())
        .collect();

    f.dashboard.propose_filter("region", json!("Asia"));

    let after: Vec<u64> = f
        .dashboard
        .widgets()
        .iter()
        .map(|w| w.validation_count())
        .collect();
    assert_eq!(after, before.iter().map(|c| c + 1).collect::<Vec<_>>());

    let tickets = f.dispatcher.take_tickets();
    let widgets: Vec<WidgetId> = tickets.iter().map(|t| t.widget).collect();
    assert_eq!(widgets, vec![a, b]);
    for ticket in &tickets {
        assert_eq!(
            ticket.request.filters,
            vec![FilterPredicate::eq("region", json!("Asia"))]
        );
    }
    assert_eq!(f.dashboard.take_events(), vec![DashboardEvent::FiltersChanged]);
}

#[test]
fn same_proposal_twice_keeps_one_predicate_but_revalidates() {
    let (mut f, a, _b) = two_charts();
    f.dashboard.propose_filter("region", json!("Asia"));
    f.dashboard.propose_filter("region", json!("Asia"));
    assert_eq!(f.dashboard.filters().len(), 1);
    assert_eq!(f.dispatcher.take_tickets().len(), 4);
    assert_eq!(f.dashboard.widget(a).unwrap().validation_count(), 3);
}

#[test]
fn new_value_replaces_old_predicate() {
    let (mut f, _a, _b) = two_charts();
    f.dashboard.propose_filter("region", json!("Asia"));
    f.dashboard.set_filter("region", json!("Europe"));
    let tickets = f.dispatcher.take_tickets();
    assert_eq!(
        tickets.last().unwrap().request.filters,
        vec![FilterPredicate::eq("region", json!("Europe"))]
    );
}

#[test]
fn clicked_point_cross_filters_all_widgets() {
    let (mut f, a, b) = two_charts();
    f.dashboard.refresh_widget(a);
    let ticket = f.dispatcher.take_tickets().remove(0);
    f.dispatcher.complete(Completion::Query {
        widget: a,
        seq: ticket.seq,
        result: Ok(rows(&[
            &[("region", json!("Asia")), ("amount_sum", json!(10))],
            &[("region", json!("Europe")), ("amount_sum", json!(3))],
        ])),
    });
    f.dashboard.pump();

    let predicate = f.dashboard.activate_point(a, 1).unwrap();
    assert_eq!(predicate, FilterPredicate::eq("region", json!("Europe")));

    let tickets = f.dispatcher.take_tickets();
    let widgets: Vec<WidgetId> = tickets.iter().map(|t| t.widget).collect();
    assert_eq!(widgets, vec![a, b]);
    assert!(matches!(
        f.dashboard.widget(a).unwrap().state(),
        WidgetState::Fetching { .. }
    ));
}

#[test]
fn activation_outside_rendered_state_proposes_nothing() {
    let (mut f, a, _b) = two_charts();
    assert!(f.dashboard.activate_point(a, 0).is_none());
    assert!(f.dashboard.filters().is_empty());
    assert!(f.dispatcher.take_tickets().is_empty());
}

#[test]
fn unconfigured_widgets_sit_out_the_fan_out() {
    let (mut f, _a, _b) = two_charts();
    let empty = f.dashboard.add_widget();
    f.dashboard.propose_filter("region", json!("Asia"));
    assert_eq!(f.dashboard.widget(empty).unwrap().validation_count(), 0);
    assert_eq!(
        f.dashboard.widget(empty).unwrap().state(),
        &WidgetState::Unconfigured
    );
    assert_eq!(f.dispatcher.take_tickets().len(), 2);
}

#[test]
fn clearing_filters_revalidates_only_on_change() {
    let (mut f, _a, _b) = two_charts();
    assert!(!f.dashboard.clear_filter("region"));
    assert!(f.dispatcher.take_tickets().is_empty());

    f.dashboard.propose_filter("region", json!("Asia"));
    f.dispatcher.take_tickets();
    assert!(f.dashboard.clear_filter("region"));
    let tickets = f.dispatcher.take_tickets();
    assert_eq!(tickets.len(), 2);
    assert!(tickets.iter().all(|t| t.request.filters.is_empty()));
}
