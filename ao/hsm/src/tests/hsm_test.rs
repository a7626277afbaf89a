//! Engine tests over a traffic-light machine.
//!
//! Hierarchy: `Off` and `On` at the root, `On` keeps shallow history and
//! owns `Green`/`Yellow`/`Red`/`RedYellow` with `Green` as initial.

use crate::{find_common_parent, State, Statemachine, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Evt {
    TurnOn,
    TurnOff,
    GoYellow,
    GoRed,
    GoGreen,
    SelfTrans,
}

#[derive(Default)]
struct Traffic {
    log: Vec<String>,
    unhandled: usize,
    deferred: usize,
    changes: Vec<(&'static str, &'static str)>,
}

type St = State<Traffic, Evt>;
type Tr = Transition<Traffic, Evt>;

fn off_handler(_: &mut Traffic, _: &St, event: &Evt) -> Tr {
    match event {
        Evt::TurnOn => Transition::to(&ON),
        Evt::GoYellow | Evt::GoRed => Transition::Defer,
        Evt::SelfTrans => Transition::to(&OFF),
        _ => Transition::Unhandled,
    }
}

fn on_handler(_: &mut Traffic, _: &St, event: &Evt) -> Tr {
    match event {
        Evt::TurnOff => Transition::to(&OFF),
        // Already on: consume without exit/entry.
        Evt::TurnOn => Transition::internal(),
        Evt::GoRed => Transition::to(&RED),
        _ => Transition::Unhandled,
    }
}

fn green_handler(_: &mut Traffic, _: &St, event: &Evt) -> Tr {
    match event {
        Evt::GoYellow => Transition::to(&YELLOW),
        _ => Transition::Unhandled,
    }
}

fn yellow_handler(_: &mut Traffic, _: &St, event: &Evt) -> Tr {
    match event {
        Evt::GoRed => Transition::to_with(&RED, &[action_a1, action_a2]),
        _ => Transition::Unhandled,
    }
}

fn red_handler(_: &mut Traffic, _: &St, event: &Evt) -> Tr {
    match event {
        Evt::GoYellow => Transition::to(&RED_YELLOW),
        _ => Transition::Unhandled,
    }
}

fn red_yellow_handler(_: &mut Traffic, _: &St, event: &Evt) -> Tr {
    match event {
        Evt::GoGreen => Transition::to_with(&GREEN, &[action_walk]),
        _ => Transition::Unhandled,
    }
}

fn off_entry(traffic: &mut Traffic, _: &St) {
    traffic.log.push("Off entry".into());
}

fn off_exit(traffic: &mut Traffic, _: &St) {
    traffic.log.push("Off exit".into());
}

fn action_a1(traffic: &mut Traffic, _: &Evt) {
    traffic.log.push("A1".into());
}

fn action_a2(traffic: &mut Traffic, _: &Evt) {
    traffic.log.push("A2".into());
}

fn action_walk(traffic: &mut Traffic, _: &Evt) {
    traffic.log.push("Walk".into());
}

static OFF: St = State::new("Off", off_handler)
    .with_entry(&[off_entry])
    .with_exit(&[off_exit]);
static ON: St = State::new("On", on_handler)
    .with_initial(&GREEN)
    .with_history();
static GREEN: St = State::new("Green", green_handler).with_parent(&ON);
static YELLOW: St = State::new("Yellow", yellow_handler).with_parent(&ON);
static RED: St = State::new("Red", red_handler).with_parent(&ON);
static RED_YELLOW: St = State::new("RedYellow", red_yellow_handler).with_parent(&ON);

fn machine() -> (Statemachine<Traffic, Evt>, Traffic) {
    let mut fsm = Statemachine::new("traffic", &OFF);
    fsm.on_state_entry = Some(Box::new(|traffic: &mut Traffic, state: &St| {
        traffic.log.push(format!("enter {}", state.name()));
    }));
    fsm.on_state_exit = Some(Box::new(|traffic: &mut Traffic, state: &St| {
        traffic.log.push(format!("exit {}", state.name()));
    }));
    fsm.on_unhandled_event = Some(Box::new(|traffic: &mut Traffic, _: &St, _: &Evt| {
        traffic.unhandled += 1;
    }));
    fsm.on_defer_event = Some(Box::new(|traffic: &mut Traffic, _: &St, _: &Evt| {
        traffic.deferred += 1;
    }));
    fsm.on_state_change = Some(Box::new(
        |traffic: &mut Traffic, _: &Evt, from: &St, to: &St| {
            traffic.changes.push((from.name(), to.name()));
        },
    ));
    (fsm, Traffic::default())
}

fn at(fsm: &Statemachine<Traffic, Evt>, state: &'static St) -> bool {
    fsm.current_state().is_some_and(|current| current.is(state))
}

#[test]
fn cold_start_enters_the_initial_leaf() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    assert!(at(&fsm, &OFF));
    assert_eq!(traffic.log, ["enter Off", "Off entry"]);
}

#[test]
fn start_drills_into_the_initial_substate() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    fsm.react(&mut traffic, &Evt::TurnOn);
    assert!(at(&fsm, &GREEN));
    assert_eq!(
        traffic.log,
        [
            "enter Off",
            "Off entry",
            "exit Off",
            "Off exit",
            "enter On",
            "enter Green"
        ]
    );

    fsm.react(&mut traffic, &Evt::GoYellow);
    assert!(at(&fsm, &YELLOW));
}

#[test]
fn transition_actions_run_between_exit_and_entry_in_order() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    fsm.react(&mut traffic, &Evt::TurnOn);
    fsm.react(&mut traffic, &Evt::GoYellow);

    traffic.log.clear();
    fsm.react(&mut traffic, &Evt::GoRed);
    assert!(at(&fsm, &RED));
    assert_eq!(traffic.log, ["exit Yellow", "A1", "A2", "enter Red"]);
}

#[test]
fn walk_action_runs_on_the_red_yellow_to_green_transition() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    for event in [Evt::TurnOn, Evt::GoYellow, Evt::GoRed, Evt::GoYellow] {
        fsm.react(&mut traffic, &event);
    }
    assert!(at(&fsm, &RED_YELLOW));

    traffic.log.clear();
    fsm.react(&mut traffic, &Evt::GoGreen);
    assert!(at(&fsm, &GREEN));
    assert_eq!(traffic.log, ["exit RedYellow", "Walk", "enter Green"]);
}

#[test]
fn history_restores_the_last_active_substate() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    fsm.react(&mut traffic, &Evt::TurnOn);
    fsm.react(&mut traffic, &Evt::GoYellow);
    assert!(at(&fsm, &YELLOW));

    fsm.react(&mut traffic, &Evt::TurnOff);
    assert!(at(&fsm, &OFF));

    traffic.log.clear();
    fsm.react(&mut traffic, &Evt::TurnOn);
    assert!(at(&fsm, &YELLOW), "history must win over the declared initial");
    assert_eq!(
        traffic.log,
        ["exit Off", "Off exit", "enter On", "enter Yellow"]
    );
}

#[test]
fn restarting_clears_history() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    fsm.react(&mut traffic, &Evt::TurnOn);
    fsm.react(&mut traffic, &Evt::GoYellow);
    fsm.react(&mut traffic, &Evt::TurnOff);

    fsm.start(&mut traffic);
    assert!(at(&fsm, &OFF));
    fsm.react(&mut traffic, &Evt::TurnOn);
    assert!(at(&fsm, &GREEN), "a restarted machine has no history");
}

#[test]
fn defer_reports_and_leaves_the_state_untouched() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    traffic.log.clear();

    fsm.react(&mut traffic, &Evt::GoRed);
    assert_eq!(traffic.deferred, 1);
    assert!(at(&fsm, &OFF));
    assert!(traffic.log.is_empty(), "defer must not run exit/entry actions");
}

#[test]
fn unhandled_event_is_reported_exactly_once() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    fsm.react(&mut traffic, &Evt::GoGreen);
    assert_eq!(traffic.unhandled, 1);
    assert!(at(&fsm, &OFF));
}

#[test]
fn self_transition_exits_and_reenters_once() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    traffic.log.clear();

    fsm.react(&mut traffic, &Evt::SelfTrans);
    assert!(at(&fsm, &OFF));
    assert_eq!(
        traffic.log,
        ["exit Off", "Off exit", "enter Off", "Off entry"]
    );
    assert!(
        traffic.changes.is_empty(),
        "the leaf did not change, so no change notification"
    );
}

#[test]
fn internal_transition_runs_no_exit_or_entry() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    fsm.react(&mut traffic, &Evt::TurnOn);
    traffic.log.clear();

    fsm.react(&mut traffic, &Evt::TurnOn);
    assert!(at(&fsm, &GREEN));
    assert!(traffic.log.is_empty());
}

#[test]
fn events_bubble_to_the_parent_handler() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    fsm.react(&mut traffic, &Evt::TurnOn);

    // Green does not know TurnOff; On does.
    fsm.react(&mut traffic, &Evt::TurnOff);
    assert!(at(&fsm, &OFF));
}

#[test]
fn change_hook_sees_the_old_and_new_leaves() {
    let (mut fsm, mut traffic) = machine();
    fsm.start(&mut traffic);
    fsm.react(&mut traffic, &Evt::TurnOn);
    fsm.react(&mut traffic, &Evt::GoYellow);
    assert_eq!(traffic.changes, [("Off", "Green"), ("Green", "Yellow")]);
}

#[test]
fn common_parent_lookup() {
    assert!(find_common_parent(&GREEN, &YELLOW).is_some_and(|s| s.is(&ON)));
    assert!(find_common_parent(&ON, &GREEN).is_some_and(|s| s.is(&ON)));
    assert!(find_common_parent(&GREEN, &OFF).is_none());
    assert!(find_common_parent(&OFF, &ON).is_none());
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "react before start")]
fn react_before_start_is_a_precondition_violation() {
    let (mut fsm, mut traffic) = machine();
    fsm.react(&mut traffic, &Evt::TurnOn);
}
