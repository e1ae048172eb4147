//! State machine behaviour: immediate and delayed transitions, last-writer
//! wins, and the observer re-entrancy contract.

use boogaloo_core::state_machine::{StateMachine, Transitioned};
use std::{cell::RefCell, rc::Rc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Light {
    Red,
    Green,
    Yellow,
}

use Light::*;

#[test]
fn new_machine_rests_in_initial_state() {
    let m = StateMachine::new(Red);
    assert_eq!(m.current(), Red);
    assert_eq!(m.previous(), Red);
    assert_eq!(m.ticks_in_state(), 0);
    assert!(!m.is_transitioning());
    assert_eq!(m.pending(), None);
}

#[test]
fn immediate_transition_commits_and_resets_counter() {
    let mut m = StateMachine::new(Red);
    m.tick();
    m.tick();
    assert_eq!(m.ticks_in_state(), 2);

    let t = m.transition(Green);
    assert_eq!(t, Transitioned { from: Red, to: Green });
    assert_eq!(m.current(), Green);
    assert_eq!(m.previous(), Red);
    assert_eq!(m.ticks_in_state(), 0);
}

#[test]
fn delayed_transition_commits_after_exactly_n_ticks() {
    let mut m = StateMachine::new(Red);
    assert!(m.transition_after(Green, 3).is_none());
    assert_eq!(m.pending(), Some(Green));

    assert!(m.tick().is_none());
    assert!(m.tick().is_none());
    assert_eq!(m.current(), Red);
    assert_eq!(m.transition_countdown(), 1);

    let t = m.tick().expect("commit on third tick");
    assert_eq!(t, Transitioned { from: Red, to: Green });
    assert!(!m.is_transitioning());
}

#[test]
fn zero_delay_is_immediate() {
    let mut m = StateMachine::new(Red);
    assert!(m.transition_after(Yellow, 0).is_some());
    assert_eq!(m.current(), Yellow);
}

#[test]
fn later_delayed_call_overwrites_pending_target() {
    let mut m = StateMachine::new(Red);
    m.transition_after(Green, 2);
    m.tick();
    m.transition_after(Yellow, 2);

    m.tick();
    assert_eq!(m.current(), Red, "countdown restarted");
    m.tick();
    assert_eq!(m.current(), Yellow);
    assert_eq!(m.previous(), Red, "Green never became current");
}

#[test]
fn immediate_transition_cancels_pending_one() {
    let mut m = StateMachine::new(Red);
    m.transition_after(Green, 2);
    m.transition(Yellow);
    m.tick();
    m.tick();
    assert_eq!(m.current(), Yellow);
}

#[test]
fn observers_run_in_registration_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut m = StateMachine::new(Red);

    for name in ["first", "second", "third"] {
        let log = Rc::clone(&log);
        m.subscribe(move |_, t| log.borrow_mut().push((name, t.to)));
    }

    m.transition(Green);
    assert_eq!(
        *log.borrow(),
        vec![("first", Green), ("second", Green), ("third", Green)]
    );
}

#[test]
fn unsubscribed_observer_is_not_called() {
    let calls = Rc::new(RefCell::new(0));
    let mut m = StateMachine::new(Red);
    let id = {
        let calls = Rc::clone(&calls);
        m.subscribe(move |_, _| *calls.borrow_mut() += 1)
    };
    m.transition(Green);
    assert!(m.unsubscribe(id));
    assert!(!m.unsubscribe(id));
    m.transition(Yellow);
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn observer_may_transition_from_inside_its_callback() {
    let seen_by_other = Rc::new(RefCell::new(Vec::new()));
    let seen_by_trigger = Rc::new(RefCell::new(Vec::new()));
    let mut m = StateMachine::new(Red);

    {
        let seen = Rc::clone(&seen_by_trigger);
        m.subscribe(move |machine, t| {
            seen.borrow_mut().push(t);
            if t.to == Green {
                machine.transition(Yellow);
            }
        });
    }
    {
        let seen = Rc::clone(&seen_by_other);
        m.subscribe(move |_, t| seen.borrow_mut().push(t));
    }

    m.transition(Green);

    assert_eq!(m.current(), Yellow);
    assert_eq!(m.previous(), Green);
    // The nested transition commits and is announced before the outer
    // notification reaches the second observer.
    assert_eq!(
        *seen_by_other.borrow(),
        vec![
            Transitioned { from: Green, to: Yellow },
            Transitioned { from: Red, to: Green },
        ]
    );
    // The triggering observer never sees its own nested transition.
    assert_eq!(*seen_by_trigger.borrow(), vec![Transitioned { from: Red, to: Green }]);
}

#[test]
fn observer_added_during_notification_waits_for_next_transition() {
    let late_calls = Rc::new(RefCell::new(0));
    let mut m = StateMachine::new(Red);
    {
        let late_calls = Rc::clone(&late_calls);
        let mut added = false;
        m.subscribe(move |machine, _| {
            if !added {
                added = true;
                let late_calls = Rc::clone(&late_calls);
                machine.subscribe(move |_, _| *late_calls.borrow_mut() += 1);
            }
        });
    }

    m.transition(Green);
    assert_eq!(*late_calls.borrow(), 0);
    m.transition(Yellow);
    assert_eq!(*late_calls.borrow(), 1);
    assert_eq!(m.observer_count(), 2);
}
