//! Generic finite state machine with delayed transitions.
//!
//! RULES:
//!   - Only the owner mutates the machine, through `transition`,
//!     `transition_after` and `tick`.
//!   - `tick` is called exactly once per frame by the owner.
//!   - A pending delayed transition is overwritten by any later
//!     `transition_after` call (last caller wins, nothing is queued).
//!
//! Observers are invoked synchronously, in registration order, every time
//! a transition commits. An observer receives `&mut StateMachine<S>` and may
//! transition the machine again from inside its callback. That nested
//! transition commits immediately and is announced to every other observer
//! before control returns; the observer that caused it is never re-entered
//! and does not see its own nested transition.

use std::fmt;

/// A committed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transitioned<S> {
    pub from: S,
    pub to:   S,
}

/// Stable, human-readable name for a state label. Used in event logs.
pub trait StateLabel: Copy {
    fn label(&self) -> &'static str;
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub type Observer<S> = Box<dyn FnMut(&mut StateMachine<S>, Transitioned<S>)>;

struct ObserverSlot<S> {
    id:       ObserverId,
    /// `None` while this observer's callback is running.
    callback: Option<Observer<S>>,
}

pub struct StateMachine<S> {
    current:              S,
    previous:             S,
    target:               S,
    ticks_in_state:       u32,
    transition_countdown: u32,
    transitioning:        bool,
    observers:            Vec<ObserverSlot<S>>,
    next_observer:        u64,
}

impl<S: Copy> StateMachine<S> {
    /// Create a machine resting in `initial`. No observer is notified.
    pub fn new(initial: S) -> Self {
        Self {
            current:              initial,
            previous:             initial,
            target:               initial,
            ticks_in_state:       0,
            transition_countdown: 0,
            transitioning:        false,
            observers:            Vec::new(),
            next_observer:        0,
        }
    }

    pub fn current(&self) -> S { self.current }
    pub fn previous(&self) -> S { self.previous }

    /// Frames spent in the current state.
    pub fn ticks_in_state(&self) -> u32 { self.ticks_in_state }

    /// Frames left before the pending transition commits.
    pub fn transition_countdown(&self) -> u32 { self.transition_countdown }

    pub fn is_transitioning(&self) -> bool { self.transitioning }

    /// The pending target, if a delayed transition is in progress.
    pub fn pending(&self) -> Option<S> {
        self.transitioning.then_some(self.target)
    }

    /// Commit to `target` now and notify observers.
    pub fn transition(&mut self, target: S) -> Transitioned<S> {
        self.target = target;
        self.commit()
    }

    /// Commit to `target` after `delay` ticks. A zero delay commits now.
    /// Replaces any transition that is already pending.
    pub fn transition_after(&mut self, target: S, delay: u32) -> Option<Transitioned<S>> {
        if delay == 0 {
            return Some(self.transition(target));
        }
        self.target = target;
        self.transition_countdown = delay;
        self.transitioning = true;
        None
    }

    /// Advance one frame. Returns the transition if one committed.
    pub fn tick(&mut self) -> Option<Transitioned<S>> {
        self.ticks_in_state = self.ticks_in_state.saturating_add(1);

        if !self.transitioning {
            return None;
        }
        self.transition_countdown = self.transition_countdown.saturating_sub(1);
        if self.transition_countdown == 0 {
            Some(self.commit())
        } else {
            None
        }
    }

    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&mut StateMachine<S>, Transitioned<S>) + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push(ObserverSlot { id, callback: Some(Box::new(observer)) });
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|slot| slot.id != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn commit(&mut self) -> Transitioned<S> {
        self.transition_countdown = 0;
        self.ticks_in_state = 0;
        self.previous = self.current;
        self.current = self.target;
        self.transitioning = false;

        let event = Transitioned { from: self.previous, to: self.current };
        self.notify(event);
        event
    }

    fn notify(&mut self, event: Transitioned<S>) {
        // Snapshot ids: observers added during this notification wait
        // for the next transition.
        let ids: Vec<ObserverId> = self.observers.iter().map(|slot| slot.id).collect();

        for id in ids {
            let Some(mut callback) = self
                .observers
                .iter_mut()
                .find(|slot| slot.id == id)
                .and_then(|slot| slot.callback.take())
            else {
                continue;
            };

            callback(self, event);

            // Put it back unless it unsubscribed itself meanwhile.
            if let Some(slot) = self.observers.iter_mut().find(|slot| slot.id == id) {
                slot.callback = Some(callback);
            }
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("target", &self.target)
            .field("ticks_in_state", &self.ticks_in_state)
            .field("transition_countdown", &self.transition_countdown)
            .field("transitioning", &self.transitioning)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light { Red, Green, Amber }

    #[test]
    fn construction_fires_nothing() {
        let sm = StateMachine::new(Light::Red);
        assert_eq!(sm.current(), Light::Red);
        assert_eq!(sm.previous(), Light::Red);
        assert_eq!(sm.pending(), None);
        assert_eq!(sm.ticks_in_state(), 0);
    }

    #[test]
    fn countdown_floors_at_zero_and_commits_once() {
        let mut sm = StateMachine::new(Light::Red);
        sm.transition_after(Light::Green, 1);
        assert_eq!(sm.tick(), Some(Transitioned { from: Light::Red, to: Light::Green }));
        assert_eq!(sm.tick(), None);
        assert_eq!(sm.transition_countdown(), 0);
        assert_eq!(sm.ticks_in_state(), 1);
    }

    #[test]
    fn observer_can_unsubscribe_itself() {
        use std::{cell::Cell, rc::Rc};

        let calls = Rc::new(Cell::new(0));
        let mut sm = StateMachine::new(Light::Red);
        let seen = calls.clone();
        let id = Rc::new(Cell::new(None));
        let own_id = id.clone();
        let registered = sm.subscribe(move |sm, _| {
            seen.set(seen.get() + 1);
            if let Some(me) = own_id.get() {
                sm.unsubscribe(me);
            }
        });
        id.set(Some(registered));

        sm.transition(Light::Green);
        sm.transition(Light::Amber);
        assert_eq!(calls.get(), 1);
        assert_eq!(sm.observer_count(), 0);
    }
}
