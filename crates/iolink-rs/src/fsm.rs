// crates/iolink-rs/src/fsm.rs
//! Table driven state machine engine shared by the Configuration Manager and
//! Data Storage.
//!
//! A machine is described by a static table mapping each state to an ordered
//! list of `(event, next state, action)` triples. Firing an event picks the
//! first matching triple of the current state, switches to its next state and
//! runs its action. An action may return a follow-up event, which is fired
//! immediately, within the same call, until no event is left.

use crate::types::PortNumber;
use core::fmt::Debug;
use log::{debug, warn};

/// One row of a transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S, E, A> {
    pub event: E,
    pub next_state: S,
    pub action: A,
}

impl<S, E, A> Transition<S, E, A> {
    pub const fn new(event: E, next_state: S, action: A) -> Self {
        Self {
            event,
            next_state,
            action,
        }
    }
}

/// Returns the first transition in `transitions` that reacts to `event`.
pub fn lookup<S, E: PartialEq, A>(
    transitions: &[Transition<S, E, A>],
    event: E,
) -> Option<&Transition<S, E, A>> {
    transitions.iter().find(|t| t.event == event)
}

/// A trait defining the common behavior of the table driven machines.
pub trait StateMachine {
    type State: Copy + PartialEq + Debug + 'static;
    type Event: Copy + PartialEq + Debug + 'static;
    type Action: Copy + Debug + 'static;

    /// Tag used in log lines, e.g. "CM".
    const NAME: &'static str;

    /// Port this machine instance belongs to.
    fn port(&self) -> PortNumber;

    fn current_state(&self) -> Self::State;

    /// Sets the internal state. Required for the provided `fire` method.
    fn set_state(&mut self, state: Self::State);

    /// The static transition list of `state`.
    fn transitions(state: Self::State)
    -> &'static [Transition<Self::State, Self::Event, Self::Action>];

    /// Runs `action` for `event`, returning a follow-up event if any.
    fn perform(&mut self, action: Self::Action, event: Self::Event) -> Option<Self::Event>;

    /// Fires `event` and chains follow-up events synchronously.
    ///
    /// An event without a matching transition is logged and otherwise
    /// ignored: the state stays as it is. Returns the number of transitions
    /// taken.
    fn fire(&mut self, event: Self::Event) -> usize {
        let mut next_event = Some(event);
        let mut taken = 0;

        while let Some(event) = next_event {
            let previous = self.current_state();
            let Some(transition) = lookup(Self::transitions(previous), event) else {
                warn!(
                    "[{}] Port {}: Unhandled event {:?} in state {:?}",
                    Self::NAME,
                    self.port(),
                    event,
                    previous
                );
                return taken;
            };

            self.set_state(transition.next_state);
            debug!(
                "[{}] Port {}: event {:?}, state transition: {:?} -> {:?}",
                Self::NAME,
                self.port(),
                event,
                previous,
                transition.next_state
            );
            taken += 1;
            next_event = self.perform(transition.action, event);
        }

        taken
    }
}
