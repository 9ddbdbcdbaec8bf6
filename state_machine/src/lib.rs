//! Keyed finite-state machine with enter/update/fixed-update/exit hooks.
//!
//! States share a context `C` owned by the caller. A state asks for a transition by
//! returning the next key from `on_update`; the machine performs the swap so that
//! the old state always exits before the new one enters.
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, warn};

pub trait State<K, C: ?Sized> {
    fn on_enter(&mut self, _ctx: &mut C) {}

    /// Frame tick. Returning `Some(key)` requests a transition.
    fn on_update(&mut self, ctx: &mut C) -> Option<K>;

    fn on_fixed_update(&mut self, _ctx: &mut C) {}

    fn on_exit(&mut self, _ctx: &mut C) {}
}

/// Executed transition, reported by [`StateMachine::update`] and
/// [`StateMachine::change_state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition<K> {
    pub from: Option<K>,
    pub to: K,
}

pub struct StateMachine<K, C: ?Sized> {
    states: HashMap<K, Box<dyn State<K, C>>>,
    current: Option<K>,
}

impl<K, C: ?Sized> Default for StateMachine<K, C>
where
    K: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, C: ?Sized> StateMachine<K, C>
where
    K: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            current: None,
        }
    }

    /// Associate `state` with `key`. A second registration replaces the first.
    pub fn register_state(&mut self, key: K, state: Box<dyn State<K, C>>) {
        if self.states.insert(key, state).is_some() {
            warn!(state = ?key, "state already registered, overwriting");
        }
    }

    /// Enter `key` as the first state. Unregistered keys are logged and ignored.
    pub fn initialize(&mut self, key: K, ctx: &mut C) -> bool {
        let Some(state) = self.states.get_mut(&key) else {
            warn!(state = ?key, "initial state not registered");
            return false;
        };
        self.current = Some(key);
        state.on_enter(ctx);
        true
    }

    /// Exit the current state, then enter `key`. Unregistered keys are a no-op.
    pub fn change_state(&mut self, key: K, ctx: &mut C) -> Option<Transition<K>> {
        if !self.states.contains_key(&key) {
            warn!(state = ?key, "state not registered, staying in {:?}", self.current);
            return None;
        }
        let from = self.current;
        if let Some(state) = from.and_then(|current| self.states.get_mut(&current)) {
            state.on_exit(ctx);
        }
        self.current = Some(key);
        if let Some(state) = self.states.get_mut(&key) {
            state.on_enter(ctx);
        }
        debug!(from = ?from, to = ?key, "state changed");
        Some(Transition { from, to: key })
    }

    /// Run the current state's frame tick and execute any requested transition.
    pub fn update(&mut self, ctx: &mut C) -> Option<Transition<K>> {
        let current = self.current?;
        let next = self.states.get_mut(&current)?.on_update(ctx)?;
        self.change_state(next, ctx)
    }

    pub fn fixed_update(&mut self, ctx: &mut C) {
        let Some(current) = self.current else {
            return;
        };
        if let Some(state) = self.states.get_mut(&current) {
            state.on_fixed_update(ctx);
        }
    }

    pub fn is_in_state(&self, key: K) -> bool {
        self.current == Some(key)
    }

    pub fn current(&self) -> Option<K> {
        self.current
    }

    pub fn get_state(&self, key: K) -> Option<&dyn State<K, C>> {
        self.states.get(&key).map(|state| state.as_ref())
    }

    pub fn is_registered(&self, key: K) -> bool {
        self.states.contains_key(&key)
    }

    /// Exit the current state and drop every registration.
    pub fn clear(&mut self, ctx: &mut C) {
        if let Some(state) = self.current.and_then(|current| self.states.get_mut(&current)) {
            state.on_exit(ctx);
        }
        self.states.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Key {
        Idle,
        Run,
        Jump,
    }

    #[derive(Default)]
    struct Log {
        calls: Vec<String>,
        entered: Vec<Key>,
        max_entered: usize,
        next: Option<Key>,
        fixed_ticks: u32,
    }

    struct Recorder(Key);

    impl State<Key, Log> for Recorder {
        fn on_enter(&mut self, ctx: &mut Log) {
            ctx.calls.push(format!("enter {:?}", self.0));
            ctx.entered.push(self.0);
            ctx.max_entered = ctx.max_entered.max(ctx.entered.len());
        }

        fn on_update(&mut self, ctx: &mut Log) -> Option<Key> {
            ctx.calls.push(format!("update {:?}", self.0));
            ctx.next.take()
        }

        fn on_fixed_update(&mut self, ctx: &mut Log) {
            ctx.fixed_ticks += 1;
        }

        fn on_exit(&mut self, ctx: &mut Log) {
            ctx.calls.push(format!("exit {:?}", self.0));
            ctx.entered.retain(|key| *key != self.0);
        }
    }

    fn machine() -> StateMachine<Key, Log> {
        let mut machine = StateMachine::new();
        machine.register_state(Key::Idle, Box::new(Recorder(Key::Idle)));
        machine.register_state(Key::Run, Box::new(Recorder(Key::Run)));
        machine
    }

    #[test]
    fn change_state_exits_before_entering() {
        let mut log = Log::default();
        let mut machine = machine();
        assert!(machine.initialize(Key::Idle, &mut log));
        let transition = machine.change_state(Key::Run, &mut log);

        assert_eq!(
            transition,
            Some(Transition {
                from: Some(Key::Idle),
                to: Key::Run
            })
        );
        assert_eq!(log.calls, vec!["enter Idle", "exit Idle", "enter Run"]);
        assert_eq!(log.max_entered, 1);
        assert!(machine.is_in_state(Key::Run));
    }

    #[test]
    fn unregistered_keys_are_ignored() {
        let mut log = Log::default();
        let mut machine = machine();
        assert!(!machine.initialize(Key::Jump, &mut log));
        assert_eq!(machine.current(), None);

        machine.initialize(Key::Idle, &mut log);
        assert_eq!(machine.change_state(Key::Jump, &mut log), None);
        assert!(machine.is_in_state(Key::Idle));
        assert_eq!(log.calls, vec!["enter Idle"]);
    }

    #[test]
    fn update_executes_requested_transition() {
        let mut log = Log::default();
        let mut machine = machine();
        machine.initialize(Key::Idle, &mut log);
        assert_eq!(machine.update(&mut log), None);

        log.next = Some(Key::Run);
        let transition = machine.update(&mut log).expect("transition");
        assert_eq!(transition.to, Key::Run);
        assert!(machine.is_in_state(Key::Run));
        assert_eq!(log.max_entered, 1);
    }

    #[test]
    fn ticks_without_state_are_noops() {
        let mut log = Log::default();
        let mut machine = machine();
        assert_eq!(machine.update(&mut log), None);
        machine.fixed_update(&mut log);
        assert!(log.calls.is_empty());
        assert_eq!(log.fixed_ticks, 0);

        machine.initialize(Key::Idle, &mut log);
        machine.fixed_update(&mut log);
        assert_eq!(log.fixed_ticks, 1);
    }

    #[test]
    fn duplicate_registration_overwrites() {
        let mut log = Log::default();
        let mut machine = machine();
        machine.register_state(Key::Idle, Box::new(Recorder(Key::Jump)));
        machine.initialize(Key::Idle, &mut log);
        assert_eq!(log.calls, vec!["enter Jump"]);
        assert!(machine.is_in_state(Key::Idle));
    }

    #[test]
    fn clear_exits_current_state() {
        let mut log = Log::default();
        let mut machine = machine();
        machine.initialize(Key::Run, &mut log);
        machine.clear(&mut log);
        assert_eq!(log.calls, vec!["enter Run", "exit Run"]);
        assert_eq!(machine.current(), None);
        assert!(!machine.is_registered(Key::Run));
        assert!(machine.get_state(Key::Idle).is_none());
    }
}
