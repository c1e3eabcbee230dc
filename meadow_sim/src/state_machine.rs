// Generic stack-based hierarchical state machine.
//
// A `StateGraph` is assembled first (states plus their outgoing transitions,
// in registration order) and then `start`ed into a `StateMachine`, which
// enters the initial state immediately. Each `update` call applies at most
// one transition out of the state on top of the stack and then updates
// whichever state is active afterwards.
//
// Transition effects:
// - `Push`: push the target on top of the current state. The interrupted
//   state is *not* exited; it resumes untouched when the target is popped.
// - `Swap`: exit and replace the current state with the target.
// - `Pop`: exit the current state and resume the one below. The bottom of
//   the stack is never popped.
// - `NoAction`: stay put.
//
// Ordering within one `update`: exit/pop of the old state, then the
// transition's actions, then enter of the new state, then `update` of the
// resulting active state. `Pop` does not re-enter the exposed state.
//
// The context `C` is passed into every call rather than stored, so states and
// predicates never hold references back into their owner. States live in an
// arena indexed by `StateId`; the stack holds ids, never the states
// themselves.
//
// Malformed graphs (pop at depth 1, push/swap without a target, starting on
// a foreign state id) are programming errors and panic.

use smallvec::SmallVec;
use std::fmt;

/// Lifecycle hooks of a state. All three default to doing nothing.
pub trait State<C> {
    fn enter(&mut self, _ctx: &mut C) {}
    fn update(&mut self, _ctx: &mut C) {}
    fn exit(&mut self, _ctx: &mut C) {}
}

/// Index of a state within its graph's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

/// What a transition's predicate asks the machine to do this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionEffect {
    Push,
    Swap,
    Pop,
    NoAction,
}

type Predicate<S, C> = Box<dyn Fn(&S, &C) -> TransitionEffect>;
type Action<C> = Box<dyn Fn(&mut C)>;

/// One outgoing edge of a state.
pub struct StateTransition<S, C> {
    predicate: Predicate<S, C>,
    target: Option<StateId>,
    actions: Vec<Action<C>>,
}

impl<S, C> StateTransition<S, C> {
    /// A transition with no target and no actions. Only `Pop` (or
    /// `NoAction`) effects are valid until `to` is called.
    pub fn new(predicate: impl Fn(&S, &C) -> TransitionEffect + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            target: None,
            actions: Vec::new(),
        }
    }

    pub fn to(mut self, target: StateId) -> Self {
        self.target = Some(target);
        self
    }

    /// Append a side effect, run between exit/pop and enter.
    pub fn with_action(mut self, action: impl Fn(&mut C) + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    pub fn target(&self) -> Option<StateId> {
        self.target
    }

    fn evaluate(&self, state: &S, ctx: &C) -> TransitionEffect {
        (self.predicate)(state, ctx)
    }
}

impl<S, C> fmt::Debug for StateTransition<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTransition")
            .field("target", &self.target)
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// Builder holding states and their transitions before the machine starts.
pub struct StateGraph<S, C> {
    states: Vec<S>,
    transitions: Vec<SmallVec<[StateTransition<S, C>; 4]>>,
}

impl<S: State<C>, C> Default for StateGraph<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State<C>, C> StateGraph<S, C> {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn add_state(&mut self, state: S) -> StateId {
        self.states.push(state);
        self.transitions.push(SmallVec::new());
        StateId(self.states.len() - 1)
    }

    /// Register an outgoing transition of `from`. Transitions are checked
    /// in the order they were added.
    pub fn add_transition(&mut self, from: StateId, transition: StateTransition<S, C>) {
        self.transitions[from.0].push(transition);
    }

    /// Consume the graph into a running machine, entering `initial`.
    pub fn start(self, initial: StateId, ctx: &mut C) -> StateMachine<S, C> {
        assert!(
            initial.0 < self.states.len(),
            "start: {initial:?} is not a state of this graph"
        );
        let mut machine = StateMachine {
            states: self.states,
            transitions: self.transitions,
            stack: vec![initial],
        };
        machine.states[initial.0].enter(ctx);
        machine
    }
}

/// A running state machine. The stack is never empty.
pub struct StateMachine<S, C> {
    states: Vec<S>,
    transitions: Vec<SmallVec<[StateTransition<S, C>; 4]>>,
    stack: Vec<StateId>,
}

impl<S: State<C>, C> StateMachine<S, C> {
    /// The state on top of the stack.
    pub fn current(&self) -> StateId {
        *self
            .stack
            .last()
            .expect("state machine stack must never be empty")
    }

    pub fn current_state(&self) -> &S {
        &self.states[self.current().0]
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn state(&self, id: StateId) -> &S {
        &self.states[id.0]
    }

    /// Ids on the stack, bottom first.
    pub fn stack(&self) -> &[StateId] {
        &self.stack
    }

    /// First transition of the top state whose effect is not `NoAction`.
    fn check_transitions(&self, ctx: &C) -> Option<(TransitionEffect, usize)> {
        let top = self.current();
        let state = &self.states[top.0];
        self.transitions[top.0]
            .iter()
            .enumerate()
            .find_map(|(i, t)| match t.evaluate(state, ctx) {
                TransitionEffect::NoAction => None,
                effect => Some((effect, i)),
            })
    }

    fn run_actions(&self, from: StateId, index: usize, ctx: &mut C) {
        for action in &self.transitions[from.0][index].actions {
            action(ctx);
        }
    }

    fn required_target(&self, from: StateId, index: usize) -> StateId {
        match self.transitions[from.0][index].target() {
            Some(target) => target,
            None => panic!("transition {index} of {from:?} needs a target"),
        }
    }

    /// Advance one tick: apply at most one transition, then update the
    /// active state.
    pub fn update(&mut self, ctx: &mut C) {
        let top = self.current();
        let Some((effect, index)) = self.check_transitions(ctx) else {
            self.states[top.0].update(ctx);
            return;
        };

        match effect {
            TransitionEffect::Pop => {
                assert!(self.stack.len() > 1, "cannot pop the bottom state");
                self.states[top.0].exit(ctx);
                self.stack.pop();
                self.run_actions(top, index, ctx);
                let exposed = self.current();
                self.states[exposed.0].update(ctx);
            }
            TransitionEffect::Push => {
                let target = self.required_target(top, index);
                self.stack.push(target);
                self.run_actions(top, index, ctx);
                self.states[target.0].enter(ctx);
                self.states[target.0].update(ctx);
            }
            TransitionEffect::Swap => {
                let target = self.required_target(top, index);
                self.states[top.0].exit(ctx);
                self.stack.pop();
                self.stack.push(target);
                self.run_actions(top, index, ctx);
                self.states[target.0].enter(ctx);
                self.states[target.0].update(ctx);
            }
            TransitionEffect::NoAction => unreachable!("filtered by check_transitions"),
        }
    }
}

impl<S: fmt::Debug, C> fmt::Debug for StateMachine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("stack", &self.stack)
            .field("states", &self.states)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every hook call so ordering can be asserted.
    #[derive(Default)]
    struct Log {
        entries: Vec<String>,
        flag: bool,
        go_back: bool,
    }

    #[derive(Debug)]
    struct Named(&'static str);

    impl State<Log> for Named {
        fn enter(&mut self, ctx: &mut Log) {
            ctx.entries.push(format!("enter {}", self.0));
        }
        fn update(&mut self, ctx: &mut Log) {
            ctx.entries.push(format!("update {}", self.0));
        }
        fn exit(&mut self, ctx: &mut Log) {
            ctx.entries.push(format!("exit {}", self.0));
        }
    }

    fn when_flag(effect: TransitionEffect) -> impl Fn(&Named, &Log) -> TransitionEffect {
        move |_, ctx| {
            if ctx.flag {
                effect
            } else {
                TransitionEffect::NoAction
            }
        }
    }

    #[test]
    fn start_enters_initial_state() {
        let mut log = Log::default();
        let mut graph = StateGraph::new();
        let a = graph.add_state(Named("a"));
        let sm = graph.start(a, &mut log);
        assert_eq!(sm.current(), a);
        assert_eq!(sm.depth(), 1);
        assert_eq!(log.entries, vec!["enter a"]);
    }

    #[test]
    fn no_action_updates_top() {
        let mut log = Log::default();
        let mut graph = StateGraph::new();
        let a = graph.add_state(Named("a"));
        let b = graph.add_state(Named("b"));
        graph.add_transition(a, StateTransition::new(when_flag(TransitionEffect::Swap)).to(b));
        let mut sm = graph.start(a, &mut log);
        log.entries.clear();
        sm.update(&mut log);
        assert_eq!(log.entries, vec!["update a"]);
        assert_eq!(sm.current(), a);
    }

    #[test]
    fn swap_orders_exit_action_enter_update() {
        let mut log = Log::default();
        let mut graph = StateGraph::new();
        let a = graph.add_state(Named("a"));
        let b = graph.add_state(Named("b"));
        graph.add_transition(
            a,
            StateTransition::new(when_flag(TransitionEffect::Swap))
                .to(b)
                .with_action(|ctx: &mut Log| ctx.entries.push("action".into())),
        );
        let mut sm = graph.start(a, &mut log);
        log.entries.clear();
        log.flag = true;
        sm.update(&mut log);
        assert_eq!(log.entries, vec!["exit a", "action", "enter b", "update b"]);
        assert_eq!(sm.current(), b);
        assert_eq!(sm.depth(), 1);
    }

    #[test]
    fn push_keeps_interrupted_state_and_pop_resumes_it() {
        let mut log = Log::default();
        let mut graph = StateGraph::new();
        let a = graph.add_state(Named("a"));
        let d = graph.add_state(Named("d"));
        graph.add_transition(a, StateTransition::new(when_flag(TransitionEffect::Push)).to(d));
        graph.add_transition(
            d,
            StateTransition::new(|_: &Named, ctx: &Log| {
                if ctx.go_back {
                    TransitionEffect::Pop
                } else {
                    TransitionEffect::NoAction
                }
            })
            .with_action(|ctx: &mut Log| ctx.entries.push("popped".into())),
        );
        let mut sm = graph.start(a, &mut log);
        log.entries.clear();

        log.flag = true;
        sm.update(&mut log);
        assert_eq!(log.entries, vec!["enter d", "update d"]);
        assert_eq!(sm.depth(), 2);
        assert_eq!(sm.stack(), &[a, d]);

        log.entries.clear();
        log.flag = false;
        log.go_back = true;
        sm.update(&mut log);
        assert_eq!(log.entries, vec!["exit d", "popped", "update a"]);
        assert_eq!(sm.depth(), 1);
        assert_eq!(sm.current(), a);
    }

    #[test]
    fn first_matching_transition_wins_and_only_one_fires() {
        let mut log = Log::default();
        let mut graph = StateGraph::new();
        let a = graph.add_state(Named("a"));
        let b = graph.add_state(Named("b"));
        let c = graph.add_state(Named("c"));
        graph.add_transition(
            a,
            StateTransition::new(|_: &Named, _: &Log| TransitionEffect::NoAction).to(c),
        );
        graph.add_transition(
            a,
            StateTransition::new(|_: &Named, _: &Log| TransitionEffect::Swap).to(b),
        );
        graph.add_transition(
            a,
            StateTransition::new(|_: &Named, _: &Log| TransitionEffect::Swap).to(c),
        );
        // b would immediately swap back to a if transitions chained.
        graph.add_transition(
            b,
            StateTransition::new(|_: &Named, _: &Log| TransitionEffect::Swap).to(a),
        );
        let mut sm = graph.start(a, &mut log);
        sm.update(&mut log);
        assert_eq!(sm.current(), b);
        sm.update(&mut log);
        assert_eq!(sm.current(), a);
    }

    #[test]
    #[should_panic(expected = "cannot pop the bottom state")]
    fn pop_at_bottom_panics() {
        let mut log = Log::default();
        let mut graph = StateGraph::new();
        let a = graph.add_state(Named("a"));
        graph.add_transition(a, StateTransition::new(|_: &Named, _: &Log| TransitionEffect::Pop));
        let mut sm = graph.start(a, &mut log);
        sm.update(&mut log);
    }

    #[test]
    #[should_panic(expected = "needs a target")]
    fn push_without_target_panics() {
        let mut log = Log::default();
        let mut graph = StateGraph::new();
        let a = graph.add_state(Named("a"));
        graph.add_transition(a, StateTransition::new(|_: &Named, _: &Log| TransitionEffect::Push));
        let mut sm = graph.start(a, &mut log);
        sm.update(&mut log);
    }

    #[test]
    #[should_panic(expected = "is not a state of this graph")]
    fn start_with_foreign_id_panics() {
        let mut log = Log::default();
        let mut other = StateGraph::<Named, Log>::new();
        other.add_state(Named("x"));
        let foreign = other.add_state(Named("y"));
        let mut graph = StateGraph::<Named, Log>::new();
        graph.add_state(Named("a"));
        let _ = graph.start(foreign, &mut log);
    }
}
