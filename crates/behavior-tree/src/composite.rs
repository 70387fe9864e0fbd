//! Composite behavior nodes.
//!
//! Composite nodes control the execution flow of multiple child behaviors.
//! This module provides the fundamental building blocks for creating complex
//! decision trees: [`Sequence`](Kind::Sequence) (AND logic) and
//! [`Selector`](Kind::Selector) (OR logic), plus the [`ControlLogic`]
//! extension point for user-defined composites.
//!
//! Every composite owns a traversal strategy that picks which children are
//! ticked on a given tick. Children that already reached a terminal status in
//! the current episode are skipped, so tasks with side effects are not
//! repeated while a later sibling is still running.

use std::str::FromStr;

use crate::arena::{Arena, with_context};
use crate::behavior::StatusHooks;
use crate::node::{Kind, NodeId, NodeKind};
use crate::{Error, Result, Status};

/// Built-in traversal strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Traversal {
    /// Resume from the first running child, or start over when none runs.
    PrioritizeRunning,
    /// Resume from the first child that is not successful, or start over
    /// when all of them are.
    PrioritizeNonSuccess,
    /// Always iterate every child.
    AllNodes,
}

impl Traversal {
    /// Index of the first child to tick, given the children statuses.
    pub fn start(self, statuses: &[Status]) -> usize {
        let position = match self {
            Traversal::PrioritizeRunning => statuses.iter().position(|s| s.is_running()),
            Traversal::PrioritizeNonSuccess => statuses.iter().position(|s| !s.is_success()),
            Traversal::AllNodes => None,
        };
        position.unwrap_or(0)
    }
}

/// Strategy a composite was configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalStrategy {
    Builtin(Traversal),
    /// A strategy defined by a [`ControlLogic`] implementation.
    Custom(String),
}

impl std::fmt::Display for TraversalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraversalStrategy::Builtin(traversal) => write!(f, "{traversal}"),
            TraversalStrategy::Custom(name) => f.write_str(name),
        }
    }
}

/// Decision taken by a composite after inspecting a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep going with the next selected child.
    Continue,
    /// Stop and take this status; children are left as they are.
    Finish(Status),
    /// Stop, halt every child, then take this status.
    Halt(Status),
}

/// Decision logic of a user-defined composite.
///
/// The engine ticks the selected children one at a time and asks
/// [`on_child`](ControlLogic::on_child) what to do after each of them.
/// Both callbacks receive the shared context, or `None` if no context was
/// assigned; it is borrowed only for the duration of the call.
pub trait ControlLogic<C>: StatusHooks {
    /// Strategy used when none is given at construction. Must name a
    /// built-in [`Traversal`] or one of [`strategies`](ControlLogic::strategies).
    fn traversal(&self) -> &str {
        "all_nodes"
    }

    /// Names of the strategies this composite implements in
    /// [`select`](ControlLogic::select).
    fn strategies(&self) -> &[&str] {
        &[]
    }

    /// Indices of the children to tick under the custom strategy `name`.
    fn select(
        &mut self,
        _ctx: Option<&mut C>,
        _name: &str,
        _statuses: &[Status],
    ) -> Vec<usize> {
        Vec::new()
    }

    /// Called after the child at `index` was ticked.
    fn on_child(&mut self, ctx: Option<&mut C>, index: usize, status: Status) -> Step;

    /// Called when every selected child was ticked without a decision.
    /// Returning `Continue` leaves the composite running.
    fn on_exhausted(&mut self) -> Step {
        Step::Continue
    }

    /// Name shown when rendering the tree.
    fn display_name(&self) -> &str {
        "control"
    }
}

pub(crate) enum ControlPolicy<C> {
    Selector,
    Sequence,
    Custom(Box<dyn ControlLogic<C>>),
}

impl<C> ControlPolicy<C> {
    fn default_traversal(&self) -> &str {
        match self {
            ControlPolicy::Selector => "prioritize_running",
            ControlPolicy::Sequence => "prioritize_non_success",
            ControlPolicy::Custom(logic) => logic.traversal(),
        }
    }

    fn resolve(&self, name: &str) -> Result<TraversalStrategy> {
        if let Ok(traversal) = Traversal::from_str(name) {
            return Ok(TraversalStrategy::Builtin(traversal));
        }

        match self {
            ControlPolicy::Custom(logic) if logic.strategies().contains(&name) => {
                Ok(TraversalStrategy::Custom(name.to_owned()))
            }
            _ => Err(Error::IncorrectTraversalStrategy(name.to_owned())),
        }
    }

    fn on_child(&mut self, ctx: Option<&mut C>, index: usize, status: Status) -> Step {
        match self {
            // Try children in order until one succeeds
            ControlPolicy::Selector => match status {
                Status::Running => Step::Finish(Status::Running),
                Status::Success => Step::Halt(Status::Success),
                Status::Failure => Step::Continue,
            },
            // Execute children in order until one fails
            ControlPolicy::Sequence => match status {
                Status::Running => Step::Finish(Status::Running),
                Status::Success => Step::Continue,
                Status::Failure => Step::Halt(Status::Failure),
            },
            ControlPolicy::Custom(logic) => logic.on_child(ctx, index, status),
        }
    }

    fn on_exhausted(&mut self) -> Step {
        match self {
            // All children failed; they keep their status.
            ControlPolicy::Selector => Step::Finish(Status::Failure),
            // All children succeeded; reset them for the next episode.
            ControlPolicy::Sequence => Step::Halt(Status::Success),
            ControlPolicy::Custom(logic) => logic.on_exhausted(),
        }
    }
}

pub(crate) struct ControlNode<C> {
    pub(crate) children: Vec<NodeId>,
    pub(crate) strategy: TraversalStrategy,
    pub(crate) policy: ControlPolicy<C>,
}

impl<C> ControlNode<C> {
    fn new(children: Vec<NodeId>, policy: ControlPolicy<C>, strategy: Option<&str>) -> Result<Self> {
        let strategy = policy.resolve(strategy.unwrap_or_else(|| policy.default_traversal()))?;

        Ok(Self {
            children,
            strategy,
            policy,
        })
    }

    fn select(&mut self, ctx: Option<&mut C>, statuses: &[Status]) -> Result<Vec<usize>> {
        let selected = match (&self.strategy, &mut self.policy) {
            (TraversalStrategy::Builtin(traversal), _) => {
                (traversal.start(statuses)..statuses.len()).collect()
            }
            (TraversalStrategy::Custom(name), ControlPolicy::Custom(logic)) => {
                logic.select(ctx, name, statuses)
            }
            (TraversalStrategy::Custom(name), _) => {
                return Err(Error::IncorrectTraversalStrategy(name.clone()));
            }
        };

        if selected.iter().any(|&index| index >= statuses.len()) {
            return Err(Error::IncorrectTraversalStrategy(self.strategy.to_string()));
        }

        Ok(selected)
    }
}

impl<C> Arena<C> {
    /// Creates a selector with the given children.
    ///
    /// A `Selector` evaluates the selected children from left to right:
    /// - If a child returns `Running`, the selector **stops** and returns `Running`
    /// - If a child returns `Success`, the selector halts every child and returns `Success`
    /// - If a child returns `Failure`, the selector **continues** to the next child
    /// - If all children return `Failure`, the selector returns `Failure`
    ///
    /// Children are selected with [`Traversal::PrioritizeRunning`].
    pub fn selector(&mut self, children: impl IntoIterator<Item = NodeId>) -> Result<NodeId> {
        self.control_node(children, ControlPolicy::Selector, None)
    }

    /// Creates a sequence with the given children.
    ///
    /// A `Sequence` evaluates the selected children from left to right:
    /// - If a child returns `Running`, the sequence **stops** and returns `Running`
    /// - If a child returns `Failure`, the sequence halts every child and returns `Failure`
    /// - If a child returns `Success`, the sequence **continues** to the next child
    /// - If all children return `Success`, the sequence halts them and returns `Success`
    ///
    /// Children are selected with [`Traversal::PrioritizeNonSuccess`].
    pub fn sequence(&mut self, children: impl IntoIterator<Item = NodeId>) -> Result<NodeId> {
        self.control_node(children, ControlPolicy::Sequence, None)
    }

    /// Creates a selector or sequence with an explicit traversal strategy.
    pub fn composite_with(
        &mut self,
        kind: Kind,
        children: impl IntoIterator<Item = NodeId>,
        strategy: &str,
    ) -> Result<NodeId> {
        let policy = match kind {
            Kind::Selector => ControlPolicy::Selector,
            Kind::Sequence => ControlPolicy::Sequence,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "{other} is not a built-in composite"
                )));
            }
        };
        self.control_node(children, policy, Some(strategy))
    }

    /// Creates a user-defined composite.
    ///
    /// `strategy` overrides [`ControlLogic::traversal`]. Both must resolve to
    /// a built-in [`Traversal`] or to one of the logic's own strategies.
    pub fn control(
        &mut self,
        children: impl IntoIterator<Item = NodeId>,
        logic: impl ControlLogic<C> + 'static,
        strategy: Option<&str>,
    ) -> Result<NodeId> {
        self.control_node(children, ControlPolicy::Custom(Box::new(logic)), strategy)
    }

    /// Appends a child to a composite after construction.
    ///
    /// A tree root is spliced in through its main node.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let child = self.chainable(child)?;
        self.control_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Strategy a composite ticks its children with.
    pub fn traversal_strategy(&self, id: NodeId) -> Result<&TraversalStrategy> {
        match &self.node(id)?.kind {
            NodeKind::Control(control) => Ok(&control.strategy),
            _ => Err(Error::NotAControlNode(id)),
        }
    }

    fn control_node(
        &mut self,
        children: impl IntoIterator<Item = NodeId>,
        policy: ControlPolicy<C>,
        strategy: Option<&str>,
    ) -> Result<NodeId> {
        let children = children
            .into_iter()
            .map(|child| self.chainable(child))
            .collect::<Result<Vec<_>>>()?;
        let control = ControlNode::new(children, policy, strategy)?;
        Ok(self.insert(NodeKind::Control(control)))
    }

    pub(crate) fn control_mut(&mut self, id: NodeId) -> Result<&mut ControlNode<C>> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Control(control) => Ok(control),
            _ => Err(Error::NotAControlNode(id)),
        }
    }

    /// Runs `f` on a composite with its context borrowed.
    fn with_control<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut ControlNode<C>, Option<&mut C>) -> R,
    ) -> Result<R> {
        let node = self.node_mut(id)?;
        let NodeKind::Control(control) = &mut node.kind else {
            return Err(Error::NotAControlNode(id));
        };

        with_context(node.context.as_ref(), id, |ctx| f(control, ctx))
    }

    /// Ticks the selected children one at a time until the composite's
    /// decision is known; later children are left untouched.
    pub(crate) fn tick_control(&mut self, id: NodeId) -> Result<()> {
        let children = self.children(id)?.to_vec();
        if children.is_empty() {
            tracing::warn!(node = %id, "composite ticked without children");
            return Err(Error::InvalidLeafNode);
        }

        let statuses = children
            .iter()
            .map(|&child| self.status(child))
            .collect::<Result<Vec<_>>>()?;
        let selected = self.with_control(id, |control, ctx| control.select(ctx, &statuses))??;

        for index in selected {
            let child = children[index];
            self.tick(child)?;

            let status = self.status(child)?;
            let step = self.with_control(id, |control, ctx| {
                control.policy.on_child(ctx, index, status)
            })?;
            if step != Step::Continue {
                tracing::debug!(node = %id, %child, ?step, "composite short-circuited");
                return self.apply_step(id, step);
            }
        }

        let step = self.control_mut(id)?.policy.on_exhausted();
        self.apply_step(id, step)
    }

    fn apply_step(&mut self, id: NodeId, step: Step) -> Result<()> {
        match step {
            Step::Continue => Ok(()),
            Step::Finish(status) => self.set_status(id, status),
            Step::Halt(status) => {
                // Halting resets self too; the decision is applied afterwards.
                self.halt(id)?;
                self.set_status(id, status)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Nop;
    use crate::node::NodeState;

    const NO_CHILDREN: [NodeId; 0] = [];

    struct TestContext {
        value: i32,
    }

    fn increment(arena: &mut Arena<TestContext>) -> NodeId {
        arena.task_fn(|ctx: Option<&mut TestContext>, _: &NodeState| {
            if let Some(ctx) = ctx {
                ctx.value += 1;
            }
            Status::Success
        })
    }

    fn decrement(arena: &mut Arena<TestContext>) -> NodeId {
        arena.task_fn(|ctx: Option<&mut TestContext>, _: &NodeState| {
            if let Some(ctx) = ctx {
                ctx.value -= 1;
            }
            Status::Success
        })
    }

    fn fail_always(arena: &mut Arena<TestContext>) -> NodeId {
        arena.task_fn(|_: Option<&mut TestContext>, _: &NodeState| Status::Failure)
    }

    fn run(arena: &mut Arena<TestContext>, root: NodeId) -> i32 {
        let ctx = crate::shared(TestContext { value: 0 });
        arena.set_context(root, ctx.clone()).unwrap();
        arena.tick(root).unwrap();
        let value = ctx.borrow().value;
        value
    }

    #[test]
    fn sequence_all_success() {
        let mut arena = Arena::new();
        let children = [increment(&mut arena), increment(&mut arena)];
        let seq = arena.sequence(children).unwrap();

        assert_eq!(run(&mut arena, seq), 2);
        assert_eq!(arena.status(seq).unwrap(), Status::Success);
    }

    #[test]
    fn sequence_fails_on_first_failure() {
        let mut arena = Arena::new();
        let children = [
            increment(&mut arena),
            fail_always(&mut arena),
            increment(&mut arena), // Should not execute
        ];
        let seq = arena.sequence(children).unwrap();

        assert_eq!(run(&mut arena, seq), 1); // Only first increment executed
        assert_eq!(arena.status(seq).unwrap(), Status::Failure);
        assert_eq!(arena.tick_count(children[2]).unwrap(), 0);
    }

    #[test]
    fn selector_succeeds_on_first_success() {
        let mut arena = Arena::new();
        let children = [
            fail_always(&mut arena),
            increment(&mut arena),
            decrement(&mut arena), // Should not execute
        ];
        let sel = arena.selector(children).unwrap();

        assert_eq!(run(&mut arena, sel), 1); // Only Increment executed
        assert_eq!(arena.status(sel).unwrap(), Status::Success);
    }

    #[test]
    fn selector_fails_when_all_fail() {
        let mut arena = Arena::new();
        let children = [fail_always(&mut arena), fail_always(&mut arena)];
        let sel = arena.selector(children).unwrap();

        run(&mut arena, sel);
        assert_eq!(arena.status(sel).unwrap(), Status::Failure);
        // No halt on failure: children keep their status.
        assert_eq!(arena.status(children[0]).unwrap(), Status::Failure);
        assert_eq!(arena.status(children[1]).unwrap(), Status::Failure);
    }

    #[test]
    fn sequence_failure_halts_children() {
        let mut arena: Arena<TestContext> = Arena::new();
        let first = arena.nop(Nop::new(1).unwrap());
        let second = arena.nop(Nop::failing(1).unwrap());
        let seq = arena.sequence([first, second]).unwrap();

        arena.tick(seq).unwrap();
        assert_eq!(arena.status(seq).unwrap(), Status::Failure);
        assert_eq!(arena.status(second).unwrap(), Status::Success);
    }

    #[test]
    fn childless_composite_cannot_tick_or_halt() {
        let mut arena: Arena<TestContext> = Arena::new();
        let sel = arena.selector(NO_CHILDREN).unwrap();

        assert_eq!(arena.tick(sel), Err(Error::InvalidLeafNode));
        assert_eq!(arena.halt(sel), Err(Error::InvalidLeafNode));
    }

    #[test]
    fn default_strategies() {
        let mut arena: Arena<TestContext> = Arena::new();
        let sel = arena.selector(NO_CHILDREN).unwrap();
        let seq = arena.sequence(NO_CHILDREN).unwrap();

        assert_eq!(
            arena.traversal_strategy(sel).unwrap(),
            &TraversalStrategy::Builtin(Traversal::PrioritizeRunning)
        );
        assert_eq!(
            arena.traversal_strategy(seq).unwrap(),
            &TraversalStrategy::Builtin(Traversal::PrioritizeNonSuccess)
        );
    }

    #[test]
    fn unknown_strategy_fails_at_construction() {
        let mut arena: Arena<TestContext> = Arena::new();
        let result = arena.composite_with(Kind::Selector, NO_CHILDREN, "not_exists");

        assert_eq!(
            result,
            Err(Error::IncorrectTraversalStrategy("not_exists".into()))
        );
    }

    #[test]
    fn traversal_start_positions() {
        use Status::*;

        let statuses = [Success, Failure, Running, Running];
        assert_eq!(Traversal::PrioritizeRunning.start(&statuses), 2);
        assert_eq!(Traversal::PrioritizeNonSuccess.start(&statuses), 1);
        assert_eq!(Traversal::AllNodes.start(&statuses), 0);

        let settled = [Success, Success];
        assert_eq!(Traversal::PrioritizeRunning.start(&settled), 0);
        assert_eq!(Traversal::PrioritizeNonSuccess.start(&settled), 0);
    }

    struct TickOnlySecond;

    impl StatusHooks for TickOnlySecond {}

    impl ControlLogic<TestContext> for TickOnlySecond {
        fn traversal(&self) -> &str {
            "only_middle"
        }

        fn strategies(&self) -> &[&str] {
            &["only_middle"]
        }

        fn select(
            &mut self,
            _ctx: Option<&mut TestContext>,
            _name: &str,
            _statuses: &[Status],
        ) -> Vec<usize> {
            vec![1]
        }

        fn on_child(
            &mut self,
            _ctx: Option<&mut TestContext>,
            _index: usize,
            _status: Status,
        ) -> Step {
            Step::Continue
        }

        fn on_exhausted(&mut self) -> Step {
            Step::Finish(Status::Success)
        }
    }

    #[test]
    fn custom_composite_uses_its_own_strategy() {
        let mut arena = Arena::new();
        let children = [
            decrement(&mut arena),
            increment(&mut arena),
            decrement(&mut arena),
        ];
        let custom = arena.control(children, TickOnlySecond, None).unwrap();

        let ctx = crate::shared(TestContext { value: 0 });
        arena.set_context(custom, ctx.clone()).unwrap();
        for _ in 0..5 {
            arena.tick(custom).unwrap();
        }

        assert_eq!(ctx.borrow().value, 5);
        assert_eq!(arena.status(custom).unwrap(), Status::Success);
        assert_eq!(arena.kind(custom).unwrap(), Kind::Control);
    }

    struct OutOfRange;

    impl StatusHooks for OutOfRange {}

    impl ControlLogic<TestContext> for OutOfRange {
        fn strategies(&self) -> &[&str] {
            &["beyond"]
        }

        fn select(
            &mut self,
            _ctx: Option<&mut TestContext>,
            _name: &str,
            statuses: &[Status],
        ) -> Vec<usize> {
            vec![statuses.len()]
        }

        fn on_child(
            &mut self,
            _ctx: Option<&mut TestContext>,
            _index: usize,
            _status: Status,
        ) -> Step {
            Step::Continue
        }
    }

    #[test]
    fn custom_strategy_must_select_existing_children() {
        let mut arena = Arena::new();
        let child = increment(&mut arena);
        let custom = arena.control([child], OutOfRange, Some("beyond")).unwrap();

        assert_eq!(
            arena.tick(custom),
            Err(Error::IncorrectTraversalStrategy("beyond".into()))
        );
    }

    struct Blackboard {
        scores: Vec<u32>,
        ran: Vec<usize>,
        decisions: u32,
    }

    /// Ticks the child with the highest positive score in the context.
    struct UtilityPick;

    impl StatusHooks for UtilityPick {}

    impl ControlLogic<Blackboard> for UtilityPick {
        fn traversal(&self) -> &str {
            "highest_score"
        }

        fn strategies(&self) -> &[&str] {
            &["highest_score"]
        }

        fn select(
            &mut self,
            ctx: Option<&mut Blackboard>,
            _name: &str,
            _statuses: &[Status],
        ) -> Vec<usize> {
            let Some(board) = ctx else {
                return Vec::new();
            };

            board
                .scores
                .iter()
                .enumerate()
                .filter(|(_, score)| **score > 0)
                .max_by_key(|&(_, score)| *score)
                .map(|(index, _)| index)
                .into_iter()
                .collect()
        }

        fn on_child(
            &mut self,
            ctx: Option<&mut Blackboard>,
            _index: usize,
            status: Status,
        ) -> Step {
            if let Some(board) = ctx {
                board.decisions += 1;
            }
            Step::Finish(status)
        }

        fn on_exhausted(&mut self) -> Step {
            Step::Finish(Status::Failure)
        }
    }

    #[test]
    fn custom_composite_scores_children_from_context() {
        let mut arena: Arena<Blackboard> = Arena::new();
        let children: Vec<NodeId> = (0..3)
            .map(|index| {
                arena.task_fn(move |ctx: Option<&mut Blackboard>, _: &NodeState| {
                    if let Some(board) = ctx {
                        board.ran.push(index);
                    }
                    Status::Success
                })
            })
            .collect();
        let utility = arena.control(children.clone(), UtilityPick, None).unwrap();

        let ctx = crate::shared(Blackboard {
            scores: vec![10, 70, 30],
            ran: Vec::new(),
            decisions: 0,
        });
        arena.set_context(utility, ctx.clone()).unwrap();

        arena.tick(utility).unwrap();
        assert_eq!(arena.status(utility).unwrap(), Status::Success);

        ctx.borrow_mut().scores = vec![90, 0, 30];
        arena.tick(utility).unwrap();

        ctx.borrow_mut().scores = vec![0, 0, 0];
        arena.tick(utility).unwrap();
        assert_eq!(arena.status(utility).unwrap(), Status::Failure);

        let board = ctx.borrow();
        assert_eq!(board.ran, [1, 0]);
        assert_eq!(board.decisions, 2);
        assert_eq!(arena.tick_count(children[2]).unwrap(), 0);
    }

    #[test]
    fn selector_resumes_past_failed_sibling() {
        let mut arena = Arena::new();
        let failing = fail_always(&mut arena);
        let nop = arena.nop(Nop::new(2).unwrap());
        let sel = arena.selector([failing, nop]).unwrap();

        arena.tick(sel).unwrap();
        assert_eq!(arena.status(sel).unwrap(), Status::Running);

        // The running nop is resumed; the failed child before it is skipped.
        arena.tick(sel).unwrap();
        assert_eq!(arena.status(sel).unwrap(), Status::Success);
        assert_eq!(arena.tick_count(failing).unwrap(), 1);
        assert_eq!(arena.tick_count(nop).unwrap(), 2);
    }

    #[test]
    fn push_child_requires_a_composite() {
        let mut arena: Arena<TestContext> = Arena::new();
        let task = increment(&mut arena);
        let other = increment(&mut arena);

        assert_eq!(
            arena.push_child(task, other),
            Err(Error::NotAControlNode(task))
        );
    }
}
