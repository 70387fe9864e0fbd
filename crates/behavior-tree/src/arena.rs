//! Node storage and the tick/halt lifecycle.

use std::any::Any;
use std::collections::HashSet;
use std::rc::Rc;

use crate::behavior::{Behavior, EmptyTask, FnBehavior, Nop};
use crate::node::{Kind, Node, NodeId, NodeKind, NodeState, SharedContext};
use crate::{Error, Result, Status};

/// Owner of every node of one or more trees.
///
/// Nodes reference each other by [`NodeId`], so the same node may appear
/// under several parents and hand-built graphs may even loop back on
/// themselves. The structural algorithms report both situations.
pub struct Arena<C> {
    nodes: Vec<Node<C>>,
}

impl<C> Default for Arena<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Arena<C> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of nodes ever created in this arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn insert(&mut self, kind: NodeKind<C>) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node<C>> {
        self.nodes.get(id.index()).ok_or(Error::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<C>> {
        self.nodes.get_mut(id.index()).ok_or(Error::UnknownNode(id))
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Creates a task node from any [`Behavior`].
    pub fn task(&mut self, behavior: impl Behavior<C> + 'static) -> NodeId {
        self.insert(NodeKind::Task(Box::new(behavior)))
    }

    /// Creates a task node from a closure.
    pub fn task_fn<F>(&mut self, f: F) -> NodeId
    where
        F: FnMut(Option<&mut C>, &NodeState) -> Status + 'static,
    {
        self.task(FnBehavior::new(f))
    }

    /// Creates a task without logic; it stays `Running` once ticked.
    pub fn empty_task(&mut self) -> NodeId {
        self.task(EmptyTask)
    }

    pub fn nop(&mut self, nop: Nop) -> NodeId {
        self.task(nop)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    pub fn status(&self, id: NodeId) -> Result<Status> {
        Ok(self.node(id)?.state.status())
    }

    pub fn state(&self, id: NodeId) -> Result<&NodeState> {
        Ok(&self.node(id)?.state)
    }

    pub fn tick_count(&self, id: NodeId) -> Result<u64> {
        Ok(self.node(id)?.state.tick_count)
    }

    pub fn kind(&self, id: NodeId) -> Result<Kind> {
        Ok(self.node(id)?.kind())
    }

    /// Name used when rendering the node. User-defined logic may override it.
    pub fn display_name(&self, id: NodeId) -> Result<&str> {
        Ok(self.node(id)?.display_name())
    }

    pub fn context(&self, id: NodeId) -> Result<Option<&SharedContext<C>>> {
        Ok(self.node(id)?.context.as_ref())
    }

    /// The node a parent actually links to when given `id`: a tree root is
    /// replaced by its main node, anything else is returned as is.
    pub fn chainable(&self, id: NodeId) -> Result<NodeId> {
        match self.node(id)?.kind {
            NodeKind::Tree(main) => Ok(main),
            _ => Ok(id),
        }
    }

    /// Number of nodes in the tree rooted at `id`, the root included.
    ///
    /// A node shared by several parents is counted once per parent. On a
    /// cyclic graph the edge closing the loop is counted but not followed.
    pub fn size(&self, id: NodeId) -> Result<usize> {
        let mut path = HashSet::new();
        self.size_along(id, &mut path)
    }

    fn size_along(&self, id: NodeId, path: &mut HashSet<NodeId>) -> Result<usize> {
        if !path.insert(id) {
            return Ok(1);
        }

        let mut size = 1;
        for &child in self.children(id)? {
            size += self.size_along(child, path)?;
        }

        path.remove(&id);
        Ok(size)
    }

    // ------------------------------------------------------------------
    // Context and storage
    // ------------------------------------------------------------------

    /// Hands `context` to `id` and every node reachable from it.
    ///
    /// Each node is visited once, so shared nodes and cycles are fine. Nodes
    /// linked later do not receive it until the context is assigned again.
    pub fn set_context(&mut self, id: NodeId, context: SharedContext<C>) -> Result<()> {
        let mut visited = HashSet::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }

            let node = self.node_mut(current)?;
            node.context = Some(Rc::clone(&context));
            stack.extend(node.children().iter().rev());
        }

        tracing::trace!(root = %id, nodes = visited.len(), "context assigned");
        Ok(())
    }

    /// Stores `value` on `child` on behalf of its parent.
    ///
    /// Only a direct parent may write a child's storage. Any previous value
    /// is replaced.
    pub fn set_storage<T: Any>(&mut self, parent: NodeId, child: NodeId, value: T) -> Result<()> {
        if !self.children(parent)?.contains(&child) {
            return Err(Error::NotAChild { parent, child });
        }

        self.node_mut(child)?.storage = Some(Box::new(value));
        Ok(())
    }

    /// Value stored on `id`, if one of type `T` was set.
    pub fn storage<T: Any>(&self, id: NodeId) -> Result<Option<&T>> {
        Ok(self
            .node(id)?
            .storage
            .as_ref()
            .and_then(|value| value.downcast_ref::<T>()))
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Sets the status of a node, firing its hooks when the value changes.
    pub fn set_status(&mut self, id: NodeId, status: Status) -> Result<()> {
        let node = self.node_mut(id)?;
        let Some(transition) = node.state.status.set(status) else {
            return Ok(());
        };

        node.state.prev_status = Some(transition.prev);
        if transition.started_running() {
            node.state.ticks_running = 0;
        }
        node.notify(transition.prev, transition.curr);

        tracing::trace!(
            node = %id,
            prev = %transition.prev,
            curr = %transition.curr,
            "status changed"
        );
        Ok(())
    }

    /// Ticks a node once.
    ///
    /// 1. `tick_count` is incremented, even if the node ends up skipped
    /// 2. A condition decides whether the node runs at all
    /// 3. A running node is set to `Running`, runs its own logic, and
    ///    increments `ticks_running`
    /// 4. Decorators and trees derive their status from their child
    pub fn tick(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.ticking {
            return Err(Error::ReentrantTick(id));
        }
        node.ticking = true;

        let result = self.tick_guarded(id);

        if let Ok(node) = self.node_mut(id) {
            node.ticking = false;
        }
        result
    }

    fn tick_guarded(&mut self, id: NodeId) -> Result<()> {
        self.node_mut(id)?.state.tick_count += 1;

        let should_tick = self.decorator_should_tick(id)?;
        self.node_mut(id)?.state.tick_prevented = !should_tick;

        if should_tick {
            self.set_status(id, Status::Running)?;
            self.on_tick(id)?;
            self.node_mut(id)?.state.ticks_running += 1;
        }

        self.ensure_after_tick(id)
    }

    fn on_tick(&mut self, id: NodeId) -> Result<()> {
        let Node {
            kind,
            state,
            context,
            ..
        } = self.node_mut(id)?;

        match kind {
            NodeKind::Task(behavior) => {
                let status =
                    with_context(context.as_ref(), id, |ctx| behavior.tick(ctx, state))?;
                self.set_status(id, status)
            }
            NodeKind::Control(_) => self.tick_control(id),
            NodeKind::Decorator(_) => self.tick_decorated(id),
            NodeKind::Tree(main) => {
                let main = *main;
                self.tick(main)?;
                tracing::debug!(tree = %id, status = %self.status(main)?, "tree ticked");
                Ok(())
            }
        }
    }

    fn ensure_after_tick(&mut self, id: NodeId) -> Result<()> {
        let status = match self.node(id)?.kind {
            NodeKind::Tree(main) => Some(self.status(main)?),
            NodeKind::Decorator(_) => self.decorated_status(id)?,
            _ => None,
        };

        match status {
            Some(status) => self.set_status(id, status),
            None => Ok(()),
        }
    }

    /// Resets a node and everything below it to `Success`.
    ///
    /// Tasks are notified through [`Behavior::on_halt`]. Halting is
    /// idempotent, and a node reached again while it is being halted is
    /// skipped. A composite without children cannot be halted.
    pub fn halt(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.halting {
            return Ok(());
        }
        if matches!(node.kind, NodeKind::Control(_)) && node.children().is_empty() {
            return Err(Error::InvalidLeafNode);
        }
        node.halting = true;

        let result = self.halt_guarded(id);

        if let Ok(node) = self.node_mut(id) {
            node.halting = false;
        }
        result
    }

    fn halt_guarded(&mut self, id: NodeId) -> Result<()> {
        self.set_status(id, Status::Success)?;

        if let NodeKind::Task(behavior) = &mut self.node_mut(id)?.kind {
            behavior.on_halt();
        }

        for child in self.children(id)?.to_vec() {
            self.halt(child)?;
        }

        tracing::trace!(node = %id, "halted");
        Ok(())
    }
}

/// Runs `f` with the node's context mutably borrowed, if it has one.
pub(crate) fn with_context<C, R>(
    context: Option<&SharedContext<C>>,
    id: NodeId,
    f: impl FnOnce(Option<&mut C>) -> R,
) -> Result<R> {
    match context {
        None => Ok(f(None)),
        Some(context) => {
            let mut guard = context
                .try_borrow_mut()
                .map_err(|_| Error::ContextBorrowed(id))?;
            Ok(f(Some(&mut *guard)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::behavior::StatusHooks;
    use crate::shared;

    #[test]
    fn new_nodes_are_successful_and_unticked() {
        let mut arena: Arena<()> = Arena::new();
        let task = arena.empty_task();

        assert_eq!(arena.status(task).unwrap(), Status::Success);
        assert_eq!(arena.tick_count(task).unwrap(), 0);
        assert_eq!(arena.state(task).unwrap().prev_status(), None);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let arena: Arena<()> = Arena::new();
        let stray = NodeId::new(3);

        assert_eq!(arena.status(stray), Err(Error::UnknownNode(stray)));
    }

    #[test]
    fn empty_task_keeps_running() {
        let mut arena: Arena<()> = Arena::new();
        let task = arena.empty_task();

        arena.tick(task).unwrap();
        arena.tick(task).unwrap();
        assert_eq!(arena.status(task).unwrap(), Status::Running);
        assert_eq!(arena.state(task).unwrap().ticks_running(), 2);
    }

    #[test]
    fn ticks_running_restarts_when_entering_running() {
        let mut arena: Arena<()> = Arena::new();
        let nop = arena.nop(Nop::new(2).unwrap());

        arena.tick(nop).unwrap();
        assert_eq!(arena.state(nop).unwrap().ticks_running(), 1);
        arena.tick(nop).unwrap();
        assert_eq!(arena.status(nop).unwrap(), Status::Success);
        assert_eq!(arena.state(nop).unwrap().ticks_running(), 2);
        arena.tick(nop).unwrap();
        assert_eq!(arena.state(nop).unwrap().ticks_running(), 1);
        assert_eq!(arena.tick_count(nop).unwrap(), 3);
    }

    #[derive(Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl StatusHooks for Recorder {
        fn on_started_running(&mut self) {
            self.events.borrow_mut().push("started".into());
        }

        fn on_finished_running(&mut self) {
            self.events.borrow_mut().push("finished".into());
        }

        fn on_status_change(&mut self, prev: Status, curr: Status) {
            self.events.borrow_mut().push(format!("{prev}->{curr}"));
        }
    }

    impl Behavior<()> for Recorder {
        fn tick(&mut self, _ctx: Option<&mut ()>, _node: &NodeState) -> Status {
            Status::Failure
        }
    }

    #[test]
    fn hooks_fire_on_differing_transitions_only() {
        let mut arena: Arena<()> = Arena::new();
        let recorder = Recorder::default();
        let events = Rc::clone(&recorder.events);
        let task = arena.task(recorder);

        arena.tick(task).unwrap();
        arena.set_status(task, Status::Failure).unwrap();

        assert_eq!(
            *events.borrow(),
            ["started", "success->running", "finished", "running->failure"]
        );
        assert_eq!(
            arena.state(task).unwrap().prev_status(),
            Some(Status::Running)
        );
    }

    #[test]
    fn context_reaches_every_node() {
        let mut arena: Arena<i32> = Arena::new();
        let shared_task = arena.task_fn(|ctx: Option<&mut i32>, _: &NodeState| {
            if let Some(value) = ctx {
                *value += 1;
            }
            Status::Success
        });
        let left = arena.inverter(shared_task).unwrap();
        let right = arena.force_success(shared_task).unwrap();
        let seq = arena.sequence([left, right]).unwrap();

        let ctx = shared(0);
        arena.set_context(seq, ctx.clone()).unwrap();

        for id in [seq, left, right, shared_task] {
            assert!(Rc::ptr_eq(arena.context(id).unwrap().unwrap(), &ctx));
        }
    }

    #[test]
    fn borrowed_context_fails_the_tick() {
        let mut arena: Arena<i32> = Arena::new();
        let task = arena.task_fn(|_: Option<&mut i32>, _: &NodeState| Status::Success);
        let ctx = shared(0);
        arena.set_context(task, ctx.clone()).unwrap();

        let _guard = ctx.borrow_mut();
        assert_eq!(arena.tick(task), Err(Error::ContextBorrowed(task)));
    }

    #[test]
    fn storage_is_written_by_the_parent() {
        let mut arena: Arena<()> = Arena::new();
        let child = arena.empty_task();
        let other = arena.empty_task();
        let parent = arena.selector([child]).unwrap();

        arena.set_storage(parent, child, 7_u32).unwrap();
        assert_eq!(arena.storage::<u32>(child).unwrap(), Some(&7));
        assert_eq!(arena.storage::<String>(child).unwrap(), None);

        assert_eq!(
            arena.set_storage(parent, other, 1_u32),
            Err(Error::NotAChild {
                parent,
                child: other
            })
        );
    }

    #[test]
    fn halt_is_idempotent() {
        let mut arena: Arena<()> = Arena::new();
        let first = arena.nop(Nop::new(3).unwrap());
        let second = arena.empty_task();
        let seq = arena.sequence([first, second]).unwrap();

        arena.tick(seq).unwrap();
        assert_eq!(arena.status(seq).unwrap(), Status::Running);

        arena.halt(seq).unwrap();
        arena.halt(seq).unwrap();
        for id in [seq, first, second] {
            assert_eq!(arena.status(id).unwrap(), Status::Success);
        }

        // The halted nop restarts its countdown.
        arena.tick(first).unwrap();
        arena.tick(first).unwrap();
        assert_eq!(arena.status(first).unwrap(), Status::Running);
    }

    #[test]
    fn size_counts_every_reference() {
        let mut arena: Arena<()> = Arena::new();
        let task = arena.empty_task();
        let inverter = arena.inverter(task).unwrap();
        let seq = arena.sequence([inverter, task]).unwrap();

        assert_eq!(arena.size(task).unwrap(), 1);
        assert_eq!(arena.size(inverter).unwrap(), 2);
        assert_eq!(arena.size(seq).unwrap(), 4);
    }

    #[test]
    fn ticking_a_cycle_is_rejected() {
        let mut arena: Arena<()> = Arena::new();
        let seq = arena.sequence(Vec::new()).unwrap();
        let inverter = arena.inverter(seq).unwrap();
        arena.push_child(seq, inverter).unwrap();

        assert_eq!(arena.tick(seq), Err(Error::ReentrantTick(seq)));
        assert_eq!(arena.size(seq).unwrap(), 3);
        // Halting the same graph terminates.
        arena.halt(seq).unwrap();
    }
}
