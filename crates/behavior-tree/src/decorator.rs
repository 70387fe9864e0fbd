//! Decorator behavior nodes.
//!
//! Decorators wrap a single child and map its status onto their own, and may
//! decide whether (or how many times) the child is ticked. This module
//! provides [`Inverter`](Kind::Inverter) (NOT logic),
//! [`ForceSuccess`](Kind::ForceSuccess) / [`ForceFailure`](Kind::ForceFailure)
//! (result suppression), [`Condition`](Kind::Condition) (guarded execution),
//! [`Repeater`](Kind::Repeater) / [`Retry`](Kind::Retry) (bounded loops), and
//! the [`DecoratorLogic`] extension point.

use crate::arena::{Arena, with_context};
use crate::behavior::StatusHooks;
use crate::node::{NodeId, NodeKind, NodeState};
use crate::{Error, Result, Status};

/// Logic of a user-defined decorator.
pub trait DecoratorLogic<C>: StatusHooks {
    /// Decides whether the child is ticked this time. When it returns
    /// `false` the child is skipped and `tick_prevented` is passed to
    /// [`status_map`](DecoratorLogic::status_map).
    fn should_tick(&mut self, _ctx: Option<&mut C>, _node: &NodeState) -> bool {
        true
    }

    /// Status of the decorator given the status of its child.
    fn status_map(&self, child: Status, tick_prevented: bool) -> Status;

    /// Name shown when rendering the tree.
    fn display_name(&self) -> &str {
        "decorator"
    }
}

type Predicate<C> = Box<dyn FnMut(Option<&mut C>, &NodeState) -> bool>;

/// Bounded re-ticking of the child while it keeps reporting `while_child`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Repeat {
    pub(crate) times: u32,
    pub(crate) while_child: Status,
}

impl Repeat {
    fn new(times: u32, while_child: Status) -> Result<Self> {
        if times == 0 {
            return Err(Error::InvalidArgument(
                "number of repetitions must be a positive integer".into(),
            ));
        }
        Ok(Self { times, while_child })
    }
}

pub(crate) enum DecoratorKind<C> {
    Inverter,
    ForceSuccess,
    ForceFailure,
    Condition(Predicate<C>),
    Repeater(Repeat),
    Retry(Repeat),
    Custom(Box<dyn DecoratorLogic<C>>),
}

impl<C> DecoratorKind<C> {
    fn status_map(&self, child: Status, tick_prevented: bool) -> Status {
        match self {
            DecoratorKind::Inverter => child.invert(),
            DecoratorKind::ForceSuccess if child.is_running() => Status::Running,
            DecoratorKind::ForceSuccess => Status::Success,
            DecoratorKind::ForceFailure if child.is_running() => Status::Running,
            DecoratorKind::ForceFailure => Status::Failure,
            DecoratorKind::Condition(_) if tick_prevented => Status::Failure,
            DecoratorKind::Condition(_) | DecoratorKind::Repeater(_) | DecoratorKind::Retry(_) => {
                child
            }
            DecoratorKind::Custom(logic) => logic.status_map(child, tick_prevented),
        }
    }

    fn repeat(&self) -> Option<Repeat> {
        match self {
            DecoratorKind::Repeater(repeat) | DecoratorKind::Retry(repeat) => Some(*repeat),
            _ => None,
        }
    }
}

pub(crate) struct DecoratorNode<C> {
    pub(crate) child: NodeId,
    pub(crate) kind: DecoratorKind<C>,
}

impl<C> Arena<C> {
    /// Inverts the result of its child.
    ///
    /// - If the child returns `Success`, the inverter returns `Failure`
    /// - If the child returns `Failure`, the inverter returns `Success`
    /// - `Running` passes through
    pub fn inverter(&mut self, child: NodeId) -> Result<NodeId> {
        self.decorator_node(child, DecoratorKind::Inverter)
    }

    /// Returns `Success` whenever the child is not running.
    ///
    /// Useful for optional behaviors that shouldn't cause a sequence to fail.
    pub fn force_success(&mut self, child: NodeId) -> Result<NodeId> {
        self.decorator_node(child, DecoratorKind::ForceSuccess)
    }

    /// Returns `Failure` whenever the child is not running.
    pub fn force_failure(&mut self, child: NodeId) -> Result<NodeId> {
        self.decorator_node(child, DecoratorKind::ForceFailure)
    }

    /// Ticks the child only while `predicate` holds.
    ///
    /// The predicate receives the shared context and the decorator's own
    /// bookkeeping. When it returns `false` the child is not ticked at all and
    /// the condition reports `Failure`; otherwise the child's status passes
    /// through.
    pub fn condition<F>(&mut self, child: NodeId, predicate: F) -> Result<NodeId>
    where
        F: FnMut(Option<&mut C>, &NodeState) -> bool + 'static,
    {
        self.decorator_node(child, DecoratorKind::Condition(Box::new(predicate)))
    }

    /// Re-ticks the child while it succeeds, up to `times` ticks in total
    /// (the regular tick included).
    pub fn repeater(&mut self, child: NodeId, times: u32) -> Result<NodeId> {
        let repeat = Repeat::new(times, Status::Success)?;
        self.decorator_node(child, DecoratorKind::Repeater(repeat))
    }

    /// Re-ticks the child while it fails, up to `times` ticks in total
    /// (the regular tick included).
    pub fn retry(&mut self, child: NodeId, times: u32) -> Result<NodeId> {
        let repeat = Repeat::new(times, Status::Failure)?;
        self.decorator_node(child, DecoratorKind::Retry(repeat))
    }

    /// Creates a user-defined decorator.
    pub fn decorator(
        &mut self,
        child: NodeId,
        logic: impl DecoratorLogic<C> + 'static,
    ) -> Result<NodeId> {
        self.decorator_node(child, DecoratorKind::Custom(Box::new(logic)))
    }

    fn decorator_node(&mut self, child: NodeId, kind: DecoratorKind<C>) -> Result<NodeId> {
        let child = self.chainable(child)?;
        Ok(self.insert(NodeKind::Decorator(DecoratorNode { child, kind })))
    }

    pub(crate) fn decorator_should_tick(&mut self, id: NodeId) -> Result<bool> {
        let node = self.node_mut(id)?;
        let NodeKind::Decorator(decorator) = &mut node.kind else {
            return Ok(true);
        };

        let state = &node.state;
        match &mut decorator.kind {
            DecoratorKind::Condition(predicate) => {
                with_context(node.context.as_ref(), id, |ctx| predicate(ctx, state))
            }
            DecoratorKind::Custom(logic) => {
                with_context(node.context.as_ref(), id, |ctx| logic.should_tick(ctx, state))
            }
            _ => Ok(true),
        }
    }

    /// Ticks the child, then re-ticks it for repeating decorators.
    ///
    /// The attempt counter starts over on every tick of the decorator. The
    /// loop stops as soon as the child runs or stops matching the repeat
    /// condition.
    pub(crate) fn tick_decorated(&mut self, id: NodeId) -> Result<()> {
        let (child, repeat) = match &self.node(id)?.kind {
            NodeKind::Decorator(decorator) => (decorator.child, decorator.kind.repeat()),
            _ => return Ok(()),
        };

        self.tick(child)?;

        let Some(repeat) = repeat else {
            return Ok(());
        };

        let mut remaining = repeat.times;
        loop {
            let status = self.status(child)?;
            if status.is_running() || status != repeat.while_child {
                break;
            }

            remaining -= 1;
            if remaining == 0 {
                break;
            }

            tracing::trace!(node = %id, %child, remaining, "repeating child");
            self.tick(child)?;
        }

        Ok(())
    }

    /// Status a decorator takes after its tick.
    pub(crate) fn decorated_status(&self, id: NodeId) -> Result<Option<Status>> {
        let node = self.node(id)?;
        let NodeKind::Decorator(decorator) = &node.kind else {
            return Ok(None);
        };

        let child = self.status(decorator.child)?;
        Ok(Some(
            decorator
                .kind
                .status_map(child, node.state.tick_prevented),
        ))
    }
}
