//! Leaf behaviors.
//!
//! This module defines the [`Behavior`] trait, which is the extension point
//! for task (leaf) nodes. The trait is generic over a context type `C`,
//! allowing tasks to read and modify the shared blackboard while deciding
//! their status.

use crate::node::NodeState;
use crate::{Error, Result, Status};

/// Callbacks fired when the status of the owning node changes.
///
/// Hooks run only on differing transitions; setting a status to the value it
/// already holds is silent. All methods default to doing nothing.
pub trait StatusHooks {
    /// The node entered `Running`.
    fn on_started_running(&mut self) {}

    /// The node left `Running`.
    fn on_finished_running(&mut self) {}

    /// Any differing transition, fired after the two hooks above.
    fn on_status_change(&mut self, _prev: Status, _curr: Status) {}
}

/// Logic of a task node.
pub trait Behavior<C>: StatusHooks {
    /// Evaluate one tick of this task.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The shared context, or `None` if no context was assigned to
    ///   the node. Tasks can read state and modify it.
    /// * `node` - Bookkeeping of the owning node. Its status is already
    ///   `Running` when this is called.
    ///
    /// # Returns
    ///
    /// The status the task ends this tick with.
    fn tick(&mut self, ctx: Option<&mut C>, node: &NodeState) -> Status;

    /// The owning node was halted.
    fn on_halt(&mut self) {}

    /// Name shown when rendering the tree.
    fn display_name(&self) -> &str {
        "task"
    }
}

/// Blanket implementation for boxed behaviors.
///
/// This allows `Box<dyn Behavior<C>>` to also implement `Behavior<C>`,
/// enabling dynamic dispatch and heterogeneous collections of nodes.
impl<C> StatusHooks for Box<dyn Behavior<C>> {
    fn on_started_running(&mut self) {
        (**self).on_started_running();
    }

    fn on_finished_running(&mut self) {
        (**self).on_finished_running();
    }

    fn on_status_change(&mut self, prev: Status, curr: Status) {
        (**self).on_status_change(prev, curr);
    }
}

impl<C> Behavior<C> for Box<dyn Behavior<C>> {
    #[inline]
    fn tick(&mut self, ctx: Option<&mut C>, node: &NodeState) -> Status {
        (**self).tick(ctx, node)
    }

    fn on_halt(&mut self) {
        (**self).on_halt();
    }

    fn display_name(&self) -> &str {
        (**self).display_name()
    }
}

/// A task backed by a closure.
pub struct FnBehavior<F> {
    f: F,
}

impl<F> FnBehavior<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> StatusHooks for FnBehavior<F> {}

impl<C, F> Behavior<C> for FnBehavior<F>
where
    F: FnMut(Option<&mut C>, &NodeState) -> Status,
{
    fn tick(&mut self, ctx: Option<&mut C>, node: &NodeState) -> Status {
        (self.f)(ctx, node)
    }
}

/// A task without logic.
///
/// Ticking only moves the node to `Running`, where it stays.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyTask;

impl StatusHooks for EmptyTask {}

impl<C> Behavior<C> for EmptyTask {
    fn tick(&mut self, _ctx: Option<&mut C>, node: &NodeState) -> Status {
        node.status()
    }
}

/// A task that does nothing for a fixed number of ticks.
///
/// It reports `Running` until it has been ticked `necessary_ticks` times,
/// then completes with its final status and starts counting again. Halting
/// restarts the countdown.
#[derive(Debug, Clone)]
pub struct Nop {
    necessary_ticks: u32,
    remaining_ticks: u32,
    completes_with: Status,
}

impl Nop {
    /// A nop that completes with `Success`.
    pub fn new(necessary_ticks: u32) -> Result<Self> {
        Self::completing_with(necessary_ticks, Status::Success)
    }

    /// A nop that completes with `Failure`.
    pub fn failing(necessary_ticks: u32) -> Result<Self> {
        Self::completing_with(necessary_ticks, Status::Failure)
    }

    fn completing_with(necessary_ticks: u32, completes_with: Status) -> Result<Self> {
        if necessary_ticks == 0 {
            return Err(Error::InvalidArgument(
                "a nop should need at least one tick".into(),
            ));
        }

        Ok(Self {
            necessary_ticks,
            remaining_ticks: necessary_ticks,
            completes_with,
        })
    }

    pub fn necessary_ticks(&self) -> u32 {
        self.necessary_ticks
    }
}

impl StatusHooks for Nop {}

impl<C> Behavior<C> for Nop {
    fn tick(&mut self, _ctx: Option<&mut C>, _node: &NodeState) -> Status {
        self.remaining_ticks -= 1;
        if self.remaining_ticks > 0 {
            return Status::Running;
        }

        self.remaining_ticks = self.necessary_ticks;
        self.completes_with
    }

    fn on_halt(&mut self) {
        self.remaining_ticks = self.necessary_ticks;
    }

    fn display_name(&self) -> &str {
        "nop"
    }
}
