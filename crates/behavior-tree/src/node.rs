//! Node handles, bookkeeping and the closed set of node kinds.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::Status;
use crate::behavior::{Behavior, StatusHooks};
use crate::composite::{ControlNode, ControlPolicy};
use crate::decorator::{DecoratorKind, DecoratorNode};
use crate::status::NodeStatus;

/// Shared, mutable context handed to every node of a tree.
///
/// Ticking is single-threaded; the engine borrows the context only for the
/// duration of a single callback.
pub type SharedContext<C> = Rc<RefCell<C>>;

/// Handle to a node stored in an [`Arena`](crate::Arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the node in its arena, in insertion order.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-node bookkeeping visible to callbacks and introspection.
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    pub(crate) status: NodeStatus,
    pub(crate) prev_status: Option<Status>,
    pub(crate) tick_count: u64,
    pub(crate) ticks_running: u64,
    pub(crate) tick_prevented: bool,
}

impl NodeState {
    #[inline]
    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// Status held before the last transition, if any happened.
    #[inline]
    pub fn prev_status(&self) -> Option<Status> {
        self.prev_status
    }

    /// Number of ticks received, including prevented ones.
    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Consecutive ticks spent running, counted from the tick that made the
    /// node enter `Running`.
    #[inline]
    pub fn ticks_running(&self) -> u64 {
        self.ticks_running
    }

    /// Whether the last tick skipped the node's own logic.
    #[inline]
    pub fn tick_prevented(&self) -> bool {
        self.tick_prevented
    }
}

/// Introspection tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Kind {
    Task,
    Selector,
    Sequence,
    /// User-defined composite.
    Control,
    Inverter,
    ForceSuccess,
    ForceFailure,
    Condition,
    Repeater,
    Retry,
    /// User-defined decorator.
    Decorator,
    Tree,
}

impl Kind {
    pub fn is_composite(self) -> bool {
        matches!(self, Kind::Selector | Kind::Sequence | Kind::Control)
    }

    pub fn is_decorator(self) -> bool {
        matches!(
            self,
            Kind::Inverter
                | Kind::ForceSuccess
                | Kind::ForceFailure
                | Kind::Condition
                | Kind::Repeater
                | Kind::Retry
                | Kind::Decorator
        )
    }
}

pub(crate) enum NodeKind<C> {
    Task(Box<dyn Behavior<C>>),
    Control(ControlNode<C>),
    Decorator(DecoratorNode<C>),
    /// Root wrapper holding its (already unwrapped) main node.
    Tree(NodeId),
}

pub(crate) struct Node<C> {
    pub(crate) state: NodeState,
    pub(crate) kind: NodeKind<C>,
    pub(crate) context: Option<SharedContext<C>>,
    pub(crate) storage: Option<Box<dyn Any>>,
    pub(crate) ticking: bool,
    pub(crate) halting: bool,
}

impl<C> Node<C> {
    pub(crate) fn new(kind: NodeKind<C>) -> Self {
        Self {
            state: NodeState::default(),
            kind,
            context: None,
            storage: None,
            ticking: false,
            halting: false,
        }
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Task(_) => &[],
            NodeKind::Control(control) => &control.children,
            NodeKind::Decorator(decorator) => std::slice::from_ref(&decorator.child),
            NodeKind::Tree(child) => std::slice::from_ref(child),
        }
    }

    pub(crate) fn kind(&self) -> Kind {
        match &self.kind {
            NodeKind::Task(_) => Kind::Task,
            NodeKind::Control(control) => match control.policy {
                ControlPolicy::Selector => Kind::Selector,
                ControlPolicy::Sequence => Kind::Sequence,
                ControlPolicy::Custom(_) => Kind::Control,
            },
            NodeKind::Decorator(decorator) => match decorator.kind {
                DecoratorKind::Inverter => Kind::Inverter,
                DecoratorKind::ForceSuccess => Kind::ForceSuccess,
                DecoratorKind::ForceFailure => Kind::ForceFailure,
                DecoratorKind::Condition(_) => Kind::Condition,
                DecoratorKind::Repeater(_) => Kind::Repeater,
                DecoratorKind::Retry(_) => Kind::Retry,
                DecoratorKind::Custom(_) => Kind::Decorator,
            },
            NodeKind::Tree(_) => Kind::Tree,
        }
    }

    pub(crate) fn display_name(&self) -> &str {
        match &self.kind {
            NodeKind::Task(behavior) => behavior.display_name(),
            NodeKind::Control(ControlNode {
                policy: ControlPolicy::Custom(logic),
                ..
            }) => logic.display_name(),
            NodeKind::Decorator(DecoratorNode {
                kind: DecoratorKind::Custom(logic),
                ..
            }) => logic.display_name(),
            _ => self.kind().into(),
        }
    }

    /// Forwards a transition to the user-supplied logic of this node.
    pub(crate) fn notify(&mut self, prev: Status, curr: Status) {
        match &mut self.kind {
            NodeKind::Task(behavior) => fire(behavior.as_mut(), prev, curr),
            NodeKind::Control(ControlNode {
                policy: ControlPolicy::Custom(logic),
                ..
            }) => fire(logic.as_mut(), prev, curr),
            NodeKind::Decorator(DecoratorNode {
                kind: DecoratorKind::Custom(logic),
                ..
            }) => fire(logic.as_mut(), prev, curr),
            _ => {}
        }
    }
}

fn fire<H: StatusHooks + ?Sized>(hooks: &mut H, prev: Status, curr: Status) {
    if prev.is_running() {
        hooks.on_finished_running();
    } else if curr.is_running() {
        hooks.on_started_running();
    }

    hooks.on_status_change(prev, curr);
}
