//! Behavior tree execution engine.
//!
//! A behavior tree drives an agent through repeated ticks. Each tick
//! recurses from the root through composites and decorators down to tasks,
//! and every node ends the tick with a [`Status`]: `Success`, `Running` or
//! `Failure`.
//!
//! - **Arena storage**: nodes live in an [`Arena`] and link to each other by
//!   [`NodeId`], so subtrees can be shared and graphs inspected for cycles
//! - **Resumable composites**: selectors and sequences skip children that
//!   already settled, resuming from the running one
//! - **Shared context**: one `Rc<RefCell<C>>` blackboard handed to every node
//! - **Single-threaded**: a tick runs to completion before returning
//!
//! # Architecture
//!
//! - [`Behavior`]: Core trait for task logic
//! - [`Status`]: Success, Running or Failure
//! - Composite nodes: [`Arena::selector`], [`Arena::sequence`], custom
//!   [`ControlLogic`]
//! - Decorator nodes: [`Arena::inverter`], [`Arena::force_success`],
//!   [`Arena::force_failure`], [`Arena::condition`], [`Arena::repeater`],
//!   [`Arena::retry`], custom [`DecoratorLogic`]
//! - Root: [`Arena::tree`]
//! - Construction: [`Builder`] over a keyword [`Registry`]
//! - Introspection: [`Arena::each_node`], [`Arena::has_cycle`],
//!   [`Arena::repeated_nodes`], [`Printer`]
//!
//! # Example
//!
//! ```
//! use behavior_tree::{Arena, NodeState, Nop, Status, shared};
//!
//! let mut arena: Arena<u32> = Arena::new();
//! let wait = arena.nop(Nop::new(2).unwrap());
//! let count = arena.task_fn(|ctx: Option<&mut u32>, _: &NodeState| {
//!     if let Some(count) = ctx {
//!         *count += 1;
//!     }
//!     Status::Success
//! });
//! let seq = arena.sequence([wait, count]).unwrap();
//! let tree = arena.tree(seq).unwrap();
//!
//! let ctx = shared(0);
//! arena.set_context(tree, ctx.clone()).unwrap();
//!
//! arena.tick(tree).unwrap();
//! assert_eq!(arena.status(tree).unwrap(), Status::Running);
//! arena.tick(tree).unwrap();
//! assert_eq!(arena.status(tree).unwrap(), Status::Success);
//! assert_eq!(*ctx.borrow(), 1);
//! ```

pub mod algorithms;
pub mod arena;
pub mod behavior;
pub mod builder;
pub mod composite;
pub mod decorator;
pub mod error;
pub mod node;
pub mod printer;
#[cfg(feature = "random")]
pub mod random;
pub mod status;
mod tree;

use std::cell::RefCell;
use std::rc::Rc;

// Re-export core types for ergonomic API
pub use algorithms::{NodeWalk, TraversalOrder, Visit};
pub use arena::Arena;
pub use behavior::{Behavior, EmptyTask, FnBehavior, Nop, StatusHooks};
pub use builder::{Arity, Builder, Factory, Registry, Scope};
pub use composite::{ControlLogic, Step, Traversal, TraversalStrategy};
pub use decorator::DecoratorLogic;
pub use error::{Error, Result};
pub use node::{Kind, NodeId, NodeState, SharedContext};
pub use printer::{Line, Printer, Summary};
#[cfg(feature = "random")]
pub use random::random_tree;
pub use status::{NodeStatus, Status, Transition};

/// Wraps a context value for [`Arena::set_context`].
pub fn shared<C>(context: C) -> SharedContext<C> {
    Rc::new(RefCell::new(context))
}
