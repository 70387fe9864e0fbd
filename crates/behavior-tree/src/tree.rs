//! Tree root wrapper.
//!
//! A tree is the entry point a driver ticks once per iteration. It holds a
//! single main node and mirrors that node's status after every tick, so the
//! tree status reads as the outcome of the whole program.

use crate::arena::Arena;
use crate::node::{NodeId, NodeKind};
use crate::{Error, Result};

impl<C> Arena<C> {
    /// Wraps `main` in a tree root.
    ///
    /// Wrapping another tree reuses its main node instead of nesting.
    pub fn tree(&mut self, main: NodeId) -> Result<NodeId> {
        let main = self.chainable(main)?;

        match self.node(main)?.kind {
            NodeKind::Task(_) | NodeKind::Control(_) | NodeKind::Decorator(_) => {
                Ok(self.insert(NodeKind::Tree(main)))
            }
            NodeKind::Tree(_) => Err(Error::InvalidTreeMainNode(self.kind(main)?.to_string())),
        }
    }

    /// Main node of a tree; any other node is its own main node.
    pub fn main_node(&self, tree: NodeId) -> Result<NodeId> {
        self.chainable(tree)
    }
}
