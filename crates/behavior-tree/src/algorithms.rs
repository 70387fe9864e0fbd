//! Structural algorithms over the node graph.
//!
//! Every algorithm starts from the chainable node of the id it is given, so
//! a tree root and its main node produce the same results.

use std::collections::{HashSet, VecDeque};
use std::str::FromStr;

use crate::arena::Arena;
use crate::node::NodeId;
use crate::{Error, Result};

/// Order in which [`Arena::each_node`] visits nodes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum TraversalOrder {
    /// Children after their parent, level by level.
    Breadth,
    /// A node, then each child subtree in order.
    DepthPreorder,
    /// Each child subtree in order, then the node.
    #[default]
    DepthPostorder,
}

impl TraversalOrder {
    pub fn parse(value: &str) -> Result<Self> {
        Self::from_str(value).map_err(|_| Error::InvalidTraversalOrder(value.to_owned()))
    }
}

/// One step of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    pub node: NodeId,
    /// Distance from the main node, which sits at depth 0.
    pub depth: usize,
    /// Position of this visit in the walk, starting at 0.
    pub index: usize,
    /// Parent of `node`. For the main node this is the id the walk was
    /// started from.
    pub parent: NodeId,
    /// Position of `node` among the children of `parent`; 0 for the main
    /// node. Tells apart the occurrences of a child linked twice.
    pub position: usize,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    depth: usize,
    parent: NodeId,
    position: usize,
    expanded: bool,
}

/// Lazy walk over the nodes below a root.
///
/// Cloning restarts nothing: the clone continues from the same point. Call
/// [`Arena::each_node`] again for a fresh walk. The walk does not end on a
/// cyclic graph; check [`Arena::has_cycle`] first when that is possible.
pub struct NodeWalk<'a, C> {
    arena: &'a Arena<C>,
    order: TraversalOrder,
    pending: VecDeque<Frame>,
    index: usize,
}

impl<C> Clone for NodeWalk<'_, C> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena,
            order: self.order,
            pending: self.pending.clone(),
            index: self.index,
        }
    }
}

impl<C> NodeWalk<'_, C> {
    fn children_of(&self, frame: &Frame) -> impl DoubleEndedIterator<Item = Frame> + '_ {
        let parent = frame.node;
        let depth = frame.depth + 1;
        self.arena
            .children(parent)
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .map(move |(position, &node)| Frame {
                node,
                depth,
                parent,
                position,
                expanded: false,
            })
    }

    fn next_frame(&mut self) -> Option<Frame> {
        match self.order {
            TraversalOrder::Breadth => {
                let frame = self.pending.pop_front()?;
                let children: Vec<_> = self.children_of(&frame).collect();
                self.pending.extend(children);
                Some(frame)
            }
            TraversalOrder::DepthPreorder => {
                let frame = self.pending.pop_back()?;
                let children: Vec<_> = self.children_of(&frame).rev().collect();
                self.pending.extend(children);
                Some(frame)
            }
            TraversalOrder::DepthPostorder => loop {
                let mut frame = self.pending.pop_back()?;
                if frame.expanded {
                    return Some(frame);
                }

                let children: Vec<_> = self.children_of(&frame).rev().collect();
                if children.is_empty() {
                    return Some(frame);
                }

                frame.expanded = true;
                self.pending.push_back(frame);
                self.pending.extend(children);
            },
        }
    }
}

impl<C> Iterator for NodeWalk<'_, C> {
    type Item = Visit;

    fn next(&mut self) -> Option<Visit> {
        let frame = self.next_frame()?;
        let visit = Visit {
            node: frame.node,
            depth: frame.depth,
            index: self.index,
            parent: frame.parent,
            position: frame.position,
        };
        self.index += 1;
        Some(visit)
    }
}

impl<C> Arena<C> {
    /// Walks the nodes below `root` in the given order.
    pub fn each_node(&self, root: NodeId, order: TraversalOrder) -> Result<NodeWalk<'_, C>> {
        let main = self.chainable(root)?;

        Ok(NodeWalk {
            arena: self,
            order,
            pending: VecDeque::from([Frame {
                node: main,
                depth: 0,
                parent: root,
                position: 0,
                expanded: false,
            }]),
            index: 0,
        })
    }

    /// Nodes reached more than once by a depth-first walk, in the order
    /// they were first found again.
    ///
    /// Shared subtrees and cycles both show up here; use
    /// [`has_cycle`](Arena::has_cycle) to tell them apart.
    pub fn repeated_nodes(&self, root: NodeId) -> Result<Vec<NodeId>> {
        let mut visited = HashSet::new();
        let mut repeated = Vec::new();
        let mut stack = vec![self.chainable(root)?];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                if !repeated.contains(&node) {
                    repeated.push(node);
                }
                continue;
            }

            stack.extend(self.children(node)?.iter().rev());
        }

        Ok(repeated)
    }

    /// Whether every node below `root` is referenced exactly once.
    pub fn uniq_nodes(&self, root: NodeId) -> Result<bool> {
        Ok(self.repeated_nodes(root)?.is_empty())
    }

    /// Whether a node below `root` can reach itself.
    ///
    /// Only the current path counts, so a node shared by two branches is not
    /// a cycle.
    pub fn has_cycle(&self, root: NodeId) -> Result<bool> {
        // (node, next child to visit)
        let mut stack = vec![(self.chainable(root)?, 0usize)];
        let mut path = HashSet::new();
        path.insert(stack[0].0);

        while let Some((node, next)) = stack.last_mut() {
            let children = self.children(*node)?;
            let Some(&child) = children.get(*next) else {
                path.remove(&*node);
                stack.pop();
                continue;
            };
            *next += 1;

            if !path.insert(child) {
                return Ok(true);
            }
            stack.push((child, 0));
        }

        Ok(false)
    }
}
