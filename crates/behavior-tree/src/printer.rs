//! Text rendering of a tree.
//!
//! ```text
//! ∅
//! └─selector running (1 ticks)
//!   ├─inverter failure (1 ticks)
//!   │ └─task success (1 ticks)
//!   └─task running (1 ticks)
//!
//! Cycles: no.
//! All nodes are unique object refs: yes.
//! Tree has 4 nodes.
//! ```
//!
//! Rendering is read-only and never changes node state.

use std::collections::HashSet;
use std::fmt;

use crate::algorithms::TraversalOrder;
use crate::arena::Arena;
use crate::node::NodeId;
use crate::{Result, Status};

/// One rendered node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    /// Indentation and connector drawn before the node.
    pub prefix: String,
    pub name: &'a str,
    pub status: Status,
    pub tick_count: u64,
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {} ({} ticks)",
            self.prefix, self.name, self.status, self.tick_count
        )
    }
}

/// Structural facts printed below the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub has_cycle: bool,
    pub uniq_nodes: bool,
    /// Nodes below the root, the root excluded.
    pub nodes: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cycles: {}.", yes_no(self.has_cycle))?;
        writeln!(f, "All nodes are unique object refs: {}.", yes_no(self.uniq_nodes))?;
        write!(f, "Tree has {} nodes.", self.nodes)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Renders the tree below `root`.
pub struct Printer<'a, C> {
    arena: &'a Arena<C>,
    root: NodeId,
}

impl<'a, C> Printer<'a, C> {
    pub fn new(arena: &'a Arena<C>, root: NodeId) -> Self {
        Self { arena, root }
    }

    /// One line per node in depth-first pre-order. Empty when the graph has
    /// a cycle, since its structure cannot be expanded.
    pub fn lines(&self) -> Result<Vec<Line<'a>>> {
        if self.arena.has_cycle(self.root)? {
            return Ok(Vec::new());
        }

        // Depths whose vertical line continues below the current node.
        let mut open = HashSet::new();
        let mut lines = Vec::new();

        for visit in self.arena.each_node(self.root, TraversalOrder::DepthPreorder)? {
            let last_child = visit.depth == 0
                || visit.position + 1 == self.arena.children(visit.parent)?.len();

            if last_child {
                open.remove(&visit.depth);
            } else {
                open.insert(visit.depth);
            }

            let mut prefix: String = (0..visit.depth)
                .map(|depth| if open.contains(&depth) { "│ " } else { "  " })
                .collect();
            prefix.push_str(if last_child { "└─" } else { "├─" });

            let state = self.arena.state(visit.node)?;
            lines.push(Line {
                prefix,
                name: self.arena.display_name(visit.node)?,
                status: state.status(),
                tick_count: state.tick_count(),
            });
        }

        Ok(lines)
    }

    pub fn summary(&self) -> Result<Summary> {
        Ok(Summary {
            has_cycle: self.arena.has_cycle(self.root)?,
            uniq_nodes: self.arena.uniq_nodes(self.root)?,
            nodes: self.arena.size(self.root)?.saturating_sub(1),
        })
    }
}

impl<C> fmt::Display for Printer<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.lines().map_err(|_| fmt::Error)?;
        let summary = self.summary().map_err(|_| fmt::Error)?;

        writeln!(f, "∅")?;
        for line in lines {
            writeln!(f, "{line}")?;
        }
        writeln!(f)?;
        write!(f, "{summary}")
    }
}

impl<C> Arena<C> {
    pub fn printer(&self, root: NodeId) -> Printer<'_, C> {
        Printer::new(self, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Nop;

    #[test]
    fn renders_structure_and_summary() {
        let mut arena: Arena<()> = Arena::new();
        let nop = arena.nop(Nop::new(1).unwrap());
        let inverter = arena.inverter(nop).unwrap();
        let task = arena.empty_task();
        let sel = arena.selector([inverter, task]).unwrap();
        let tree = arena.tree(sel).unwrap();

        arena.tick(tree).unwrap();

        let expected = "\
∅
└─selector running (1 ticks)
  ├─inverter failure (1 ticks)
  │ └─nop success (1 ticks)
  └─task running (1 ticks)

Cycles: no.
All nodes are unique object refs: yes.
Tree has 4 nodes.";
        assert_eq!(arena.printer(tree).to_string(), expected);
    }

    #[test]
    fn child_linked_twice_gets_both_connectors() {
        let mut arena: Arena<()> = Arena::new();
        let task = arena.empty_task();
        let sel = arena.selector([task, task]).unwrap();
        let tree = arena.tree(sel).unwrap();

        let expected = "\
∅
└─selector success (0 ticks)
  ├─task success (0 ticks)
  └─task success (0 ticks)

Cycles: no.
All nodes are unique object refs: no.
Tree has 3 nodes.";
        assert_eq!(arena.printer(tree).to_string(), expected);
    }

    #[test]
    fn cyclic_graph_is_not_expanded() {
        let mut arena: Arena<()> = Arena::new();
        let seq = arena.sequence(Vec::new()).unwrap();
        let nop = arena.nop(Nop::new(1).unwrap());
        let inverter = arena.inverter(seq).unwrap();
        arena.push_child(seq, nop).unwrap();
        arena.push_child(seq, inverter).unwrap();
        let tree = arena.tree(inverter).unwrap();

        let printer = arena.printer(tree);
        assert!(printer.lines().unwrap().is_empty());
        assert_eq!(
            printer.summary().unwrap(),
            Summary {
                has_cycle: true,
                uniq_nodes: false,
                nodes: 4,
            }
        );
    }
}
