//! Error types raised while building, ticking and inspecting trees.

use thiserror::Error;

use crate::NodeId;
use crate::builder::Arity;

/// Errors surfaced by the engine.
///
/// Every error is fatal to the operation that raised it. The engine never
/// retries on its own; a tick that fails leaves the tree in whatever state
/// the failing node left it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("this node cannot be a leaf node; insert children before ticking")]
    InvalidLeafNode,

    #[error("invalid main node for a tree: {0}")]
    InvalidTreeMainNode(String),

    #[error("incorrect status value: a node cannot have '{0}' status")]
    IncorrectStatusValue(String),

    #[error(
        "strategy for iterating children nodes must select existing children; attempted to use strategy: {0}"
    )]
    IncorrectTraversalStrategy(String),

    #[error("traversal order must be one of: breadth, depth_preorder, depth_postorder (got '{0}')")]
    InvalidTraversalOrder(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("node {0} does not exist in this arena")]
    UnknownNode(NodeId),

    #[error("node {0} is not a control node")]
    NotAControlNode(NodeId),

    #[error("node {child} is not a child of node {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("node {0} was ticked while already ticking (the graph contains a cycle)")]
    ReentrantTick(NodeId),

    #[error("context is already borrowed while ticking node {0}")]
    ContextBorrowed(NodeId),

    #[error("keyword '{0}' is not registered")]
    UnknownKeyword(String),

    #[error("keyword '{0}' is already registered")]
    KeywordTaken(String),

    #[error("keyword '{keyword}' takes {expected} children, got {actual}")]
    ArityMismatch {
        keyword: String,
        expected: Arity,
        actual: usize,
    },

    #[error("tree main node should be a single node, got {0}")]
    MainNodeCount(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
