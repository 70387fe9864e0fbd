//! Builder utilities for ergonomic behavior tree construction.
//!
//! A [`Registry`] maps keywords to node factories and the number of children
//! each keyword takes. A [`Builder`] then assembles a tree from nested
//! closures, each [`Scope`] collecting the children of the node being built:
//!
//! ```
//! use behavior_tree::{Arena, Builder, Registry, Status};
//!
//! let registry = Registry::with_defaults();
//! let mut arena: Arena<()> = Arena::new();
//!
//! let tree = Builder::new(&mut arena, &registry)
//!     .build(|s| {
//!         s.node("sel", |s| {
//!             s.node("inv", |s| {
//!                 s.leaf("task")?;
//!                 Ok(())
//!             })?;
//!             s.leaf("t")?;
//!             Ok(())
//!         })?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! arena.tick(tree).unwrap();
//! assert_eq!(arena.status(tree).unwrap(), Status::Running);
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use crate::arena::Arena;
use crate::behavior::{Behavior, Nop};
use crate::node::{NodeId, NodeState};
use crate::{Error, Result, Status};

/// Number of children a keyword takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Arity {
    None,
    Single,
    Multiple,
}

/// Creates a node from the children collected for it.
pub type Factory<C> = Rc<dyn Fn(&mut Arena<C>, Vec<NodeId>) -> Result<NodeId>>;

struct Registration<C> {
    arity: Arity,
    factory: Factory<C>,
    alias: Option<String>,
}

impl<C> Clone for Registration<C> {
    fn clone(&self) -> Self {
        Self {
            arity: self.arity,
            factory: Rc::clone(&self.factory),
            alias: self.alias.clone(),
        }
    }
}

/// Keyword table used by a [`Builder`].
pub struct Registry<C> {
    entries: HashMap<String, Registration<C>>,
}

impl<C: 'static> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> Registry<C> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// A registry with the built-in keywords and their aliases.
    ///
    /// | Keyword         | Alias | Children |
    /// |-----------------|-------|----------|
    /// | `selector`      | `sel` | multiple |
    /// | `sequence`      | `seq` | multiple |
    /// | `inverter`      | `inv` | single   |
    /// | `force_success` |       | single   |
    /// | `force_failure` |       | single   |
    /// | `task`          | `t`   | none     |
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            ("selector", Arity::Multiple, factory(|arena, children| arena.selector(children))),
            ("sequence", Arity::Multiple, factory(|arena, children| arena.sequence(children))),
            (
                "inverter",
                Arity::Single,
                factory(|arena, children| arena.inverter(only_child(children)?)),
            ),
            (
                "force_success",
                Arity::Single,
                factory(|arena, children| arena.force_success(only_child(children)?)),
            ),
            (
                "force_failure",
                Arity::Single,
                factory(|arena, children| arena.force_failure(only_child(children)?)),
            ),
            ("task", Arity::None, factory(|arena, _| Ok(arena.empty_task()))),
        ];

        for (keyword, arity, factory) in defaults {
            registry.insert(keyword, arity, factory);
        }
        let aliases = [
            ("selector", "sel"),
            ("sequence", "seq"),
            ("inverter", "inv"),
            ("task", "t"),
        ];
        for (original, alias) in aliases {
            registry.link_alias(original, alias);
        }

        registry
    }

    /// Registers a keyword.
    pub fn register<F>(&mut self, keyword: &str, arity: Arity, factory: F) -> Result<()>
    where
        F: Fn(&mut Arena<C>, Vec<NodeId>) -> Result<NodeId> + 'static,
    {
        if self.contains(keyword) {
            return Err(Error::KeywordTaken(keyword.to_owned()));
        }

        self.insert(keyword, arity, Rc::new(factory));
        Ok(())
    }

    /// Makes `alias` an alternative name for `original`.
    pub fn register_alias(&mut self, original: &str, alias: &str) -> Result<()> {
        if !self.contains(original) {
            return Err(Error::UnknownKeyword(original.to_owned()));
        }
        if self.contains(alias) {
            return Err(Error::KeywordTaken(alias.to_owned()));
        }
        if alias.is_empty() {
            return Err(Error::InvalidArgument("alias cannot be empty".into()));
        }

        self.link_alias(original, alias);
        Ok(())
    }

    fn insert(&mut self, keyword: &str, arity: Arity, factory: Factory<C>) {
        self.entries.insert(
            keyword.to_owned(),
            Registration {
                arity,
                factory,
                alias: None,
            },
        );
    }

    fn link_alias(&mut self, original: &str, alias: &str) {
        let Some(entry) = self.entries.get_mut(original) else {
            return;
        };
        entry.alias = Some(alias.to_owned());

        let mut linked = entry.clone();
        linked.alias = Some(original.to_owned());
        self.entries.insert(alias.to_owned(), linked);
    }
}

impl<C> Registry<C> {
    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(keyword)
    }

    pub fn arity(&self, keyword: &str) -> Option<Arity> {
        self.entries.get(keyword).map(|entry| entry.arity)
    }

    /// The other name of `keyword`: the alias of an original keyword, or
    /// the original of an alias.
    pub fn alias_of(&self, keyword: &str) -> Option<&str> {
        self.entries.get(keyword)?.alias.as_deref()
    }

    /// Registered keywords, aliases included, in no particular order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn factory<C, F>(f: F) -> Factory<C>
where
    F: Fn(&mut Arena<C>, Vec<NodeId>) -> Result<NodeId> + 'static,
{
    Rc::new(f)
}

fn only_child(children: Vec<NodeId>) -> Result<NodeId> {
    children.into_iter().next().ok_or(Error::InvalidLeafNode)
}

/// Assembles a tree in an arena from nested closures.
pub struct Builder<'a, C> {
    arena: &'a mut Arena<C>,
    registry: &'a Registry<C>,
}

impl<'a, C: 'static> Builder<'a, C> {
    pub fn new(arena: &'a mut Arena<C>, registry: &'a Registry<C>) -> Self {
        Self { arena, registry }
    }

    /// Runs `f` at the top level and wraps the single node it creates in a
    /// tree.
    pub fn build<F>(self, f: F) -> Result<NodeId>
    where
        F: FnOnce(&mut Scope<'_, C>) -> Result<()>,
    {
        let mut scope = Scope::new(self.arena, self.registry);
        f(&mut scope)?;

        match scope.nodes[..] {
            [main] => {
                let tree = scope.arena.tree(main)?;
                tracing::debug!(%tree, size = scope.arena.size(tree)?, "tree built");
                Ok(tree)
            }
            _ => Err(Error::MainNodeCount(scope.nodes.len())),
        }
    }
}

/// Collects the nodes created at one level of a [`Builder`].
///
/// Every method that creates a node appends it to this level and also
/// returns its id, so it can be chained elsewhere later.
pub struct Scope<'a, C> {
    arena: &'a mut Arena<C>,
    registry: &'a Registry<C>,
    nodes: Vec<NodeId>,
}

impl<'a, C: 'static> Scope<'a, C> {
    fn new(arena: &'a mut Arena<C>, registry: &'a Registry<C>) -> Self {
        Self {
            arena,
            registry,
            nodes: Vec::new(),
        }
    }

    /// Direct access to the arena, e.g. to prepare nodes for [`chain`](Scope::chain).
    pub fn arena(&mut self) -> &mut Arena<C> {
        self.arena
    }

    /// Creates a node from a keyword that takes no children.
    pub fn leaf(&mut self, keyword: &str) -> Result<NodeId> {
        self.instantiate(keyword, Vec::new())
    }

    /// Creates a node from a keyword; its children are the nodes created by
    /// `f`.
    pub fn node<F>(&mut self, keyword: &str, f: F) -> Result<NodeId>
    where
        F: FnOnce(&mut Scope<'_, C>) -> Result<()>,
    {
        let children = self.collect(f)?;
        self.instantiate(keyword, children)
    }

    /// Links an existing node or subtree at this level.
    pub fn chain(&mut self, id: NodeId) -> Result<NodeId> {
        let id = self.arena.chainable(id)?;
        self.nodes.push(id);
        Ok(id)
    }

    pub fn task(&mut self, behavior: impl Behavior<C> + 'static) -> NodeId {
        let id = self.arena.task(behavior);
        self.nodes.push(id);
        id
    }

    pub fn task_fn<F>(&mut self, f: F) -> NodeId
    where
        F: FnMut(Option<&mut C>, &NodeState) -> Status + 'static,
    {
        let id = self.arena.task_fn(f);
        self.nodes.push(id);
        id
    }

    pub fn nop(&mut self, nop: Nop) -> NodeId {
        self.task(nop)
    }

    /// Creates a condition guarding the single node created by `f`.
    pub fn condition<P, F>(&mut self, predicate: P, f: F) -> Result<NodeId>
    where
        P: FnMut(Option<&mut C>, &NodeState) -> bool + 'static,
        F: FnOnce(&mut Scope<'_, C>) -> Result<()>,
    {
        let child = self.single_child("condition", f)?;
        self.push(|arena| arena.condition(child, predicate))
    }

    /// Creates a repeater over the single node created by `f`.
    pub fn repeater<F>(&mut self, times: u32, f: F) -> Result<NodeId>
    where
        F: FnOnce(&mut Scope<'_, C>) -> Result<()>,
    {
        let child = self.single_child("repeater", f)?;
        self.push(|arena| arena.repeater(child, times))
    }

    /// Creates a retry over the single node created by `f`.
    pub fn retry<F>(&mut self, times: u32, f: F) -> Result<NodeId>
    where
        F: FnOnce(&mut Scope<'_, C>) -> Result<()>,
    {
        let child = self.single_child("retry", f)?;
        self.push(|arena| arena.retry(child, times))
    }

    fn collect<F>(&mut self, f: F) -> Result<Vec<NodeId>>
    where
        F: FnOnce(&mut Scope<'_, C>) -> Result<()>,
    {
        let mut nested = Scope::new(&mut *self.arena, self.registry);
        f(&mut nested)?;
        Ok(nested.nodes)
    }

    fn single_child<F>(&mut self, keyword: &str, f: F) -> Result<NodeId>
    where
        F: FnOnce(&mut Scope<'_, C>) -> Result<()>,
    {
        let children = self.collect(f)?;
        check_arity(keyword, Arity::Single, children.len())?;
        only_child(children)
    }

    fn instantiate(&mut self, keyword: &str, children: Vec<NodeId>) -> Result<NodeId> {
        let entry = self
            .registry
            .entries
            .get(keyword)
            .ok_or_else(|| Error::UnknownKeyword(keyword.to_owned()))?;
        check_arity(keyword, entry.arity, children.len())?;

        let factory = Rc::clone(&entry.factory);
        self.push(|arena| factory(arena, children))
    }

    fn push(&mut self, create: impl FnOnce(&mut Arena<C>) -> Result<NodeId>) -> Result<NodeId> {
        let id = create(self.arena)?;
        self.nodes.push(id);
        Ok(id)
    }
}

fn check_arity(keyword: &str, expected: Arity, actual: usize) -> Result<()> {
    match (expected, actual) {
        (Arity::None, 0) | (Arity::Single, 1) => Ok(()),
        (Arity::Multiple, n) if n > 0 => Ok(()),
        (Arity::Single | Arity::Multiple, 0) => Err(Error::InvalidLeafNode),
        _ => Err(Error::ArityMismatch {
            keyword: keyword.to_owned(),
            expected,
            actual,
        }),
    }
}
