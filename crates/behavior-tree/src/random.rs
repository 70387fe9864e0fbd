//! Random tree generation for fuzzing.
//!
//! Generated trees mix every built-in node kind. Leaf tasks and conditions
//! draw from their own seeded generators, so a tree built from a seeded rng
//! behaves the same on every run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arena::Arena;
use crate::builder::{Builder, Registry, Scope};
use crate::node::{NodeId, NodeState};
use crate::{Error, Result, Status};

// Out of 19: composites 4, decorators 10, conditions 4, leaves 1.
const CONTROL_WEIGHT: u32 = 4;
const DECORATED_WEIGHT: u32 = 10;
const CONDITION_WEIGHT: u32 = 4;
const LEAF_WEIGHT: u32 = 1;
const TOTAL_WEIGHT: u32 = CONTROL_WEIGHT + DECORATED_WEIGHT + CONDITION_WEIGHT + LEAF_WEIGHT;

/// Builds a random tree.
///
/// The main node is a selector or a sequence with 3 to 5 random subtrees,
/// each at most `recursion` levels deep.
pub fn random_tree<C: 'static>(
    arena: &mut Arena<C>,
    rng: &mut impl Rng,
    recursion: u32,
) -> Result<NodeId> {
    if recursion < 1 {
        return Err(Error::InvalidArgument(
            "recursion amount must be greater than 0".into(),
        ));
    }

    let registry = Registry::with_defaults();
    Builder::new(arena, &registry).build(|s| {
        let keyword = if rng.random_bool(0.5) { "sel" } else { "seq" };
        s.node(keyword, |s| {
            for _ in 0..rng.random_range(3..=5) {
                subtree(s, rng, recursion)?;
            }
            Ok(())
        })?;
        Ok(())
    })
}

fn subtree<C: 'static, R: Rng>(
    s: &mut Scope<'_, C>,
    rng: &mut R,
    recursion: u32,
) -> Result<()> {
    if recursion == 0 {
        leaf(s, rng);
        return Ok(());
    }

    let left = recursion - 1;
    let pick = rng.random_range(0..TOTAL_WEIGHT);

    if pick < CONTROL_WEIGHT {
        let keyword = if pick % 2 == 0 { "sel" } else { "seq" };
        s.node(keyword, |s| {
            for _ in 0..rng.random_range(2..=3) {
                subtree(s, rng, left)?;
            }
            Ok(())
        })?;
        return Ok(());
    }

    let pick = pick - CONTROL_WEIGHT;
    if pick < DECORATED_WEIGHT {
        match pick % 5 {
            0 => s.node("force_success", |s| subtree(s, rng, left))?,
            1 => s.node("force_failure", |s| subtree(s, rng, left))?,
            2 => s.node("inv", |s| subtree(s, rng, left))?,
            3 => s.retry(2, |s| subtree(s, rng, left))?,
            _ => s.repeater(2, |s| subtree(s, rng, left))?,
        };
        return Ok(());
    }

    let pick = pick - DECORATED_WEIGHT;
    if pick < CONDITION_WEIGHT {
        let threshold = if pick % 2 == 0 { 0.2 } else { 0.8 };
        let mut coin = StdRng::seed_from_u64(rng.random());
        s.condition(
            move |_: Option<&mut C>, _: &NodeState| coin.random::<f64>() > threshold,
            |s| subtree(s, rng, left),
        )?;
        return Ok(());
    }

    leaf(s, rng);
    Ok(())
}

/// A task reporting `Running`, `Success` or `Failure` with weights 3:1:2.
fn leaf<C: 'static, R: Rng>(s: &mut Scope<'_, C>, rng: &mut R) {
    let mut dice = StdRng::seed_from_u64(rng.random());
    s.task_fn(move |_: Option<&mut C>, _: &NodeState| match dice.random_range(0..6) {
        0..3 => Status::Running,
        3 => Status::Success,
        _ => Status::Failure,
    });
}
