//! Fuzz the engine with random trees
//!
//! Every tree is generated from its own seed, ticked repeatedly, then halted.
//! After each step the engine invariants are checked:
//! - Generated trees have no cycle and no shared node
//! - Every traversal order visits `size - 1` nodes with contiguous indices
//! - The tree root mirrors its main node
//! - Halting leaves every node `Success`, and halting again changes nothing

use anyhow::{Context, Result};
use behavior_tree::{Arena, NodeId, Status, TraversalOrder, random_tree};
use clap::Parser;
use console::style;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::config::XtaskConfig;

const ORDERS: [TraversalOrder; 3] = [
    TraversalOrder::Breadth,
    TraversalOrder::DepthPreorder,
    TraversalOrder::DepthPostorder,
];

/// Tick many random trees and check engine invariants
#[derive(Parser, Debug)]
pub struct Fuzz {
    /// Seed of the first tree; the following trees use consecutive seeds
    #[arg(long)]
    seed: Option<u64>,

    /// Number of trees to generate
    #[arg(long)]
    trees: Option<u64>,

    /// Ticks applied to every tree
    #[arg(long)]
    ticks: Option<u32>,

    /// Depth budget of generated subtrees
    #[arg(long)]
    recursion: Option<u32>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct FuzzReport {
    first_seed: u64,
    trees: u64,
    ticks: u32,
    recursion: u32,
    nodes: usize,
    violations: Vec<Violation>,
}

#[derive(Debug, Serialize)]
struct Violation {
    seed: u64,
    /// Tick after which the invariant broke; `None` for structural checks.
    tick: Option<u32>,
    message: String,
}

impl Fuzz {
    pub fn execute(self, config: &XtaskConfig) -> Result<()> {
        let mut report = FuzzReport {
            first_seed: self.seed.unwrap_or(config.seed),
            trees: self.trees.unwrap_or(config.trees),
            ticks: self.ticks.unwrap_or(config.ticks),
            recursion: self.recursion.unwrap_or(config.recursion),
            nodes: 0,
            violations: Vec::new(),
        };

        tracing::info!(
            first_seed = report.first_seed,
            trees = report.trees,
            ticks = report.ticks,
            recursion = report.recursion,
            "starting fuzz run"
        );

        for offset in 0..report.trees {
            let seed = report.first_seed.wrapping_add(offset);
            let mut run = TreeRun::new(seed, report.recursion)
                .with_context(|| format!("Failed to generate tree for seed {seed}"))?;

            run.check_structure()?;
            for tick in 1..=report.ticks {
                run.tick(tick)
                    .with_context(|| format!("Tick {tick} failed for seed {seed}"))?;
            }
            run.check_halt()?;

            report.nodes += run.size;
            report.violations.append(&mut run.violations);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        if !report.violations.is_empty() {
            anyhow::bail!("{} invariant violations", report.violations.len());
        }
        Ok(())
    }
}

struct TreeRun {
    seed: u64,
    arena: Arena<()>,
    tree: NodeId,
    main: NodeId,
    size: usize,
    violations: Vec<Violation>,
}

impl TreeRun {
    fn new(seed: u64, recursion: u32) -> Result<Self> {
        let mut arena = Arena::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let tree = random_tree(&mut arena, &mut rng, recursion)?;
        let main = arena.main_node(tree)?;
        let size = arena.size(tree)?;

        tracing::debug!(seed, size, "generated tree");
        Ok(Self {
            seed,
            arena,
            tree,
            main,
            size,
            violations: Vec::new(),
        })
    }

    fn violation(&mut self, tick: Option<u32>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(seed = self.seed, ?tick, %message, "invariant violated");
        self.violations.push(Violation {
            seed: self.seed,
            tick,
            message,
        });
    }

    fn check_structure(&mut self) -> Result<()> {
        if self.arena.has_cycle(self.tree)? {
            self.violation(None, "generated tree has a cycle");
            // Walks would not terminate.
            return Ok(());
        }
        if !self.arena.uniq_nodes(self.tree)? {
            self.violation(None, "generated tree shares nodes");
        }

        for order in ORDERS {
            let indices: Vec<usize> = self
                .arena
                .each_node(self.tree, order)?
                .map(|visit| visit.index)
                .collect();
            let expected: Vec<usize> = (0..self.size - 1).collect();
            if indices != expected {
                self.violation(
                    None,
                    format!(
                        "{order} walk visited {} nodes with indices out of order, expected {}",
                        indices.len(),
                        expected.len()
                    ),
                );
            }
        }

        Ok(())
    }

    fn tick(&mut self, tick: u32) -> Result<()> {
        self.arena.tick(self.tree)?;

        let tree_status = self.arena.status(self.tree)?;
        let main_status = self.arena.status(self.main)?;
        if tree_status != main_status {
            self.violation(
                Some(tick),
                format!("tree is {tree_status} but its main node is {main_status}"),
            );
        }
        Ok(())
    }

    fn check_halt(&mut self) -> Result<()> {
        self.arena.halt(self.tree)?;
        let halted = self.snapshot()?;
        if let Some((index, status, _)) = halted.iter().find(|(_, status, _)| !status.is_success()) {
            self.violation(
                None,
                format!("node at preorder index {index} is {status} after halt"),
            );
        }

        self.arena.halt(self.tree)?;
        if self.snapshot()? != halted {
            self.violation(None, "halting twice changed the tree");
        }
        Ok(())
    }

    /// (preorder index, status, tick count) of every node.
    fn snapshot(&self) -> Result<Vec<(usize, Status, u64)>> {
        self.arena
            .each_node(self.tree, TraversalOrder::DepthPreorder)?
            .map(|visit| {
                let state = self.arena.state(visit.node)?;
                Ok((visit.index, state.status(), state.tick_count()))
            })
            .collect()
    }
}

fn print_report(report: &FuzzReport) {
    println!("{}", style("Behavior tree fuzz").yellow().bold());
    println!();
    println!(
        "  {} {}..{}",
        style("Seeds:").bold(),
        report.first_seed,
        report.first_seed.wrapping_add(report.trees)
    );
    println!("  {} {}", style("Ticks per tree:").bold(), report.ticks);
    println!("  {} {}", style("Recursion:").bold(), report.recursion);
    println!("  {} {}", style("Nodes checked:").bold(), report.nodes);
    println!();

    if report.violations.is_empty() {
        println!("{}", style("✓ All invariants hold").green().bold());
        return;
    }

    for violation in &report.violations {
        let tick = violation
            .tick
            .map(|tick| format!(" tick {tick}"))
            .unwrap_or_default();
        println!(
            "  {} seed {}{}: {}",
            style("✗").red().bold(),
            style(violation.seed).cyan(),
            tick,
            violation.message
        );
    }
    println!();
    println!(
        "{}",
        style(format!("✗ {} violations", report.violations.len()))
            .red()
            .bold()
    );
}
