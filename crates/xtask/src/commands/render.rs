//! Render a random tree
//!
//! Builds one tree from a seed, ticks it, and prints its structure with the
//! status and tick count of every node.

use anyhow::{Context, Result};
use behavior_tree::{Arena, Status, random_tree};
use clap::Parser;
use console::{StyledObject, style};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::XtaskConfig;

/// Tick one random tree and print it
#[derive(Parser, Debug)]
pub struct Render {
    /// Seed of the generated tree
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks before printing
    #[arg(long)]
    ticks: Option<u32>,

    /// Depth budget of generated subtrees
    #[arg(long)]
    recursion: Option<u32>,

    /// Print without colors
    #[arg(long)]
    plain: bool,
}

impl Render {
    pub fn execute(self, config: &XtaskConfig) -> Result<()> {
        let seed = self.seed.unwrap_or(config.seed);
        let ticks = self.ticks.unwrap_or(config.ticks);
        let recursion = self.recursion.unwrap_or(config.recursion);

        let mut arena: Arena<()> = Arena::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let tree = random_tree(&mut arena, &mut rng, recursion)
            .with_context(|| format!("Failed to generate tree for seed {seed}"))?;

        for tick in 1..=ticks {
            arena
                .tick(tree)
                .with_context(|| format!("Tick {tick} failed"))?;
        }

        let printer = arena.printer(tree);
        if self.plain {
            println!("{printer}");
            return Ok(());
        }

        println!(
            "{} seed {}, {} ticks, status {}",
            style("Behavior tree").yellow().bold(),
            style(seed).cyan(),
            ticks,
            status_style(arena.status(tree)?)
        );
        println!();
        println!("∅");
        for line in printer.lines()? {
            println!(
                "{}{} {} {}",
                style(&line.prefix).dim(),
                line.name,
                status_style(line.status),
                tick_style(line.tick_count)
            );
        }
        println!();
        println!("{}", printer.summary()?);

        Ok(())
    }
}

fn status_style(status: Status) -> StyledObject<&'static str> {
    let name: &'static str = status.into();
    match status {
        Status::Success => style(name).blue(),
        Status::Running => style(name).green(),
        Status::Failure => style(name).red(),
    }
}

fn tick_style(count: u64) -> StyledObject<String> {
    let text = format!("({count} ticks)");
    if count == 0 {
        style(text).red().dim()
    } else {
        style(text).dim()
    }
}
