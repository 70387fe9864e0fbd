//! Defaults for xtask commands, read from the environment.
use std::env;

/// Settings shared by the fuzz and render commands.
///
/// Command-line flags take precedence over these values.
#[derive(Clone, Debug)]
pub struct XtaskConfig {
    /// Seed of the first generated tree.
    pub seed: u64,
    /// Number of trees generated by a fuzz run.
    pub trees: u64,
    /// Ticks applied to every tree.
    pub ticks: u32,
    /// Depth budget of generated subtrees.
    pub recursion: u32,
}

impl Default for XtaskConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            trees: 200,
            ticks: 25,
            recursion: 4,
        }
    }
}

impl XtaskConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `BT_SEED` - Seed of the first tree (default: 0)
    /// - `BT_TREES` - Trees per fuzz run (default: 200)
    /// - `BT_TICKS` - Ticks per tree (default: 25)
    /// - `BT_RECURSION` - Subtree depth budget (default: 4, minimum 1)
    ///
    /// Unset or unparsable values keep their default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(seed) = read_env::<u64>("BT_SEED") {
            config.seed = seed;
        }
        if let Some(trees) = read_env::<u64>("BT_TREES") {
            config.trees = trees;
        }
        if let Some(ticks) = read_env::<u32>("BT_TICKS") {
            config.ticks = ticks;
        }
        if let Some(recursion) = read_env::<u32>("BT_RECURSION") {
            config.recursion = recursion.max(1);
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
