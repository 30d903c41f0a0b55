//! Everything needed to talk to one external UCI engine process: its static
//! configuration, the subprocess adapter, and the cache that keeps warm processes
//! around between games.

pub mod cache;
pub mod process;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A per-engine time control. Mirrors the handful of UCI `go` forms worth supporting:
/// fixed time per move, a clock with increment, or a fixed node/depth budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeControl {
    MoveTime { millis: u64 },
    Clock { base: Duration, increment: Duration, moves_to_go: Option<u32> },
    Nodes { nodes: u64 },
    Depth { plies: u32 },
    Infinite,
}

impl Default for TimeControl {
    fn default() -> Self {
        TimeControl::Clock { base: Duration::from_secs(10), increment: Duration::from_millis(100), moves_to_go: None }
    }
}

/// Everything the scheduler needs to spawn and talk to one engine: its binary, any
/// UCI options to set after the handshake, and the time control it plays with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfiguration {
    pub name: String,
    pub cmd: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Ordered so options that depend on a prior one being set first (e.g. `Hash` before
    /// a derived option) are sent to the engine in the order the user wrote them.
    #[serde(default)]
    pub uci_options: Vec<(String, String)>,
    #[serde(default)]
    pub time_control: TimeControl,
    /// Number of engine-internal search threads, read back from `uci_options`'s
    /// `"Threads"` entry when present. Used by the affinity manager to decide whether
    /// pinning is safe.
    #[serde(skip)]
    pub threads_cache: Option<u32>,
}

impl EngineConfiguration {
    #[must_use]
    pub fn threads(&self) -> u32 {
        self.uci_options.iter().find(|(name, _)| name == "Threads").and_then(|(_, v)| v.parse().ok()).unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threads_is_one() {
        let cfg = EngineConfiguration {
            name: "dummy".into(),
            cmd: "dummy".into(),
            args: vec![],
            working_dir: None,
            uci_options: Vec::new(),
            time_control: TimeControl::default(),
            threads_cache: None,
        };
        assert_eq!(cfg.threads(), 1);
    }
}
