//! Running score tallies for a pairing: plain win/loss/draw counts for Elo/LOS display,
//! and a penta-nomial (pair-scored) histogram for the SPRT, which needs games grouped
//! into same-opening pairs to account for the correlation between them.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::elo::Elo;
use crate::error::{AppError, Res};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

impl GameResult {
    #[must_use]
    fn score_index(self) -> usize {
        match self {
            GameResult::Loss => 0,
            GameResult::Draw => 1,
            GameResult::Win => 2,
        }
    }
}

/// Histogram over `{LL, LD/DL, DD/LW/WL, DW/WD, WW}`, indexed `0..=4` by the sum of the
/// two games' score indices (loss=0, draw=1, win=2), the standard penta-nomial bucketing
/// used to SPRT-test paired games instead of treating each game as independent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Pentanomial {
    pub buckets: [u64; 5],
}

impl Pentanomial {
    pub fn record_pair(&mut self, first: GameResult, second: GameResult) {
        self.buckets[first.score_index() + second.score_index()] += 1;
    }

    #[must_use]
    pub fn total_pairs(&self) -> u64 {
        self.buckets.iter().sum()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub pentanomial: Pentanomial,
    pub elo: String,
    pub los: String,
    pub draw_ratio: String,
}

/// Thread-safe score tally shared by every worker playing games for one pairing.
pub struct ResultAggregator {
    wins: AtomicU64,
    losses: AtomicU64,
    draws: AtomicU64,
    pentanomial: Mutex<Pentanomial>,
    /// Half-completed penta-nomial pairs, keyed by the scheduler's `pair_key` rather than
    /// call order, since concurrent workers can finish games from different pairs in any
    /// order.
    pending_pairs: Mutex<HashMap<u64, GameResult>>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            wins: AtomicU64::new(0),
            losses: AtomicU64::new(0),
            draws: AtomicU64::new(0),
            pentanomial: Mutex::new(Pentanomial::default()),
            pending_pairs: Mutex::new(HashMap::new()),
        }
    }

    /// Rebuilds a running tally from a previously saved snapshot, for resuming a
    /// tournament across runs. The snapshot doesn't carry in-flight pending pairs, so a
    /// resumed aggregator always starts clean on that front; any pair key that was
    /// half-complete when the prior run stopped is replayed as a fresh pair rather than
    /// completed from the prior run's half.
    #[must_use]
    pub fn from_snapshot(snapshot: &StatsSnapshot) -> Self {
        Self {
            wins: AtomicU64::new(snapshot.wins),
            losses: AtomicU64::new(snapshot.losses),
            draws: AtomicU64::new(snapshot.draws),
            pentanomial: Mutex::new(snapshot.pentanomial),
            pending_pairs: Mutex::new(HashMap::new()),
        }
    }

    /// Records one game's result against its penta-nomial pair key. The two games that
    /// share a `pair_key` (same opening, swapped colors) complete a pair whenever both
    /// have arrived, regardless of which one arrived first or how many other pairs'
    /// games were recorded in between.
    pub fn record_game(&self, pair_key: u64, result: GameResult) {
        match result {
            GameResult::Win => self.wins.fetch_add(1, Ordering::SeqCst),
            GameResult::Loss => self.losses.fetch_add(1, Ordering::SeqCst),
            GameResult::Draw => self.draws.fetch_add(1, Ordering::SeqCst),
        };
        let mut pending = self.pending_pairs.lock().expect("stats mutex poisoned");
        match pending.remove(&pair_key) {
            Some(first) => self.pentanomial.lock().expect("stats mutex poisoned").record_pair(first, result),
            None => {
                pending.insert(pair_key, result);
            }
        }
    }

    #[must_use]
    pub fn wins(&self) -> u64 {
        self.wins.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn losses(&self) -> u64 {
        self.losses.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn draws(&self) -> u64 {
        self.draws.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn games_played(&self) -> u64 {
        self.wins() + self.losses() + self.draws()
    }

    #[must_use]
    pub fn pentanomial(&self) -> Pentanomial {
        *self.pentanomial.lock().expect("stats mutex poisoned")
    }

    #[must_use]
    pub fn elo(&self) -> Elo {
        Elo::new(self.wins(), self.losses(), self.draws())
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let elo = self.elo();
        StatsSnapshot {
            wins: self.wins(),
            losses: self.losses(),
            draws: self.draws(),
            pentanomial: self.pentanomial(),
            elo: elo.format(),
            los: elo.format_los(),
            draw_ratio: format!("{:.2} %", elo.draw_ratio() * 100.0),
        }
    }

    pub fn save_json(&self, path: &Path) -> Res<()> {
        let json = serde_json::to_string_pretty(&self.snapshot()).expect("StatsSnapshot always serializes");
        fs::write(path, json).map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;
        Ok(())
    }
}

/// Derives the per-pairing stats file path from a base `stats_out` path and the two
/// engine names, shared between the resume read at startup and the periodic writes
/// during a run so both sides agree on where a pairing's snapshot lives.
#[must_use]
pub fn pairing_stats_path(base: &Path, engine_a: &str, engine_b: &str) -> std::path::PathBuf {
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("stats");
    base.with_file_name(format!("{stem}-{engine_a}-vs-{engine_b}.json"))
}

/// Reads a previously saved snapshot, if one exists, to resume a pairing's tally.
/// Returns `Ok(None)` when the file is simply absent, which is the common case for a
/// pairing that has never been played before.
pub fn load_json(path: &Path) -> Res<Option<StatsSnapshot>> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let snapshot: StatsSnapshot =
                serde_json::from_str(&contents).map_err(|e| AppError::Config(format!("corrupt stats snapshot at {}: {e}", path.display())))?;
            Ok(Some(snapshot))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(AppError::Io { path: path.to_path_buf(), source }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_bucketed_by_combined_score() {
        let agg = ResultAggregator::new();
        agg.record_game(0, GameResult::Win);
        agg.record_game(0, GameResult::Loss);
        let pent = agg.pentanomial();
        assert_eq!(pent.buckets[2], 1);
        assert_eq!(pent.total_pairs(), 1);
    }

    #[test]
    fn odd_game_stays_pending() {
        let agg = ResultAggregator::new();
        agg.record_game(0, GameResult::Win);
        assert_eq!(agg.pentanomial().total_pairs(), 0);
        assert_eq!(agg.games_played(), 1);
    }

    #[test]
    fn out_of_order_arrivals_still_pair_by_key_not_call_order() {
        let agg = ResultAggregator::new();
        agg.record_game(1, GameResult::Win);
        agg.record_game(2, GameResult::Loss);
        agg.record_game(1, GameResult::Loss);
        agg.record_game(2, GameResult::Win);
        let pent = agg.pentanomial();
        assert_eq!(pent.total_pairs(), 2);
        assert_eq!(pent.buckets[2], 2);
    }

    #[test]
    fn snapshot_reflects_running_totals() {
        let agg = ResultAggregator::new();
        for i in 0..10u64 {
            agg.record_game(i, GameResult::Win);
        }
        let snap = agg.snapshot();
        assert_eq!(snap.wins, 10);
        assert_eq!(snap.elo, "inf +/- 0.00");
    }

    #[test]
    fn resuming_from_a_snapshot_preserves_totals_but_not_the_pending_half_pair() {
        let original = ResultAggregator::new();
        original.record_game(1, GameResult::Win);
        original.record_game(1, GameResult::Loss);
        original.record_game(2, GameResult::Draw);
        let resumed = ResultAggregator::from_snapshot(&original.snapshot());
        assert_eq!(resumed.wins(), 1);
        assert_eq!(resumed.losses(), 1);
        assert_eq!(resumed.draws(), 1);
        assert_eq!(resumed.pentanomial().total_pairs(), 1);
        resumed.record_game(3, GameResult::Win);
        assert_eq!(resumed.pentanomial().total_pairs(), 1);
        assert_eq!(resumed.games_played(), 4);
    }

    #[test]
    fn pairing_stats_path_inserts_engine_names_before_the_extension() {
        let base = Path::new("/tmp/out/results.json");
        let path = pairing_stats_path(base, "alpha", "beta");
        assert_eq!(path, Path::new("/tmp/out/results-alpha-vs-beta.json"));
    }

    #[test]
    fn load_json_returns_none_for_a_missing_file() {
        let path = std::env::temp_dir().join("arbiter-stats-test-missing-file.json");
        let _ = fs::remove_file(&path);
        assert!(load_json(&path).expect("missing file is not an error").is_none());
    }

    #[test]
    fn save_then_load_round_trips_a_snapshot() {
        let path = std::env::temp_dir().join("arbiter-stats-test-roundtrip.json");
        let agg = ResultAggregator::new();
        agg.record_game(0, GameResult::Win);
        agg.record_game(1, GameResult::Win);
        agg.save_json(&path).expect("save should succeed");
        let loaded = load_json(&path).expect("load should succeed").expect("file was just written");
        assert_eq!(loaded.wins, 2);
        let _ = fs::remove_file(&path);
    }
}
