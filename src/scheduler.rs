//! Pairing enumeration and the concurrent worker pool that plays them out: round-robin
//! or gauntlet pairing generation, a fixed-size `threadpool`, per-pairing result
//! aggregation, and an SPRT-triggered cooperative stop.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use itertools::Itertools;
use threadpool::ThreadPool;

use crate::affinity::AffinityManager;
use crate::engine::EngineConfiguration;
use crate::engine::cache::EngineCache;
use crate::error::{AppError, Res};
use crate::match_driver::{Adjudicator, MatchDriver, MatchResult, Termination};
use crate::opening_book::{Opening, OpeningBook};
use crate::output::{Message, Output};
use crate::pgn::{FileWriter, PgnBuilder};
use crate::sprt::{self, SprtDecision, SprtParams};
use crate::stats::{GameResult, ResultAggregator, StatsSnapshot, pairing_stats_path};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TournamentType {
    RoundRobin,
    Gauntlet,
}

/// One (engine, engine) pairing that will be played `games_per_pairing` times.
#[derive(Debug, Clone)]
pub struct Pairing {
    pub index: usize,
    pub a: String,
    pub b: String,
}

#[must_use]
pub fn generate_pairings(engines: &[String], tournament_type: TournamentType) -> Vec<Pairing> {
    let combos: Vec<(String, String)> = match tournament_type {
        TournamentType::RoundRobin => engines.iter().tuple_combinations().map(|(a, b)| (a.clone(), b.clone())).collect(),
        TournamentType::Gauntlet => {
            let Some((nominee, rest)) = engines.split_first() else { return Vec::new() };
            rest.iter().map(|opp| (nominee.clone(), opp.clone())).collect()
        }
    };
    combos.into_iter().enumerate().map(|(index, (a, b))| Pairing { index, a, b }).collect()
}

/// A single scheduled game: which pairing it belongs to (for result bookkeeping), which
/// opening to start from, and which side gets White.
#[derive(Debug, Clone)]
pub struct PairingTicket {
    pub pairing_index: usize,
    pub white: String,
    pub black: String,
    pub opening: Opening,
    /// Identifies which penta-nomial pair (same opening, swapped colors) this game
    /// belongs to, so the two halves are matched by schedule position rather than by
    /// whichever order two concurrent workers happen to finish in.
    pub pair_key: u64,
    /// Set on the one-shot replay of a ticket whose first attempt ended in a disconnect
    /// under the `recover` policy, so it isn't replayed a second time.
    pub retried: bool,
}

/// Rejects the one genuinely invalid combination this layer can't silently paper over:
/// an odd number of games per pairing with color-swapping enabled while an SPRT test is
/// running, which would leave the penta-nomial pairing logic with an orphaned game.
pub fn validate_games_and_swap(games_per_pairing: u32, swap: bool, sprt_enabled: bool) -> Res<()> {
    if sprt_enabled && swap && games_per_pairing % 2 != 0 {
        return Err(AppError::Config(format!(
            "games-per-pairing must be even when --swap is set under an active SPRT (got {games_per_pairing})"
        ))
        .into());
    }
    Ok(())
}

/// Expands `pairings` into the full schedule of tickets across `rounds`, drawing one
/// opening per pairing occurrence from `book` the way the source codebase's
/// `fetchNextOpening` is called once per pairing rather than once per game.
#[must_use]
pub fn create_tickets(pairings: &[Pairing], rounds: u32, games_per_pairing: u32, swap: bool, book: &OpeningBook) -> Vec<PairingTicket> {
    let mut tickets = Vec::new();
    for round in 0..rounds {
        for pairing in pairings {
            let opening = book.fetch_next_opening();
            for game in 0..games_per_pairing {
                let swapped = swap && game % 2 == 1;
                let (white, black) = if swapped { (pairing.b.clone(), pairing.a.clone()) } else { (pairing.a.clone(), pairing.b.clone()) };
                let pair_key = u64::from(round) * u64::from(games_per_pairing) + u64::from(game / 2);
                tickets.push(PairingTicket { pairing_index: pairing.index, white, black, opening: opening.clone(), pair_key, retried: false });
            }
        }
    }
    tickets
}

pub struct SchedulerConfig {
    pub concurrency: usize,
    pub sprt: Option<SprtParams>,
    pub recover: bool,
}

/// Owns the worker pool and per-pairing aggregators for one tournament run.
pub struct Scheduler {
    pool: ThreadPool,
    engine_cache: Arc<EngineCache>,
    affinity: Arc<AffinityManager>,
    aggregators: Vec<Arc<ResultAggregator>>,
    pairing_names: Vec<(String, String)>,
    stats_out: Option<PathBuf>,
    stop_flag: Arc<AtomicBool>,
    output: Arc<dyn Output>,
    sprt: Option<SprtParams>,
    pgn_writer: Option<Arc<FileWriter>>,
    recover: bool,
}

impl Scheduler {
    /// Builds a scheduler for `pairings`, resuming each pairing's tally from a snapshot
    /// file under `stats_out` if one is already on disk (so a tournament interrupted and
    /// re-run with the same `--stats-out` doesn't start every pairing back at 0-0-0).
    pub fn new(
        config: &SchedulerConfig,
        engine_configs: Vec<EngineConfiguration>,
        pairings: &[Pairing],
        stats_out: Option<PathBuf>,
        stop_flag: Arc<AtomicBool>,
        output: Arc<dyn Output>,
        pgn_writer: Option<Arc<FileWriter>>,
    ) -> Res<Self> {
        let total_cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let thread_counts: Vec<u32> = engine_configs.iter().map(EngineConfiguration::threads).collect();
        let mut aggregators = Vec::with_capacity(pairings.len());
        for pairing in pairings {
            let resumed = match &stats_out {
                Some(base) => {
                    let path = pairing_stats_path(base, &pairing.a, &pairing.b);
                    crate::stats::load_json(&path)?.map(|snapshot: StatsSnapshot| ResultAggregator::from_snapshot(&snapshot))
                }
                None => None,
            };
            aggregators.push(Arc::new(resumed.unwrap_or_default()));
        }
        Ok(Self {
            pool: ThreadPool::new(config.concurrency.max(1)),
            engine_cache: Arc::new(EngineCache::new(engine_configs, Arc::clone(&output))),
            affinity: Arc::new(AffinityManager::from_engine_threads(total_cpus, &thread_counts)),
            aggregators,
            pairing_names: pairings.iter().map(|p| (p.a.clone(), p.b.clone())).collect(),
            stats_out,
            stop_flag,
            output,
            sprt: config.sprt,
            pgn_writer,
            recover: config.recover,
        })
    }

    #[must_use]
    pub fn aggregator(&self, pairing_index: usize) -> Arc<ResultAggregator> {
        Arc::clone(&self.aggregators[pairing_index])
    }

    /// Submits every ticket to the pool and blocks until all have either completed or
    /// the stop flag was observed. Adjudication settings apply uniformly to every game.
    /// When `recover` is enabled, a game that ends in a disconnect is queued for exactly
    /// one replay with a fresh engine process instead of being scored as a loss.
    pub fn run(&self, tickets: Vec<PairingTicket>, adjudicator_factory: impl Fn() -> Option<Adjudicator> + Send + Sync + 'static) {
        let adjudicator_factory = Arc::new(adjudicator_factory);
        let retry_queue: Arc<std::sync::Mutex<Vec<PairingTicket>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        self.submit_batch(tickets, &adjudicator_factory, &retry_queue);
        self.pool.join();
        if self.recover {
            let retries = std::mem::take(&mut *retry_queue.lock().expect("retry queue poisoned"));
            if !retries.is_empty() {
                self.output.send(Message::Info(format!("replaying {} disconnected game(s)", retries.len())));
                self.submit_batch(retries, &adjudicator_factory, &retry_queue);
                self.pool.join();
            }
        }
    }

    fn submit_batch(
        &self,
        tickets: Vec<PairingTicket>,
        adjudicator_factory: &Arc<impl Fn() -> Option<Adjudicator> + Send + Sync + 'static>,
        retry_queue: &Arc<std::sync::Mutex<Vec<PairingTicket>>>,
    ) {
        for ticket in tickets {
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }
            let engine_cache = Arc::clone(&self.engine_cache);
            let affinity = Arc::clone(&self.affinity);
            let aggregator = self.aggregator(ticket.pairing_index);
            let stop_flag = Arc::clone(&self.stop_flag);
            let output = Arc::clone(&self.output);
            let sprt = self.sprt;
            let pgn_writer = self.pgn_writer.clone();
            let factory = Arc::clone(adjudicator_factory);
            let recover = self.recover;
            let retry_queue = Arc::clone(retry_queue);
            let stats_path = self
                .stats_out
                .as_ref()
                .map(|base| pairing_stats_path(base, &self.pairing_names[ticket.pairing_index].0, &self.pairing_names[ticket.pairing_index].1));
            let mut retry_ticket = ticket.clone();
            retry_ticket.retried = true;
            let already_retried = ticket.retried;
            let pair_key = ticket.pair_key;
            let swapped = ticket.white != self.pairing_names[ticket.pairing_index].0;
            self.pool.execute(move || {
                let _reservation = affinity.acquire();
                let driver = MatchDriver {
                    white_name: ticket.white.clone(),
                    black_name: ticket.black.clone(),
                    opening: ticket.opening,
                    adjudicator: factory(),
                    stop_flag: Arc::clone(&stop_flag),
                    output: Arc::clone(&output),
                };
                match driver.play(&engine_cache) {
                    Ok(data) => {
                        if data.needs_restart && recover && !already_retried {
                            output.send(Message::Warning(format!("{} vs {} disconnected, queued for replay", data.white, data.black)));
                            retry_queue.lock().expect("retry queue poisoned").push(retry_ticket);
                            return;
                        }
                        output.send(Message::Info(format!(
                            "{} vs {}: {:?} ({:?})",
                            data.white, data.black, data.result, data.termination
                        )));
                        if data.termination == Termination::Interrupt {
                            return;
                        }
                        let game_result_for_a = classify(&data.result, swapped);
                        aggregator.record_game(pair_key, game_result_for_a);
                        if let Some(path) = &stats_path {
                            if let Err(e) = aggregator.save_json(path) {
                                output.send(Message::Warning(format!("failed to persist stats snapshot: {e}")));
                            }
                        }
                        if let Some(writer) = &pgn_writer {
                            let mut pgn = PgnBuilder::new(result_tag(&data.result));
                            pgn.header("White", &data.white).header("Black", &data.black).header("FEN", &data.final_fen);
                            for mov in &data.moves {
                                pgn.push_move(mov);
                            }
                            let _ = writer.write(&pgn.build());
                        }
                        if let Some(params) = sprt {
                            let decision = sprt::decide(&aggregator.pentanomial(), &params);
                            if decision != SprtDecision::Continue {
                                output.send(Message::Info(format!("SPRT decided: {decision:?}")));
                                stop_flag.store(true, Ordering::SeqCst);
                            }
                        }
                    }
                    Err(err) => output.send(Message::Error(format!("game error: {err}"))),
                }
            });
        }
    }

    pub fn shutdown(&self, grace: std::time::Duration) {
        self.engine_cache.shutdown_all(grace);
    }
}

/// Classifies a finished game's `MatchResult` from engine A's viewpoint, inverting when
/// `swapped` (A played Black this game) so a pairing's tally and penta-nomial histogram
/// are always keyed to the same engine regardless of which color it held.
fn classify(result: &MatchResult, swapped: bool) -> GameResult {
    let from_white = match result {
        MatchResult::WhiteWin => GameResult::Win,
        MatchResult::BlackWin => GameResult::Loss,
        MatchResult::Draw => GameResult::Draw,
    };
    if swapped { invert(from_white) } else { from_white }
}

fn invert(result: GameResult) -> GameResult {
    match result {
        GameResult::Win => GameResult::Loss,
        GameResult::Loss => GameResult::Win,
        GameResult::Draw => GameResult::Draw,
    }
}

fn result_tag(result: &MatchResult) -> String {
    match result {
        MatchResult::WhiteWin => "1-0".to_string(),
        MatchResult::BlackWin => "0-1".to_string(),
        MatchResult::Draw => "1/2-1/2".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engines(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn round_robin_on_four_engines_has_six_pairings() {
        let pairings = generate_pairings(&engines(&["a", "b", "c", "d"]), TournamentType::RoundRobin);
        assert_eq!(pairings.len(), 6);
        assert_eq!((&pairings[0].a, &pairings[0].b), (&"a".to_string(), &"b".to_string()));
        assert_eq!((&pairings[5].a, &pairings[5].b), (&"c".to_string(), &"d".to_string()));
    }

    #[test]
    fn gauntlet_pairs_nominee_against_everyone_else() {
        let pairings = generate_pairings(&engines(&["champ", "b", "c"]), TournamentType::Gauntlet);
        assert_eq!(pairings.len(), 2);
        assert!(pairings.iter().all(|p| p.a == "champ"));
    }

    #[test]
    fn four_engines_one_round_two_games_yields_twelve_tickets() {
        let pairings = generate_pairings(&engines(&["a", "b", "c", "d"]), TournamentType::RoundRobin);
        let book = OpeningBook::startpos_only();
        let tickets = create_tickets(&pairings, 1, 2, true, &book);
        assert_eq!(tickets.len(), 12);
        assert_eq!(tickets[0].white, "a");
        assert_eq!(tickets[0].black, "b");
        assert_eq!(tickets[1].white, "b");
        assert_eq!(tickets[1].black, "a");
    }

    #[test]
    fn odd_games_with_swap_and_sprt_is_rejected() {
        assert!(validate_games_and_swap(3, true, true).is_err());
        assert!(validate_games_and_swap(2, true, true).is_ok());
        assert!(validate_games_and_swap(3, true, false).is_ok());
    }
}
