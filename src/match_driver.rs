//! The state machine driving one game between two engine processes: handshake, the
//! alternating think/apply loop with clock bookkeeping, adjudication, and terminal
//! detection, producing one `MatchData` record per game.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::board::pieces::Color;
use crate::board::{Board, GameEnd, Move};
use crate::engine::cache::EngineCache;
use crate::engine::{EngineConfiguration, TimeControl};
use crate::error::{AppError, Res};
use crate::opening_book::Opening;
use crate::output::{Message, Output};

/// A margin added to the computed `go` deadline to tolerate scheduling jitter and I/O
/// latency that isn't really "thinking time" the engine should be charged for.
const READ_DEADLINE_MARGIN: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Termination {
    Normal,
    TimeLoss,
    IllegalMove,
    Disconnect,
    /// Move-count cap reached (`max_plies`), as opposed to a score-based draw claim.
    AdjudicationPlies,
    /// Both sides' scores stayed inside the draw threshold for the required streak.
    AdjudicationDrawScore,
    AdjudicationResign,
    Interrupt,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MatchResult {
    WhiteWin,
    BlackWin,
    Draw,
}

#[derive(Debug, Clone)]
pub struct MatchData {
    pub white: String,
    pub black: String,
    pub moves: Vec<String>,
    pub result: MatchResult,
    pub termination: Termination,
    pub final_fen: String,
    /// Set for a `Disconnect` termination: the game's result reflects a crashed engine
    /// rather than a fair finish, so it's a candidate for a one-shot replay under the
    /// `recover` policy rather than being counted toward the pairing's tally as-is.
    pub needs_restart: bool,
}

/// Tracks one side's remaining time budget through a game. Non-clock time controls
/// (fixed movetime/nodes/depth/infinite) get an effectively unbounded clock since the
/// `go` command itself already bounds the engine's thinking time.
#[derive(Debug, Clone, Copy)]
pub struct EngineClock {
    pub remaining: Duration,
    pub increment: Duration,
}

impl EngineClock {
    #[must_use]
    pub fn new(tc: &TimeControl) -> Self {
        match tc {
            TimeControl::Clock { base, increment, .. } => Self { remaining: *base, increment: *increment },
            _ => Self { remaining: Duration::from_secs(24 * 3600), increment: Duration::ZERO },
        }
    }

    /// Charges `elapsed` against the remaining budget and adds the increment back.
    /// Returns `Err(())` if the side flagged (used more time than it had).
    pub fn consume(&mut self, elapsed: Duration) -> Result<(), ()> {
        if elapsed > self.remaining {
            self.remaining = Duration::ZERO;
            return Err(());
        }
        self.remaining -= elapsed;
        self.remaining += self.increment;
        Ok(())
    }
}

/// A single-threshold streak counter: `move_count` consecutive plies with both scores
/// beyond `score_threshold_cp` (in the qualifying direction) trigger the adjudication.
#[derive(Debug, Clone, Copy)]
pub struct ScoreAdjudication {
    pub move_count: u32,
    pub score_threshold_cp: i32,
    pub start_after_ply: u32,
}

pub struct Adjudicator {
    resign: Option<ScoreAdjudication>,
    draw: Option<ScoreAdjudication>,
    max_plies: Option<u32>,
    resign_streak: u32,
    draw_streak: u32,
}

impl Adjudicator {
    #[must_use]
    pub fn new(resign: Option<ScoreAdjudication>, draw: Option<ScoreAdjudication>, max_plies: Option<u32>) -> Self {
        Self { resign, draw, max_plies, resign_streak: 0, draw_streak: 0 }
    }

    /// Checks the per-ply adjudication rules in the same priority order as the source
    /// codebase's adjudicator (move cap, then draw, then resignation), given the latest
    /// `score cp` from each side (from White's perspective) and the current ply count.
    pub fn check(&mut self, ply: u32, white_cp: i32, black_cp: i32) -> Option<(Termination, MatchResult)> {
        if let Some(max_plies) = self.max_plies {
            if ply >= max_plies {
                return Some((Termination::AdjudicationPlies, MatchResult::Draw));
            }
        }
        if let Some(draw) = self.draw {
            if ply >= draw.start_after_ply {
                if white_cp.abs() < draw.score_threshold_cp && black_cp.abs() < draw.score_threshold_cp {
                    self.draw_streak += 1;
                } else {
                    self.draw_streak = 0;
                }
                if self.draw_streak >= draw.move_count {
                    return Some((Termination::AdjudicationDrawScore, MatchResult::Draw));
                }
            }
        }
        if let Some(resign) = self.resign {
            if ply >= resign.start_after_ply {
                let winner = if white_cp > resign.score_threshold_cp && black_cp < -resign.score_threshold_cp {
                    Some(MatchResult::WhiteWin)
                } else if white_cp < -resign.score_threshold_cp && black_cp > resign.score_threshold_cp {
                    Some(MatchResult::BlackWin)
                } else {
                    None
                };
                if winner.is_some() {
                    self.resign_streak += 1;
                } else {
                    self.resign_streak = 0;
                }
                if self.resign_streak >= resign.move_count {
                    return Some((Termination::AdjudicationResign, winner.expect("streak only grows with a winner")));
                }
            }
        }
        None
    }
}

pub struct MatchDriver {
    pub white_name: String,
    pub black_name: String,
    pub opening: Opening,
    pub adjudicator: Option<Adjudicator>,
    pub stop_flag: Arc<AtomicBool>,
    pub output: Arc<dyn Output>,
}

impl MatchDriver {
    pub fn play(mut self, engine_cache: &Arc<EngineCache>) -> Res<MatchData> {
        let white_config = engine_cache
            .config(&self.white_name)
            .ok_or_else(|| AppError::Config(format!("unknown engine '{}'", self.white_name)))?
            .clone();
        let black_config = engine_cache
            .config(&self.black_name)
            .ok_or_else(|| AppError::Config(format!("unknown engine '{}'", self.black_name)))?
            .clone();

        let mut white_lease = engine_cache.acquire(&self.white_name)?;
        let mut black_lease = engine_cache.acquire(&self.black_name)?;
        white_lease.new_game(crate::engine::process::DEFAULT_HANDSHAKE_TIMEOUT)?;
        black_lease.new_game(crate::engine::process::DEFAULT_HANDSHAKE_TIMEOUT)?;

        let mut board = Board::from_fen(&self.opening.fen).map_err(AppError::Config)?;
        board = board.apply_uci_moves(&self.opening.moves).map_err(AppError::Config)?;

        let mut moves: Vec<String> = self.opening.moves.clone();
        let mut clocks = [EngineClock::new(&white_config.time_control), EngineClock::new(&black_config.time_control)];
        let mut last_score_cp = [0i32, 0i32];
        let mut hash_history = vec![board.hash];

        let outcome = loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                break (Termination::Interrupt, MatchResult::Draw);
            }
            if let Some(end) = board.check_with_history(&hash_history) {
                break self.result_for_game_end(end, board.side_to_move);
            }
            if let Some(adjudicator) = self.adjudicator.as_mut() {
                if let Some(decision) = adjudicator.check(moves.len() as u32, last_score_cp[0], last_score_cp[1]) {
                    break decision;
                }
            }

            let white_to_move = board.side_to_move.is_white();
            let (lease, clock_idx, tc) =
                if white_to_move { (&mut white_lease, 0, &white_config.time_control) } else { (&mut black_lease, 1, &black_config.time_control) };

            lease.set_position(&self.opening.fen, &moves)?;
            lease.go(tc, clocks[0].remaining, clocks[1].remaining, clocks[0].increment, clocks[1].increment)?;

            let started = Instant::now();
            let deadline = started + clocks[clock_idx].remaining + READ_DEADLINE_MARGIN;
            let (uci_move, _ponder, score) = match lease.read_bestmove_with_score(deadline) {
                Ok(v) => v,
                Err(err) => {
                    self.output.send(Message::Warning(format!("{}: {err}", self.engine_name(clock_idx))));
                    if clock_idx == 0 { white_lease.poison() } else { black_lease.poison() };
                    break (Termination::Disconnect, self.result_for_loser(clock_idx));
                }
            };
            let elapsed = started.elapsed();
            if clocks[clock_idx].consume(elapsed).is_err() {
                break (Termination::TimeLoss, self.result_for_loser(clock_idx));
            }
            if let Some(cp) = score {
                last_score_cp[clock_idx] = if white_to_move { cp } else { -cp };
            }

            let Some(mov) = Move::from_uci(&uci_move) else {
                break (Termination::IllegalMove, self.result_for_loser(clock_idx));
            };
            let Some(next_board) = board.try_make_move(mov) else {
                break (Termination::IllegalMove, self.result_for_loser(clock_idx));
            };
            moves.push(uci_move);
            board = next_board;
            hash_history.push(board.hash);
        };

        white_lease.stop().ok();
        black_lease.stop().ok();

        Ok(MatchData {
            white: self.white_name,
            black: self.black_name,
            moves,
            result: outcome.1,
            termination: outcome.0,
            final_fen: board.as_fen(),
            needs_restart: outcome.0 == Termination::Disconnect,
        })
    }

    fn engine_name(&self, clock_idx: usize) -> &str {
        if clock_idx == 0 { &self.white_name } else { &self.black_name }
    }

    fn result_for_loser(&self, clock_idx: usize) -> MatchResult {
        if clock_idx == 0 { MatchResult::BlackWin } else { MatchResult::WhiteWin }
    }

    fn result_for_game_end(&self, end: GameEnd, side_to_move: Color) -> (Termination, MatchResult) {
        match end {
            GameEnd::Checkmate => {
                let winner = if side_to_move.is_white() { MatchResult::BlackWin } else { MatchResult::WhiteWin };
                (Termination::Normal, winner)
            }
            GameEnd::Stalemate | GameEnd::InsufficientMaterial | GameEnd::FiftyMoveRule | GameEnd::ThreefoldRepetition => {
                (Termination::Normal, MatchResult::Draw)
            }
        }
    }
}

#[must_use]
pub fn engine_names(configs: &[EngineConfiguration]) -> Vec<String> {
    configs.iter().map(|c| c.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_flags_when_time_runs_out() {
        let mut clock = EngineClock { remaining: Duration::from_millis(100), increment: Duration::ZERO };
        assert!(clock.consume(Duration::from_millis(50)).is_ok());
        assert_eq!(clock.remaining, Duration::from_millis(50));
        assert!(clock.consume(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn increment_is_added_back_after_each_move() {
        let mut clock = EngineClock { remaining: Duration::from_secs(10), increment: Duration::from_millis(500) };
        clock.consume(Duration::from_secs(1)).unwrap();
        assert_eq!(clock.remaining, Duration::from_millis(9500));
    }

    #[test]
    fn move_cap_adjudicates_a_draw() {
        let mut adj = Adjudicator::new(None, None, Some(10));
        assert_eq!(adj.check(10, 0, 0), Some((Termination::AdjudicationPlies, MatchResult::Draw)));
        assert_eq!(adj.check(5, 0, 0), None);
    }

    #[test]
    fn draw_adjudication_needs_a_streak() {
        let draw_rule = ScoreAdjudication { move_count: 3, score_threshold_cp: 20, start_after_ply: 0 };
        let mut adj = Adjudicator::new(None, Some(draw_rule), None);
        assert_eq!(adj.check(1, 5, -5), None);
        assert_eq!(adj.check(2, 5, -5), None);
        assert_eq!(adj.check(3, 5, -5), Some((Termination::AdjudicationDrawScore, MatchResult::Draw)));
    }

    #[test]
    fn resignation_requires_opposite_signed_scores_past_threshold() {
        let resign_rule = ScoreAdjudication { move_count: 2, score_threshold_cp: 500, start_after_ply: 0 };
        let mut adj = Adjudicator::new(Some(resign_rule), None, None);
        assert_eq!(adj.check(1, 600, -600), None);
        assert_eq!(adj.check(2, 600, -600), Some((Termination::AdjudicationResign, MatchResult::WhiteWin)));
    }

    #[test]
    fn a_broken_streak_resets_the_counter() {
        let resign_rule = ScoreAdjudication { move_count: 2, score_threshold_cp: 500, start_after_ply: 0 };
        let mut adj = Adjudicator::new(Some(resign_rule), None, None);
        assert_eq!(adj.check(1, 600, -600), None);
        assert_eq!(adj.check(2, 0, 0), None);
        assert_eq!(adj.check(3, 600, -600), None);
    }
}
