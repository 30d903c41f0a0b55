//! Opening book: a sequence of starting positions drawn from a PGN or EPD file, handed
//! out one per pairing in either file order or a shuffled order, with each opening
//! played twice (once per color) when `swap` is enabled.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::SeedableRng;
use rand::seq::SliceRandom;

use crate::board::pgn_reader::movetext_to_uci;
use crate::board::STARTPOS_FEN;
use crate::error::{AppError, Res};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BookFormat {
    Pgn,
    Epd,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BookOrder {
    Sequential,
    Random,
}

/// One starting position: a FEN plus the opening moves leading there, purely for
/// display (the engines get `position fen ... moves ...`, whichever form applies).
#[derive(Debug, Clone)]
pub struct Opening {
    pub fen: String,
    pub moves: Vec<String>,
}

impl Opening {
    #[must_use]
    pub fn startpos() -> Self {
        Self { fen: STARTPOS_FEN.to_string(), moves: Vec::new() }
    }
}

pub struct OpeningBook {
    openings: Vec<Opening>,
    order: Vec<usize>,
    cursor: AtomicUsize,
}

impl OpeningBook {
    #[must_use]
    pub fn startpos_only() -> Self {
        Self { openings: vec![Opening::startpos()], order: vec![0], cursor: AtomicUsize::new(0) }
    }

    pub fn load(path: &Path, format: BookFormat, order: BookOrder, rng_seed: u64) -> Res<Self> {
        let contents = fs::read_to_string(path).map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;
        let openings = match format {
            BookFormat::Pgn => parse_pgn_book(&contents)?,
            BookFormat::Epd => parse_epd_book(&contents),
        };
        if openings.is_empty() {
            return Err(AppError::Config(format!("opening book '{}' contains no positions", path.display())).into());
        }
        let mut indices: Vec<usize> = (0..openings.len()).collect();
        if order == BookOrder::Random {
            let mut rng = rand::rngs::StdRng::seed_from_u64(rng_seed);
            indices.shuffle(&mut rng);
        }
        Ok(Self { openings, order: indices, cursor: AtomicUsize::new(0) })
    }

    /// Hands out the next opening in book order, wrapping around once exhausted. Each
    /// pairing calls this exactly once; the scheduler is responsible for playing the
    /// returned opening from both colors when `swap` is set.
    #[must_use]
    pub fn fetch_next_opening(&self) -> Opening {
        let slot = self.cursor.fetch_add(1, Ordering::SeqCst) % self.order.len();
        self.openings[self.order[slot]].clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.openings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.openings.is_empty()
    }
}

fn parse_pgn_book(contents: &str) -> Res<Vec<Opening>> {
    let mut openings = Vec::new();
    for game in split_pgn_games(contents) {
        let moves = movetext_to_uci(&game).map_err(AppError::Config)?;
        openings.push(Opening { fen: STARTPOS_FEN.to_string(), moves });
    }
    Ok(openings)
}

/// Splits a multi-game PGN file on blank lines following a tag-pair block, falling back
/// to treating the whole file as one game when there are no tag pairs at all.
fn split_pgn_games(contents: &str) -> Vec<String> {
    if !contents.contains('[') {
        return contents.lines().filter(|l| !l.trim().is_empty()).map(str::to_string).collect();
    }
    let mut games = Vec::new();
    let mut current = String::new();
    let mut in_movetext = false;
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            if in_movetext && !current.trim().is_empty() {
                games.push(std::mem::take(&mut current));
                in_movetext = false;
            }
        } else if !trimmed.is_empty() {
            in_movetext = true;
            current.push(' ');
            current.push_str(trimmed);
        }
    }
    if !current.trim().is_empty() {
        games.push(current);
    }
    games
}

fn parse_epd_book(contents: &str) -> Vec<Opening> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.splitn(5, ' ').collect();
            let fen = if fields.len() >= 4 {
                format!("{} {} {} {} 0 1", fields[0], fields[1], fields[2], fields[3])
            } else {
                line.to_string()
            };
            Opening { fen, moves: Vec::new() }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_book_wraps_around() {
        let openings = vec![Opening::startpos(), Opening { fen: "fen-two".into(), moves: vec!["e2e4".into()] }];
        let book = OpeningBook { openings, order: vec![0, 1], cursor: AtomicUsize::new(0) };
        assert_eq!(book.fetch_next_opening().fen, STARTPOS_FEN);
        assert_eq!(book.fetch_next_opening().fen, "fen-two");
        assert_eq!(book.fetch_next_opening().fen, STARTPOS_FEN);
    }

    #[test]
    fn epd_book_parses_fen_fields() {
        let epd = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -\n";
        let openings = parse_epd_book(epd);
        assert_eq!(openings.len(), 1);
        assert!(openings[0].fen.starts_with("rnbqkbnr"));
    }

    #[test]
    fn pgn_book_splits_multiple_games() {
        let pgn = "[Event \"a\"]\n\n1. e4 e5 1-0\n\n[Event \"b\"]\n\n1. d4 d5 1-0\n";
        let games = split_pgn_games(pgn);
        assert_eq!(games.len(), 2);
    }
}
