//! Command-line surface. Mirrors the long flags a cutechess/fastchess-style arbiter
//! users would expect, but built with `clap`'s derive API rather than a hand-rolled
//! parser since there's no single-dash-argument convention to preserve here.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum, Eq, PartialEq)]
pub enum TournamentTypeArg {
    RoundRobin,
    Gauntlet,
}

#[derive(Debug, Clone, Copy, ValueEnum, Eq, PartialEq)]
pub enum BookFormatArg {
    Pgn,
    Epd,
}

#[derive(Debug, Clone, Copy, ValueEnum, Eq, PartialEq)]
pub enum BookOrderArg {
    Sequential,
    Random,
}

/// Everything the tournament needs besides the list of engines, which lives in the
/// `--config` TOML file since it doesn't fit comfortably on a command line.
#[derive(Parser, Debug)]
#[command(name = "arbiter", version, about = "A tournament matchmaking core for UCI chess engines")]
pub struct Cli {
    /// TOML file listing the engines to play and any tournament-level defaults.
    #[arg(long)]
    pub config: PathBuf,

    #[arg(long, value_enum)]
    pub event_type: Option<TournamentTypeArg>,

    #[arg(long)]
    pub rounds: Option<u32>,

    #[arg(long)]
    pub games: Option<u32>,

    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub swap: bool,

    #[arg(long)]
    pub book: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub book_format: Option<BookFormatArg>,

    #[arg(long, value_enum)]
    pub book_order: Option<BookOrderArg>,

    #[arg(long)]
    pub sprt: bool,

    #[arg(long)]
    pub elo0: Option<f64>,

    #[arg(long)]
    pub elo1: Option<f64>,

    #[arg(long)]
    pub alpha: Option<f64>,

    #[arg(long)]
    pub beta: Option<f64>,

    #[arg(long)]
    pub pgn_out: Option<PathBuf>,

    #[arg(long)]
    pub stats_out: Option<PathBuf>,

    #[arg(long)]
    pub debug: bool,

    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long)]
    pub event: Option<String>,

    #[arg(long)]
    pub quit_grace_ms: Option<u64>,

    #[arg(long)]
    pub handshake_timeout_ms: Option<u64>,

    #[arg(long)]
    pub resign_threshold_cp: Option<i32>,

    #[arg(long)]
    pub resign_move_count: Option<u32>,

    #[arg(long)]
    pub resign_start_ply: Option<u32>,

    #[arg(long)]
    pub draw_threshold_cp: Option<i32>,

    #[arg(long)]
    pub draw_move_count: Option<u32>,

    #[arg(long)]
    pub draw_start_ply: Option<u32>,

    #[arg(long)]
    pub max_plies: Option<u32>,

    /// Replay a game once, with a fresh engine process, after it ends in a disconnect.
    #[arg(long)]
    pub recover: bool,
}
