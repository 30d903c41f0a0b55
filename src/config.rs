//! Resolves the fully-merged tournament configuration from a TOML file plus CLI
//! overrides (CLI wins), then validates it before anything gets spawned.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::cli::{BookFormatArg, BookOrderArg, Cli, TournamentTypeArg};
use crate::engine::EngineConfiguration;
use crate::error::{AppError, Res};
use crate::match_driver::ScoreAdjudication;
use crate::opening_book::{BookFormat, BookOrder};
use crate::scheduler::TournamentType;
use crate::sprt::SprtParams;

#[derive(Debug, Deserialize, Default)]
struct AdjudicationToml {
    resign_threshold_cp: Option<i32>,
    resign_move_count: Option<u32>,
    resign_start_ply: Option<u32>,
    draw_threshold_cp: Option<i32>,
    draw_move_count: Option<u32>,
    draw_start_ply: Option<u32>,
    max_plies: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ConfigToml {
    engines: Vec<EngineConfiguration>,
    event_type: Option<String>,
    rounds: Option<u32>,
    games: Option<u32>,
    concurrency: Option<usize>,
    swap: Option<bool>,
    book: Option<PathBuf>,
    book_format: Option<String>,
    book_order: Option<String>,
    sprt: Option<bool>,
    elo0: Option<f64>,
    elo1: Option<f64>,
    alpha: Option<f64>,
    beta: Option<f64>,
    pgn_out: Option<PathBuf>,
    stats_out: Option<PathBuf>,
    event: Option<String>,
    quit_grace_ms: Option<u64>,
    handshake_timeout_ms: Option<u64>,
    recover: Option<bool>,
    #[serde(default)]
    adjudication: AdjudicationToml,
}

pub struct TournamentConfig {
    pub engines: Vec<EngineConfiguration>,
    pub tournament_type: TournamentType,
    pub rounds: u32,
    pub games_per_pairing: u32,
    pub concurrency: usize,
    pub swap: bool,
    pub book: Option<PathBuf>,
    pub book_format: BookFormat,
    pub book_order: BookOrder,
    pub sprt: Option<SprtParams>,
    pub pgn_out: Option<PathBuf>,
    pub stats_out: Option<PathBuf>,
    pub debug: bool,
    pub log_file: Option<PathBuf>,
    pub event: String,
    pub quit_grace_ms: u64,
    pub handshake_timeout_ms: u64,
    pub resign: Option<ScoreAdjudication>,
    pub draw: Option<ScoreAdjudication>,
    pub max_plies: Option<u32>,
    pub recover: bool,
}

fn parse_tournament_type(s: &str) -> Res<TournamentType> {
    match s {
        "round-robin" | "round_robin" | "roundrobin" => Ok(TournamentType::RoundRobin),
        "gauntlet" => Ok(TournamentType::Gauntlet),
        other => Err(AppError::Config(format!("unknown event type '{other}'")).into()),
    }
}

fn parse_book_format(s: &str) -> Res<BookFormat> {
    match s {
        "pgn" => Ok(BookFormat::Pgn),
        "epd" => Ok(BookFormat::Epd),
        other => Err(AppError::Config(format!("unknown book format '{other}'")).into()),
    }
}

fn parse_book_order(s: &str) -> Res<BookOrder> {
    match s {
        "sequential" => Ok(BookOrder::Sequential),
        "random" => Ok(BookOrder::Random),
        other => Err(AppError::Config(format!("unknown book order '{other}'")).into()),
    }
}

impl TournamentConfig {
    pub fn load(cli: &Cli) -> Res<Self> {
        let contents = fs::read_to_string(&cli.config).map_err(|source| AppError::Io { path: cli.config.clone(), source })?;
        let toml_config: ConfigToml = toml::from_str(&contents).map_err(|e| AppError::Config(format!("invalid config file: {e}")))?;

        let tournament_type = match cli.event_type {
            Some(TournamentTypeArg::RoundRobin) => TournamentType::RoundRobin,
            Some(TournamentTypeArg::Gauntlet) => TournamentType::Gauntlet,
            None => match toml_config.event_type.as_deref() {
                Some(s) => parse_tournament_type(s)?,
                None => TournamentType::RoundRobin,
            },
        };
        let rounds = cli.rounds.or(toml_config.rounds).unwrap_or(1);
        let games_per_pairing = cli.games.or(toml_config.games).unwrap_or(1);
        let concurrency = cli.concurrency.or(toml_config.concurrency).unwrap_or(1);
        let swap = cli.swap || toml_config.swap.unwrap_or(false);
        let book = cli.book.clone().or(toml_config.book.clone());
        let book_format = match cli.book_format {
            Some(BookFormatArg::Pgn) => BookFormat::Pgn,
            Some(BookFormatArg::Epd) => BookFormat::Epd,
            None => match toml_config.book_format.as_deref() {
                Some(s) => parse_book_format(s)?,
                None => BookFormat::Pgn,
            },
        };
        let book_order = match cli.book_order {
            Some(BookOrderArg::Sequential) => BookOrder::Sequential,
            Some(BookOrderArg::Random) => BookOrder::Random,
            None => match toml_config.book_order.as_deref() {
                Some(s) => parse_book_order(s)?,
                None => BookOrder::Sequential,
            },
        };
        let sprt_enabled = cli.sprt || toml_config.sprt.unwrap_or(false);
        let sprt = if sprt_enabled {
            Some(SprtParams {
                elo0: cli.elo0.or(toml_config.elo0).unwrap_or(0.0),
                elo1: cli.elo1.or(toml_config.elo1).unwrap_or(5.0),
                alpha: cli.alpha.or(toml_config.alpha).unwrap_or(0.05),
                beta: cli.beta.or(toml_config.beta).unwrap_or(0.05),
            })
        } else {
            None
        };

        let adj = &toml_config.adjudication;
        let resign = match (cli.resign_threshold_cp.or(adj.resign_threshold_cp), cli.resign_move_count.or(adj.resign_move_count)) {
            (Some(threshold), Some(move_count)) => Some(ScoreAdjudication {
                move_count,
                score_threshold_cp: threshold,
                start_after_ply: cli.resign_start_ply.or(adj.resign_start_ply).unwrap_or(0),
            }),
            _ => None,
        };
        let draw = match (cli.draw_threshold_cp.or(adj.draw_threshold_cp), cli.draw_move_count.or(adj.draw_move_count)) {
            (Some(threshold), Some(move_count)) => Some(ScoreAdjudication {
                move_count,
                score_threshold_cp: threshold,
                start_after_ply: cli.draw_start_ply.or(adj.draw_start_ply).unwrap_or(0),
            }),
            _ => None,
        };
        let max_plies = cli.max_plies.or(adj.max_plies);

        let config = Self {
            engines: toml_config.engines,
            tournament_type,
            rounds,
            games_per_pairing,
            concurrency,
            swap,
            book,
            book_format,
            book_order,
            sprt,
            pgn_out: cli.pgn_out.clone().or(toml_config.pgn_out.clone()),
            stats_out: cli.stats_out.clone().or(toml_config.stats_out.clone()),
            debug: cli.debug,
            log_file: cli.log_file.clone(),
            event: cli.event.clone().or(toml_config.event.clone()).unwrap_or_else(|| "arbiter tournament".to_string()),
            quit_grace_ms: cli.quit_grace_ms.or(toml_config.quit_grace_ms).unwrap_or(5_000),
            handshake_timeout_ms: cli.handshake_timeout_ms.or(toml_config.handshake_timeout_ms).unwrap_or(60_000),
            resign,
            draw,
            max_plies,
            recover: cli.recover || toml_config.recover.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Res<()> {
        if self.engines.len() < 2 {
            return Err(AppError::Config("at least two engines are required".to_string()).into());
        }
        let mut seen = std::collections::HashSet::new();
        for engine in &self.engines {
            if !seen.insert(&engine.name) {
                return Err(AppError::Config(format!("duplicate engine name '{}'", engine.name)).into());
            }
        }
        if self.tournament_type == TournamentType::Gauntlet && self.engines.len() < 2 {
            return Err(AppError::Config("gauntlet tournaments need a nominee plus at least one opponent".to_string()).into());
        }
        crate::scheduler::validate_games_and_swap(self.games_per_pairing, self.swap, self.sprt.is_some())?;
        if self.concurrency == 0 {
            return Err(AppError::Config("concurrency must be at least 1".to_string()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_single_engine() {
        let config = TournamentConfig {
            engines: vec![sample_engine("only")],
            tournament_type: TournamentType::RoundRobin,
            rounds: 1,
            games_per_pairing: 1,
            concurrency: 1,
            swap: false,
            book: None,
            book_format: BookFormat::Pgn,
            book_order: BookOrder::Sequential,
            sprt: None,
            pgn_out: None,
            stats_out: None,
            debug: false,
            log_file: None,
            event: "t".to_string(),
            quit_grace_ms: 5000,
            handshake_timeout_ms: 60000,
            resign: None,
            draw: None,
            max_plies: None,
            recover: false,
        };
        assert!(config.validate().is_err());
    }

    fn sample_engine(name: &str) -> EngineConfiguration {
        EngineConfiguration {
            name: name.to_string(),
            cmd: "dummy".to_string(),
            args: vec![],
            working_dir: None,
            uci_options: Default::default(),
            time_control: Default::default(),
            threads_cache: None,
        }
    }
}
