use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use arbiter::cli::Cli;
use arbiter::config::TournamentConfig;
use arbiter::error::{AppError, Res};
use arbiter::match_driver::Adjudicator;
use arbiter::opening_book::OpeningBook;
use arbiter::output::{FanOutOutput, LoggerOutput, Message, NoneOutput, Output, TextOutput};
use arbiter::pgn::FileWriter;
use arbiter::scheduler::{Scheduler, SchedulerConfig, create_tickets, generate_pairings};
use arbiter::stats::pairing_stats_path;

fn build_output(config: &TournamentConfig) -> Res<Arc<dyn Output>> {
    let mut sinks: Vec<Arc<dyn Output>> = vec![Arc::new(TextOutput::new(config.debug))];
    if let Some(log_path) = &config.log_file {
        sinks.push(Arc::new(LoggerOutput::new(log_path.clone())?));
    }
    if sinks.is_empty() {
        Ok(Arc::new(NoneOutput))
    } else {
        Ok(Arc::new(FanOutOutput::new(sinks)))
    }
}

fn run() -> Res<()> {
    let cli = Cli::parse();
    let config = TournamentConfig::load(&cli)?;
    let output = build_output(&config)?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    let ctrlc_flag = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        ctrlc_flag.store(true, std::sync::atomic::Ordering::SeqCst);
    })
    .map_err(|e| AppError::Config(format!("failed to install Ctrl-C handler: {e}")))?;

    let book = match (&config.book, config.book_format) {
        (Some(path), format) => {
            let seed = config.event.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            OpeningBook::load(path, format, config.book_order, seed)?
        }
        (None, _) => OpeningBook::startpos_only(),
    };
    if book.is_empty() {
        return Err(AppError::Config("opening book resolved to zero positions".to_string()).into());
    }
    let engine_names: Vec<String> = config.engines.iter().map(|e| e.name.clone()).collect();
    let pairings = generate_pairings(&engine_names, config.tournament_type);
    let tickets = create_tickets(&pairings, config.rounds, config.games_per_pairing, config.swap, &book);
    output.send(Message::Info(format!("{}: {} pairings, {} games scheduled", config.event.bold(), pairings.len(), tickets.len())));

    let pgn_writer = match &config.pgn_out {
        Some(path) => Some(Arc::new(FileWriter::create(path.clone())?)),
        None => None,
    };

    let scheduler_config = SchedulerConfig { concurrency: config.concurrency, sprt: config.sprt, recover: config.recover };
    let scheduler = Scheduler::new(
        &scheduler_config,
        config.engines.clone(),
        &pairings,
        config.stats_out.clone(),
        Arc::clone(&stop_flag),
        Arc::clone(&output),
        pgn_writer,
    )?;

    let resign = config.resign;
    let draw = config.draw;
    let max_plies = config.max_plies;
    scheduler.run(tickets, move || {
        if resign.is_none() && draw.is_none() && max_plies.is_none() { None } else { Some(Adjudicator::new(resign, draw, max_plies)) }
    });
    scheduler.shutdown(Duration::from_millis(config.quit_grace_ms));

    for pairing in &pairings {
        let aggregator = scheduler.aggregator(pairing.index);
        let snapshot = aggregator.snapshot();
        output.send(Message::Info(format!(
            "{} vs {}: {}-{}-{}  elo {}  los {}",
            pairing.a, pairing.b, snapshot.wins, snapshot.losses, snapshot.draws, snapshot.elo, snapshot.los
        )));
        if let Some(stats_out) = &config.stats_out {
            aggregator.save_json(&pairing_stats_path(stats_out, &pairing.a, &pairing.b))?;
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", format!("error: {err}").red().bold());
        let code = err.downcast_ref::<AppError>().map_or(1, AppError::exit_code);
        std::process::exit(code);
    }
}
