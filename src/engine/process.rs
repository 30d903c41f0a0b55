//! A UCI engine as a child process: handshake, `position`/`go`, bestmove reads, and a
//! `Drop` impl that asks the process to quit cleanly before killing it. A dedicated
//! reader thread feeds every stdout line into a bounded channel so the rest of the
//! adapter never blocks on an engine that stalls mid-line.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};

use crate::engine::{EngineConfiguration, TimeControl};
use crate::error::{AppError, Res};
use crate::output::{Message, Output};

const IO_CHANNEL_CAPACITY: usize = 4096;
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(60_000);
pub const DEFAULT_QUIT_GRACE: Duration = Duration::from_millis(5_000);
const QUIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct UciProcess {
    pub name: String,
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    output: Arc<dyn Output>,
    quit_sent: bool,
}

impl UciProcess {
    pub fn spawn(config: &EngineConfiguration, output: Arc<dyn Output>) -> Res<Self> {
        let mut cmd = Command::new(&config.cmd);
        cmd.args(&config.args).stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::null());
        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }
        let mut child = cmd.spawn().map_err(|source| AppError::Spawn {
            name: config.name.clone(),
            cmd: config.cmd.clone(),
            source,
        })?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        let (tx, rx) = bounded(IO_CHANNEL_CAPACITY);
        let reader_name = config.name.clone();
        std::thread::Builder::new()
            .name(format!("uci-reader-{reader_name}"))
            .spawn(move || {
                let mut reader = BufReader::new(stdout);
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
                            if tx.send(trimmed).is_err() {
                                break;
                            }
                        }
                    }
                }
            })
            .expect("spawning the uci reader thread");

        Ok(Self { name: config.name.clone(), child, stdin, lines: rx, output, quit_sent: false })
    }

    fn send_line(&mut self, line: &str) -> Res<()> {
        self.output.send(Message::Debug(format!("{} << {line}", self.name)));
        writeln!(self.stdin, "{line}").map_err(|source| AppError::Io { path: self.name.clone().into(), source })?;
        self.stdin.flush().map_err(|source| AppError::Io { path: self.name.clone().into(), source })?;
        Ok(())
    }

    fn recv_line(&self, deadline: Instant) -> Res<String> {
        let now = Instant::now();
        let timeout = deadline.saturating_duration_since(now);
        match self.lines.recv_timeout(timeout) {
            Ok(line) => {
                self.output.send(Message::Debug(format!("{} >> {line}", self.name)));
                Ok(line)
            }
            Err(RecvTimeoutError::Timeout) => Err(AppError::ProtocolTimeout {
                name: self.name.clone(),
                expected: "any line".into(),
                timeout_ms: timeout.as_millis() as u64,
            }
            .into()),
            Err(RecvTimeoutError::Disconnected) => Err(AppError::Disconnect { name: self.name.clone() }.into()),
        }
    }

    fn recv_until(&self, deadline: Instant, prefix: &str) -> Res<String> {
        loop {
            let line = self.recv_line(deadline)?;
            if line.trim() == prefix || line.starts_with(prefix) {
                return Ok(line);
            }
        }
    }

    /// Sends `uci` and blocks until `uciok`, collecting nothing else. `id`/`option`
    /// lines are only logged, not parsed, since the tournament core doesn't need to
    /// discover engine-declared options to function.
    pub fn handshake(&mut self, timeout: Duration) -> Res<()> {
        self.send_line("uci")?;
        self.recv_until(Instant::now() + timeout, "uciok")?;
        Ok(())
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> Res<()> {
        self.send_line(&format!("setoption name {name} value {value}"))
    }

    pub fn new_game(&mut self, timeout: Duration) -> Res<()> {
        self.send_line("ucinewgame")?;
        self.isready(timeout)
    }

    pub fn isready(&mut self, timeout: Duration) -> Res<()> {
        self.send_line("isready")?;
        self.recv_until(Instant::now() + timeout, "readyok")?;
        Ok(())
    }

    pub fn set_position(&mut self, start_fen: &str, moves: &[String]) -> Res<()> {
        let mut line = if start_fen == crate::board::STARTPOS_FEN {
            "position startpos".to_string()
        } else {
            format!("position fen {start_fen}")
        };
        if !moves.is_empty() {
            line.push_str(" moves ");
            line.push_str(&moves.join(" "));
        }
        self.send_line(&line)
    }

    /// Builds and sends a `go` command for `tc`, given the running clocks of both
    /// sides. Falls back to `go infinite` for time controls that don't translate.
    pub fn go(&mut self, tc: &TimeControl, white_time: Duration, black_time: Duration, white_inc: Duration, black_inc: Duration) -> Res<()> {
        let line = match tc {
            TimeControl::MoveTime { millis } => format!("go movetime {millis}"),
            TimeControl::Nodes { nodes } => format!("go nodes {nodes}"),
            TimeControl::Depth { plies } => format!("go depth {plies}"),
            TimeControl::Infinite => "go infinite".to_string(),
            TimeControl::Clock { moves_to_go, .. } => {
                let mut parts = vec![
                    format!("wtime {}", white_time.as_millis()),
                    format!("btime {}", black_time.as_millis()),
                    format!("winc {}", white_inc.as_millis()),
                    format!("binc {}", black_inc.as_millis()),
                ];
                if let Some(mtg) = moves_to_go {
                    parts.push(format!("movestogo {mtg}"));
                }
                format!("go {}", parts.join(" "))
            }
        };
        self.send_line(&line)
    }

    /// Blocks until a `bestmove` line arrives, returning the move and optional ponder move.
    pub fn read_bestmove(&self, deadline: Instant) -> Res<(String, Option<String>)> {
        let (mv, ponder, _score) = self.read_bestmove_with_score(deadline)?;
        Ok((mv, ponder))
    }

    /// Same as `read_bestmove`, but also returns the last centipawn score seen on an
    /// `info` line before `bestmove` arrived, for draw/resign adjudication. Mate scores
    /// are mapped to a saturating +/-10000cp so they compare sensibly against thresholds.
    pub fn read_bestmove_with_score(&self, deadline: Instant) -> Res<(String, Option<String>, Option<i32>)> {
        let mut last_score = None;
        loop {
            let line = self.recv_line(deadline)?;
            if let Some(score) = parse_info_score(&line) {
                last_score = Some(score);
                continue;
            }
            let Some(rest) = line.strip_prefix("bestmove") else { continue };
            let mut tokens = rest.split_whitespace();
            let Some(mv) = tokens.next() else {
                return Err(AppError::MalformedUci { name: self.name.clone(), line }.into());
            };
            let ponder = match tokens.next() {
                Some("ponder") => tokens.next().map(str::to_string),
                _ => None,
            };
            return Ok((mv.to_string(), ponder, last_score));
        }
    }

    pub fn stop(&mut self) -> Res<()> {
        self.send_line("stop")
    }

    /// Sends `quit`, waits up to `grace` polling `try_wait`, then kills the process if
    /// it hasn't exited. Safe to call more than once.
    pub fn quit_and_reap(&mut self, grace: Duration) -> Res<()> {
        if !self.quit_sent {
            let _ = self.send_line("quit");
            self.quit_sent = true;
        }
        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return Ok(()),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        break;
                    }
                    std::thread::sleep(QUIT_POLL_INTERVAL);
                }
                Err(source) => return Err(AppError::Io { path: self.name.clone().into(), source }.into()),
            }
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
        Ok(())
    }
}

impl Drop for UciProcess {
    fn drop(&mut self) {
        let _ = self.quit_and_reap(DEFAULT_QUIT_GRACE);
    }
}

/// Picks the `score cp N` or `score mate N` token out of a UCI `info` line, in
/// centipawns from the side-to-move's perspective.
fn parse_info_score(line: &str) -> Option<i32> {
    if !line.starts_with("info") {
        return None;
    }
    let mut tokens = line.split_whitespace().peekable();
    while let Some(tok) = tokens.next() {
        if tok == "score" {
            return match tokens.next()? {
                "cp" => tokens.next()?.parse().ok(),
                "mate" => {
                    let plies: i32 = tokens.next()?.parse().ok()?;
                    Some(if plies >= 0 { 10_000 } else { -10_000 })
                }
                _ => None,
            };
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_centipawn_score() {
        assert_eq!(parse_info_score("info depth 10 score cp 54 nodes 1000"), Some(54));
    }

    #[test]
    fn parses_mate_score_as_saturated_value() {
        assert_eq!(parse_info_score("info depth 5 score mate 3 pv e2e4"), Some(10_000));
        assert_eq!(parse_info_score("info depth 5 score mate -2 pv e2e4"), Some(-10_000));
    }

    #[test]
    fn ignores_lines_without_score() {
        assert_eq!(parse_info_score("info depth 10 nodes 1000"), None);
        assert_eq!(parse_info_score("bestmove e2e4"), None);
    }
}
