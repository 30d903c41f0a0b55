//! PGN rendering and a thread-safe append-only file writer, so every worker in the
//! pool can hand finished games to one `FileWriter` without fighting over the file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{AppError, Res};

const MOVES_PER_LINE: usize = 8;

/// Builds one game's PGN text from its header tags and UCI move list. Moves are
/// rendered as-is (no SAN translation) the way a minimal UCI-only arbiter would, since
/// recovering full SAN (check/mate marks, disambiguation) needs nothing the match
/// driver doesn't already have, but isn't needed for re-parsing the result later.
pub struct PgnBuilder {
    pub headers: Vec<(String, String)>,
    pub moves: Vec<String>,
    pub result: String,
}

impl PgnBuilder {
    #[must_use]
    pub fn new(result: String) -> Self {
        Self { headers: Vec::new(), moves: Vec::new(), result }
    }

    pub fn header(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn push_move(&mut self, uci_move: &str) -> &mut Self {
        self.moves.push(uci_move.to_string());
        self
    }

    #[must_use]
    pub fn build(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.headers {
            out.push_str(&format!("[{key} \"{value}\"]\n"));
        }
        out.push('\n');
        let mut in_line = 0usize;
        for (ply, mov) in self.moves.iter().enumerate() {
            if ply % 2 == 0 {
                out.push_str(&format!("{}. ", ply / 2 + 1));
            }
            out.push_str(mov);
            out.push(' ');
            in_line += 1;
            if in_line >= MOVES_PER_LINE {
                out.push('\n');
                in_line = 0;
            }
        }
        out.push_str(&self.result);
        out.push('\n');
        out
    }
}

/// Serializes concurrent appends from every scheduler worker to one PGN (or FEN) file.
pub struct FileWriter {
    file: Mutex<std::fs::File>,
    path: PathBuf,
}

impl FileWriter {
    pub fn create(path: impl Into<PathBuf>) -> Res<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AppError::Io { path: path.clone(), source })?;
        Ok(Self { file: Mutex::new(file), path })
    }

    pub fn write(&self, content: &str) -> Res<()> {
        let mut file = self.file.lock().expect("pgn file writer mutex poisoned");
        file.write_all(content.as_bytes()).map_err(|source| AppError::Io { path: self.path.clone(), source })?;
        file.write_all(b"\n").map_err(|source| AppError::Io { path: self.path.clone(), source })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_numbered_movetext() {
        let mut pgn = PgnBuilder::new("1-0".to_string());
        pgn.header("Event", "Test Match").header("Result", "1-0");
        for mov in ["e2e4", "e7e5", "g1f3"] {
            pgn.push_move(mov);
        }
        let text = pgn.build();
        assert!(text.contains("[Event \"Test Match\"]"));
        assert!(text.contains("1. e2e4 e7e5"));
        assert!(text.trim_end().ends_with("1-0"));
    }

    #[test]
    fn file_writer_appends_across_calls() {
        let dir = std::env::temp_dir().join(format!("arbiter-pgn-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("games.pgn");
        let writer = FileWriter::create(&path).unwrap();
        writer.write("[Event \"a\"]\n1. e4 e5 1-0").unwrap();
        writer.write("[Event \"b\"]\n1. d4 d5 1-0").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"a\""));
        assert!(contents.contains("\"b\""));
        std::fs::remove_dir_all(&dir).ok();
    }
}
