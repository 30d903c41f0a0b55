//! A small SAN movetext reader, just capable enough to turn a PGN game's moves into a
//! sequence of UCI strings for the opening book. Doesn't attempt to parse PGN tag pairs
//! beyond skipping them; this is a book loader, not a PGN database tool.

use super::pieces::PieceType;
use super::squares::Square;
use super::{Board, Move, MoveFlag};

/// Strips `[Tag "value"]` headers, `{comments}`, `;end-of-line comments`, NAGs (`$3`),
/// move-number prefixes and game results, leaving just whitespace-separated SAN tokens.
#[must_use]
pub fn strip_to_san_tokens(movetext: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(movetext.len());
    let mut chars = movetext.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                for c2 in chars.by_ref() {
                    if c2 == '}' {
                        break;
                    }
                }
            }
            ';' => {
                for c2 in chars.by_ref() {
                    if c2 == '\n' {
                        break;
                    }
                }
            }
            '[' => {
                for c2 in chars.by_ref() {
                    if c2 == ']' {
                        break;
                    }
                }
            }
            _ => cleaned.push(c),
        }
    }
    cleaned
        .split_whitespace()
        .filter(|tok| !tok.starts_with('$'))
        .filter(|tok| !matches!(*tok, "1-0" | "0-1" | "1/2-1/2" | "*"))
        .map(|tok| {
            // drop "12." / "12..." move-number prefixes
            let trimmed = tok.trim_start_matches(|c: char| c.is_ascii_digit());
            let trimmed = trimmed.strip_prefix("...").or_else(|| trimmed.strip_prefix('.')).unwrap_or(trimmed);
            trimmed.to_string()
        })
        .filter(|tok| !tok.is_empty())
        .collect()
}

/// Resolves one SAN token against `board`'s legal moves and returns the matching move.
pub fn resolve_san(board: &Board, san: &str) -> Result<Move, String> {
    let san = san.trim_end_matches(['+', '#']);
    if san == "O-O" || san == "0-0" {
        return board
            .legal_moves()
            .into_iter()
            .find(|m| m.flag == MoveFlag::CastleKingside)
            .ok_or_else(|| format!("no legal kingside castle for '{san}'"));
    }
    if san == "O-O-O" || san == "0-0-0" {
        return board
            .legal_moves()
            .into_iter()
            .find(|m| m.flag == MoveFlag::CastleQueenside)
            .ok_or_else(|| format!("no legal queenside castle for '{san}'"));
    }

    let (san, promotion) = match san.split_once('=') {
        Some((base, promo)) => (base, PieceType::from_char(promo.chars().next().unwrap_or('q'))),
        None => (san, None),
    };

    let mut rest = san;
    let piece = if let Some(c) = rest.chars().next().filter(|c| c.is_ascii_uppercase()) {
        rest = &rest[1..];
        PieceType::from_char(c).ok_or_else(|| format!("unknown piece letter in SAN '{san}'"))?
    } else {
        PieceType::Pawn
    };
    rest = rest.trim_start_matches('x');
    if rest.len() < 2 {
        return Err(format!("SAN token '{san}' too short to contain a destination square"));
    }
    let dest_str = &rest[rest.len() - 2..];
    let dest = Square::from_str_coord(dest_str).ok_or_else(|| format!("invalid destination square in SAN '{san}'"))?;
    let disambiguation = &rest[..rest.len() - 2];
    let disambig_file = disambiguation.chars().find(|c| c.is_ascii_lowercase());
    let disambig_rank = disambiguation.chars().find(|c| c.is_ascii_digit());

    let candidates: Vec<Move> = board
        .legal_moves()
        .into_iter()
        .filter(|m| {
            let Some((_, p)) = board.piece_at(m.from) else { return false };
            if p != piece || m.to != dest {
                return false;
            }
            if let Some(f) = disambig_file {
                if m.from.file() != (f as u8 - b'a') {
                    return false;
                }
            }
            if let Some(r) = disambig_rank {
                if m.from.rank() != (r as u8 - b'1') {
                    return false;
                }
            }
            match (m.promotion(), promotion) {
                (Some(a), Some(b)) => a == b,
                (None, None) => true,
                _ => false,
            }
        })
        .collect();

    match candidates.as_slice() {
        [single] => Ok(*single),
        [] => Err(format!("no legal move matches SAN '{san}' in position '{}'", board.as_fen())),
        _ => Err(format!("SAN '{san}' is ambiguous in position '{}'", board.as_fen())),
    }
}

/// Replays an entire PGN movetext from the start position, returning UCI moves.
pub fn movetext_to_uci(movetext: &str) -> Result<Vec<String>, String> {
    let mut board = Board::startpos();
    let mut out = Vec::new();
    for san in strip_to_san_tokens(movetext) {
        let mov = resolve_san(&board, &san)?;
        out.push(mov.to_string());
        board = board.try_make_move(mov).ok_or_else(|| format!("SAN '{san}' resolved to an illegal move"))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_simple_italian_opening() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5";
        let uci = movetext_to_uci(pgn).unwrap();
        assert_eq!(uci, vec!["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5"]);
    }

    #[test]
    fn reads_castling_and_captures() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 4. Ba4 Nf6 5. O-O Be7 6. Re1 b5 7. Bxc6";
        let uci = movetext_to_uci(pgn).unwrap();
        assert_eq!(uci.last().unwrap(), "b5c6");
        assert!(uci.contains(&"e1g1".to_string()));
    }

    #[test]
    fn strips_headers_and_comments() {
        let pgn = "[Event \"Test\"]\n[Site \"?\"]\n\n1. e4 {good move} e5 2. Nf3 $1 Nc6 1-0";
        let tokens = strip_to_san_tokens(pgn);
        assert_eq!(tokens, vec!["e4", "e5", "Nf3", "Nc6"]);
    }
}
