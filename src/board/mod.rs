//! A minimal mailbox chess board: FEN load/format, UCI move parsing and application,
//! legality checking and zobrist hashing. This deliberately isn't bitboard/magic-based.
//! The tournament core only needs a correct arbiter, not a search-grade move generator.

pub mod moves;
pub mod pgn_reader;
pub mod pieces;
pub mod squares;
pub mod zobrist;

use std::fmt;

use pieces::{Color, PieceType};
use squares::{NUM_SQUARES, Square};

pub use moves::{Move, MoveFlag};

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct CastleRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastleRights {
    #[must_use]
    pub fn as_index(self) -> usize {
        (self.white_kingside as usize)
            | (self.white_queenside as usize) << 1
            | (self.black_kingside as usize) << 2
            | (self.black_queenside as usize) << 3
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GameEnd {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl fmt::Display for GameEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameEnd::Checkmate => "checkmate",
            GameEnd::Stalemate => "stalemate",
            GameEnd::InsufficientMaterial => "insufficient mating material",
            GameEnd::FiftyMoveRule => "fifty-move rule",
            GameEnd::ThreefoldRepetition => "threefold repetition",
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Board {
    squares: [Option<(Color, PieceType)>; NUM_SQUARES],
    pub side_to_move: Color,
    pub castling: CastleRights,
    pub ep_square: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    pub hash: u64,
}

impl Board {
    #[must_use]
    pub fn startpos() -> Self {
        Self::from_fen(STARTPOS_FEN).expect("the hardcoded startpos FEN must parse")
    }

    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, PieceType)> {
        self.squares[sq.idx()]
    }

    fn set_piece(&mut self, sq: Square, piece: Option<(Color, PieceType)>) {
        self.squares[sq.idx()] = piece;
    }

    #[must_use]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        (0..NUM_SQUARES as u8).map(Square).find(|&sq| self.piece_at(sq) == Some((color, PieceType::King)))
    }

    // ---- FEN -----------------------------------------------------------------

    pub fn from_fen(fen: &str) -> Result<Self, String> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(format!("FEN '{fen}' does not have enough fields"));
        }
        let mut squares = [None; NUM_SQUARES];
        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(format!("FEN '{fen}' does not have 8 ranks"));
        }
        for (rank_from_top, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_from_top as u8;
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as u8;
                } else {
                    let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
                    let piece = PieceType::from_char(c).ok_or_else(|| format!("invalid piece char '{c}'"))?;
                    if file >= 8 {
                        return Err(format!("FEN '{fen}' overflows a rank"));
                    }
                    squares[Square::from_rank_file(rank, file).idx()] = Some((color, piece));
                    file += 1;
                }
            }
        }
        let side_to_move = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(format!("invalid side to move '{other}'")),
        };
        let mut castling = CastleRights::default();
        if parts[2] != "-" {
            for c in parts[2].chars() {
                match c {
                    'K' => castling.white_kingside = true,
                    'Q' => castling.white_queenside = true,
                    'k' => castling.black_kingside = true,
                    'q' => castling.black_queenside = true,
                    other => return Err(format!("invalid castling char '{other}'")),
                }
            }
        }
        let ep_square = if parts[3] == "-" { None } else { Square::from_str_coord(parts[3]) };
        let halfmove_clock = parts.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);
        let fullmove_number = parts.get(5).and_then(|s| s.parse().ok()).unwrap_or(1);

        let mut board = Self {
            squares,
            side_to_move,
            castling,
            ep_square,
            halfmove_clock,
            fullmove_number,
            hash: 0,
        };
        board.hash = board.compute_zobrist();
        Ok(board)
    }

    #[must_use]
    pub fn as_fen(&self) -> String {
        let mut out = String::new();
        for rank_from_top in 0..8u8 {
            let rank = 7 - rank_from_top;
            let mut empty = 0u8;
            for file in 0..8u8 {
                match self.piece_at(Square::from_rank_file(rank, file)) {
                    None => empty += 1,
                    Some((color, piece)) => {
                        if empty > 0 {
                            out.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        out.push(piece.to_char(color));
                    }
                }
            }
            if empty > 0 {
                out.push((b'0' + empty) as char);
            }
            if rank_from_top != 7 {
                out.push('/');
            }
        }
        out.push(' ');
        out.push(if self.side_to_move.is_white() { 'w' } else { 'b' });
        out.push(' ');
        let c = &self.castling;
        if !(c.white_kingside || c.white_queenside || c.black_kingside || c.black_queenside) {
            out.push('-');
        } else {
            if c.white_kingside {
                out.push('K');
            }
            if c.white_queenside {
                out.push('Q');
            }
            if c.black_kingside {
                out.push('k');
            }
            if c.black_queenside {
                out.push('q');
            }
        }
        out.push(' ');
        match self.ep_square {
            None => out.push('-'),
            Some(sq) => out.push_str(&sq.to_string()),
        }
        out.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        out
    }

    // ---- attacks / legality ----------------------------------------------------

    #[must_use]
    pub fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        // Pawns: a square is attacked by a pawn of `by` if stepping from `sq` in the
        // direction *opposite* that pawn's advance lands on one of its capturing pawns.
        let pawn_dr: i8 = if by.is_white() { -1 } else { 1 };
        for df in [-1i8, 1] {
            if let Some(from) = sq.try_offset(pawn_dr, df) {
                if self.piece_at(from) == Some((by, PieceType::Pawn)) {
                    return true;
                }
            }
        }
        const KNIGHT_OFFSETS: [(i8, i8); 8] =
            [(1, 2), (2, 1), (-1, 2), (-2, 1), (1, -2), (2, -1), (-1, -2), (-2, -1)];
        for (dr, df) in KNIGHT_OFFSETS {
            if let Some(from) = sq.try_offset(dr, df) {
                if self.piece_at(from) == Some((by, PieceType::Knight)) {
                    return true;
                }
            }
        }
        const KING_OFFSETS: [(i8, i8); 8] =
            [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];
        for (dr, df) in KING_OFFSETS {
            if let Some(from) = sq.try_offset(dr, df) {
                if self.piece_at(from) == Some((by, PieceType::King)) {
                    return true;
                }
            }
        }
        const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
        const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
        for (dirs, sliders) in [
            (&BISHOP_DIRS[..], [PieceType::Bishop, PieceType::Queen]),
            (&ROOK_DIRS[..], [PieceType::Rook, PieceType::Queen]),
        ] {
            for &(dr, df) in dirs {
                let mut cur = sq;
                while let Some(next) = cur.try_offset(dr, df) {
                    cur = next;
                    match self.piece_at(cur) {
                        None => continue,
                        Some((c, p)) if c == by && sliders.contains(&p) => return true,
                        Some(_) => break,
                    }
                }
            }
        }
        false
    }

    #[must_use]
    pub fn in_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(sq) => self.is_square_attacked(sq, color.other()),
            None => false,
        }
    }

    /// All pseudo-legal moves: obeys piece movement rules and "can't capture own piece",
    /// but does not check whether the side to move's king ends up in check.
    #[must_use]
    pub fn pseudolegal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(48);
        let us = self.side_to_move;
        for idx in 0..NUM_SQUARES as u8 {
            let from = Square(idx);
            let Some((color, piece)) = self.piece_at(from) else { continue };
            if color != us {
                continue;
            }
            match piece {
                PieceType::Pawn => self.pawn_moves(from, us, &mut moves),
                PieceType::Knight => {
                    const OFFSETS: [(i8, i8); 8] =
                        [(1, 2), (2, 1), (-1, 2), (-2, 1), (1, -2), (2, -1), (-1, -2), (-2, -1)];
                    self.stepper_moves(from, us, &OFFSETS, &mut moves);
                }
                PieceType::King => {
                    const OFFSETS: [(i8, i8); 8] =
                        [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];
                    self.stepper_moves(from, us, &OFFSETS, &mut moves);
                    self.castle_moves(us, &mut moves);
                }
                PieceType::Bishop => {
                    const DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
                    self.slider_moves(from, us, &DIRS, &mut moves);
                }
                PieceType::Rook => {
                    const DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
                    self.slider_moves(from, us, &DIRS, &mut moves);
                }
                PieceType::Queen => {
                    const DIRS: [(i8, i8); 8] =
                        [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];
                    self.slider_moves(from, us, &DIRS, &mut moves);
                }
            }
        }
        moves
    }

    fn stepper_moves(&self, from: Square, us: Color, offsets: &[(i8, i8)], out: &mut Vec<Move>) {
        for &(dr, df) in offsets {
            if let Some(to) = from.try_offset(dr, df) {
                if !matches!(self.piece_at(to), Some((c, _)) if c == us) {
                    out.push(Move::normal(from, to));
                }
            }
        }
    }

    fn slider_moves(&self, from: Square, us: Color, dirs: &[(i8, i8)], out: &mut Vec<Move>) {
        for &(dr, df) in dirs {
            let mut cur = from;
            while let Some(to) = cur.try_offset(dr, df) {
                cur = to;
                match self.piece_at(to) {
                    None => out.push(Move::normal(from, to)),
                    Some((c, _)) => {
                        if c != us {
                            out.push(Move::normal(from, to));
                        }
                        break;
                    }
                }
            }
        }
    }

    fn pawn_moves(&self, from: Square, us: Color, out: &mut Vec<Move>) {
        let dir: i8 = if us.is_white() { 1 } else { -1 };
        let start_rank = if us.is_white() { 1 } else { 6 };
        let promo_rank = if us.is_white() { 7 } else { 0 };
        let push_promos = |to: Square, out: &mut Vec<Move>| {
            if to.rank() == promo_rank {
                for p in [PieceType::Queen, PieceType::Rook, PieceType::Bishop, PieceType::Knight] {
                    out.push(Move { from, to, flag: MoveFlag::Promotion(p) });
                }
            } else {
                out.push(Move::normal(from, to));
            }
        };
        if let Some(one) = from.try_offset(dir, 0) {
            if self.piece_at(one).is_none() {
                push_promos(one, out);
                if from.rank() == start_rank {
                    if let Some(two) = from.try_offset(2 * dir, 0) {
                        if self.piece_at(two).is_none() {
                            out.push(Move { from, to: two, flag: MoveFlag::DoublePawnPush });
                        }
                    }
                }
            }
        }
        for df in [-1i8, 1] {
            let Some(to) = from.try_offset(dir, df) else { continue };
            if matches!(self.piece_at(to), Some((c, _)) if c != us) {
                push_promos(to, out);
            } else if Some(to) == self.ep_square {
                out.push(Move { from, to, flag: MoveFlag::EnPassant });
            }
        }
    }

    fn castle_moves(&self, us: Color, out: &mut Vec<Move>) {
        if self.in_check(us) {
            return;
        }
        let rank = if us.is_white() { 0 } else { 7 };
        let king_from = Square::from_rank_file(rank, 4);
        if self.piece_at(king_from) != Some((us, PieceType::King)) {
            return;
        }
        let (kingside, queenside) =
            if us.is_white() { (self.castling.white_kingside, self.castling.white_queenside) } else { (self.castling.black_kingside, self.castling.black_queenside) };
        let enemy = us.other();
        if kingside {
            let f = Square::from_rank_file(rank, 5);
            let g = Square::from_rank_file(rank, 6);
            let h = Square::from_rank_file(rank, 7);
            if self.piece_at(f).is_none()
                && self.piece_at(g).is_none()
                && self.piece_at(h) == Some((us, PieceType::Rook))
                && !self.is_square_attacked(f, enemy)
                && !self.is_square_attacked(g, enemy)
            {
                out.push(Move { from: king_from, to: g, flag: MoveFlag::CastleKingside });
            }
        }
        if queenside {
            let d = Square::from_rank_file(rank, 3);
            let c = Square::from_rank_file(rank, 2);
            let b = Square::from_rank_file(rank, 1);
            let a = Square::from_rank_file(rank, 0);
            if self.piece_at(d).is_none()
                && self.piece_at(c).is_none()
                && self.piece_at(b).is_none()
                && self.piece_at(a) == Some((us, PieceType::Rook))
                && !self.is_square_attacked(d, enemy)
                && !self.is_square_attacked(c, enemy)
            {
                out.push(Move { from: king_from, to: c, flag: MoveFlag::CastleQueenside });
            }
        }
    }

    #[must_use]
    pub fn is_move_legal(&self, mov: Move) -> bool {
        self.pseudolegal_moves().contains(&mov) && self.try_make_move(mov).is_some()
    }

    #[must_use]
    pub fn legal_moves(&self) -> Vec<Move> {
        self.pseudolegal_moves().into_iter().filter_map(|m| self.try_make_move(m).map(|_| m)).collect()
    }

    /// Applies `mov` without checking legality; returns `None` if the move would leave
    /// the mover's own king in check (i.e. it was pseudo-legal but not legal).
    #[must_use]
    pub fn try_make_move(&self, mov: Move) -> Option<Self> {
        let us = self.side_to_move;
        let new_board = self.make_move_unchecked(mov);
        if new_board.in_check(us) {
            None
        } else {
            Some(new_board)
        }
    }

    /// Applies `mov` and updates the zobrist hash incrementally (XOR deltas), rather than
    /// recomputing from scratch. See `compute_zobrist` for the from-scratch counterpart
    /// used to cross-check the incremental path in tests.
    #[must_use]
    pub fn make_move_unchecked(&self, mov: Move) -> Self {
        let mut board = self.clone();
        let us = self.side_to_move;
        let (_, moving_piece) = self.piece_at(mov.from).expect("make_move_unchecked called on an empty square");
        let keys = &zobrist::ZOBRIST_KEYS;

        // clear old ep file key, it's about to be replaced/cleared
        if let Some(ep) = board.ep_square {
            board.hash ^= keys.ep_file_keys[ep.file() as usize];
        }
        board.ep_square = None;

        board.hash ^= keys.castle_keys[board.castling.as_index()];

        let captured = self.piece_at(mov.to);
        if mov.flag == MoveFlag::EnPassant {
            let captured_sq = Square::from_rank_file(mov.from.rank(), mov.to.file());
            let captured_piece = board.piece_at(captured_sq);
            board.set_piece(captured_sq, None);
            if let Some((c, p)) = captured_piece {
                board.hash ^= keys.piece_key(p, c, captured_sq.idx());
            }
        } else if let Some((c, p)) = captured {
            board.hash ^= keys.piece_key(p, c, mov.to.idx());
        }

        board.hash ^= keys.piece_key(moving_piece, us, mov.from.idx());
        board.set_piece(mov.from, None);
        let placed_piece = mov.promotion().unwrap_or(moving_piece);
        board.set_piece(mov.to, Some((us, placed_piece)));
        board.hash ^= keys.piece_key(placed_piece, us, mov.to.idx());

        match mov.flag {
            MoveFlag::DoublePawnPush => {
                let ep = Square::from_rank_file((mov.from.rank() + mov.to.rank()) / 2, mov.from.file());
                board.ep_square = Some(ep);
                board.hash ^= keys.ep_file_keys[ep.file() as usize];
            }
            MoveFlag::CastleKingside => {
                let rank = mov.from.rank();
                let rook_from = Square::from_rank_file(rank, 7);
                let rook_to = Square::from_rank_file(rank, 5);
                board.hash ^= keys.piece_key(PieceType::Rook, us, rook_from.idx());
                board.set_piece(rook_from, None);
                board.set_piece(rook_to, Some((us, PieceType::Rook)));
                board.hash ^= keys.piece_key(PieceType::Rook, us, rook_to.idx());
            }
            MoveFlag::CastleQueenside => {
                let rank = mov.from.rank();
                let rook_from = Square::from_rank_file(rank, 0);
                let rook_to = Square::from_rank_file(rank, 3);
                board.hash ^= keys.piece_key(PieceType::Rook, us, rook_from.idx());
                board.set_piece(rook_from, None);
                board.set_piece(rook_to, Some((us, PieceType::Rook)));
                board.hash ^= keys.piece_key(PieceType::Rook, us, rook_to.idx());
            }
            _ => {}
        }

        if moving_piece == PieceType::King {
            if us.is_white() {
                board.castling.white_kingside = false;
                board.castling.white_queenside = false;
            } else {
                board.castling.black_kingside = false;
                board.castling.black_queenside = false;
            }
        }
        for sq in [mov.from, mov.to] {
            match sq.0 {
                0 => board.castling.white_queenside = false,
                7 => board.castling.white_kingside = false,
                56 => board.castling.black_queenside = false,
                63 => board.castling.black_kingside = false,
                _ => {}
            }
        }
        board.hash ^= keys.castle_keys[board.castling.as_index()];

        if moving_piece == PieceType::Pawn || captured.is_some() {
            board.halfmove_clock = 0;
        } else {
            board.halfmove_clock += 1;
        }
        if !us.is_white() {
            board.fullmove_number += 1;
        }
        board.side_to_move = us.other();
        board.hash ^= keys.side_to_move_key;
        board
    }

    /// Recomputes the zobrist hash from scratch, iterating every square. Used to verify
    /// the incremental updates performed by `make_move_unchecked` stay consistent.
    #[must_use]
    pub fn compute_zobrist(&self) -> u64 {
        let keys = &zobrist::ZOBRIST_KEYS;
        let mut hash = 0u64;
        for idx in 0..NUM_SQUARES {
            if let Some((color, piece)) = self.squares[idx] {
                hash ^= keys.piece_key(piece, color, idx);
            }
        }
        hash ^= keys.castle_keys[self.castling.as_index()];
        if let Some(ep) = self.ep_square {
            hash ^= keys.ep_file_keys[ep.file() as usize];
        }
        if !self.side_to_move.is_white() {
            hash ^= keys.side_to_move_key;
        }
        hash
    }

    /// Applies a sequence of UCI moves from the current position, used both by the match
    /// driver to replay an opening and by the opening book to validate one.
    pub fn apply_uci_moves(&self, moves: &[String]) -> Result<Self, String> {
        let mut board = self.clone();
        for uci in moves {
            let mov = Move::from_uci(uci).ok_or_else(|| format!("'{uci}' is not a syntactically valid UCI move"))?;
            board = board
                .try_make_move(mov)
                .ok_or_else(|| format!("'{uci}' is not legal in position '{}'", board.as_fen()))?;
        }
        Ok(board)
    }

    #[must_use]
    pub fn has_insufficient_material(&self) -> bool {
        let mut minor_counts = [0u32; 2];
        let mut bishop_square_colors: Vec<(Color, bool)> = Vec::new();
        for idx in 0..NUM_SQUARES {
            let Some((color, piece)) = self.squares[idx] else { continue };
            match piece {
                PieceType::King => {}
                PieceType::Bishop => {
                    let sq = Square(idx as u8);
                    let dark = (sq.rank() + sq.file()) % 2 == 0;
                    bishop_square_colors.push((color, dark));
                    minor_counts[usize::from(!color.is_white())] += 1;
                }
                PieceType::Knight => minor_counts[usize::from(!color.is_white())] += 1,
                _ => return false,
            }
        }
        let total_minors: u32 = minor_counts.iter().sum();
        if total_minors == 0 {
            return true;
        }
        if total_minors == 1 {
            return true;
        }
        if bishop_square_colors.len() == 2 && minor_counts.iter().all(|&c| c <= 1) {
            let (c0, d0) = bishop_square_colors[0];
            let (c1, d1) = bishop_square_colors[1];
            return c0 != c1 && d0 == d1;
        }
        false
    }

    /// Checks end-of-game conditions that need only the current position: checkmate,
    /// stalemate and insufficient material. 50-move and repetition need `hash_history`
    /// and are layered on by the match driver via `check_with_history`.
    #[must_use]
    pub fn terminal_state(&self) -> Option<GameEnd> {
        if self.legal_moves().is_empty() {
            return Some(if self.in_check(self.side_to_move) { GameEnd::Checkmate } else { GameEnd::Stalemate });
        }
        if self.halfmove_clock >= 100 {
            return Some(GameEnd::FiftyMoveRule);
        }
        if self.has_insufficient_material() {
            return Some(GameEnd::InsufficientMaterial);
        }
        None
    }

    /// Same as `terminal_state`, but also checks threefold repetition against a history
    /// of hashes (including the current position's hash).
    #[must_use]
    pub fn check_with_history(&self, hash_history: &[u64]) -> Option<GameEnd> {
        if let Some(end) = self.terminal_state() {
            return Some(end);
        }
        let occurrences = hash_history.iter().filter(|&&h| h == self.hash).count();
        if occurrences >= 3 {
            return Some(GameEnd::ThreefoldRepetition);
        }
        None
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank_from_top in 0..8u8 {
            let rank = 7 - rank_from_top;
            for file in 0..8u8 {
                let c = match self.piece_at(Square::from_rank_file(rank, file)) {
                    None => '.',
                    Some((color, piece)) => piece.to_char(color),
                };
                write!(f, "{c} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_round_trips_through_fen() {
        let board = Board::startpos();
        assert_eq!(board.as_fen(), STARTPOS_FEN);
    }

    #[test]
    fn startpos_has_twenty_legal_moves() {
        let board = Board::startpos();
        assert_eq!(board.legal_moves().len(), 20);
    }

    #[test]
    fn incremental_hash_matches_recompute_scenario_one() {
        let board = Board::startpos();
        assert_eq!(board.hash, board.compute_zobrist());
        let uci_moves = ["e2e4", "d7d5", "e4e5", "f7f5", "e1e2", "e8f7"];
        let mut hashes = Vec::new();
        let mut current = board;
        for uci in uci_moves {
            let mov = Move::from_uci(uci).unwrap();
            current = current.try_make_move(mov).unwrap();
            assert_eq!(current.hash, current.compute_zobrist(), "mismatch after {uci}");
            hashes.push(current.hash);
        }
        let unique: std::collections::HashSet<_> = hashes.iter().collect();
        assert_eq!(unique.len(), hashes.len(), "zobrist collision across scenario 1 plies");
    }

    #[test]
    fn incremental_hash_matches_recompute_scenario_two() {
        let board = Board::startpos();
        let first = ["a2a4", "b7b5", "h2h4", "b5b4", "c2c4"];
        let mut current = board;
        for uci in first {
            current = current.try_make_move(Move::from_uci(uci).unwrap()).unwrap();
        }
        assert_eq!(current.hash, current.compute_zobrist());
        let checkpoint_one = current.hash;
        let second = ["b4c3", "a1a3"];
        for uci in second {
            current = current.try_make_move(Move::from_uci(uci).unwrap()).unwrap();
        }
        assert_eq!(current.hash, current.compute_zobrist());
        assert_ne!(checkpoint_one, current.hash);
    }

    #[test]
    fn en_passant_is_legal_and_clears_captured_pawn() {
        let board = Board::from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3").unwrap();
        let mov = Move::from_uci("e5d6").unwrap();
        assert!(board.is_move_legal(mov));
        let next = board.try_make_move(mov).unwrap();
        assert_eq!(next.piece_at(Square::from_str_coord("d5").unwrap()), None);
    }

    #[test]
    fn castling_moves_the_rook() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mov = Move::from_uci("e1g1").unwrap();
        assert!(board.pseudolegal_moves().contains(&mov));
        let next = board.try_make_move(mov).unwrap();
        assert_eq!(next.piece_at(Square::from_str_coord("f1").unwrap()), Some((Color::White, PieceType::Rook)));
        assert_eq!(next.piece_at(Square::from_str_coord("h1").unwrap()), None);
    }

    #[test]
    fn cannot_castle_through_check() {
        let board = Board::from_fen("r3k2r/8/8/8/8/5b2/8/R3K2R w KQkq - 0 1").unwrap();
        let mov = Move::from_uci("e1g1").unwrap();
        assert!(!board.pseudolegal_moves().contains(&mov) || board.try_make_move(mov).is_none());
    }

    #[test]
    fn fools_mate_is_checkmate() {
        let mut board = Board::startpos();
        for uci in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            board = board.try_make_move(Move::from_uci(uci).unwrap()).unwrap();
        }
        assert_eq!(board.terminal_state(), Some(GameEnd::Checkmate));
    }

    #[test]
    fn bare_kings_are_insufficient_material() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(board.has_insufficient_material());
    }
}
