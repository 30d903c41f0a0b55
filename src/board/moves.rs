use std::fmt;

use super::pieces::PieceType;
use super::squares::Square;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MoveFlag {
    Normal,
    DoublePawnPush,
    EnPassant,
    CastleKingside,
    CastleQueenside,
    Promotion(PieceType),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub flag: MoveFlag,
}

impl Move {
    #[must_use]
    pub fn normal(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            flag: MoveFlag::Normal,
        }
    }

    #[must_use]
    pub fn promotion(self) -> Option<PieceType> {
        match self.flag {
            MoveFlag::Promotion(p) => Some(p),
            _ => None,
        }
    }

    /// Parses a UCI move token such as `e2e4` or `e7e8q`. Does not validate legality.
    #[must_use]
    pub fn from_uci(s: &str) -> Option<Self> {
        let bytes: Vec<char> = s.chars().collect();
        if bytes.len() < 4 || bytes.len() > 5 {
            return None;
        }
        let from = Square::from_chars(bytes[0], bytes[1])?;
        let to = Square::from_chars(bytes[2], bytes[3])?;
        let flag = if bytes.len() == 5 {
            MoveFlag::Promotion(PieceType::from_char(bytes[4])?)
        } else {
            MoveFlag::Normal
        };
        Some(Self { from, to, flag })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let MoveFlag::Promotion(p) = self.flag {
            write!(f, "{}", p.to_char(super::pieces::Color::Black))?;
        }
        Ok(())
    }
}
