//! 棋子定义

use serde::{Deserialize, Serialize};

/// 棋子类型
///
/// 序列化为单个大写字母（`P R N B Q K`），与升变字段一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    /// 兵
    #[serde(rename = "P")]
    Pawn,
    /// 车
    #[serde(rename = "R")]
    Rook,
    /// 马
    #[serde(rename = "N")]
    Knight,
    /// 象
    #[serde(rename = "B")]
    Bishop,
    /// 后
    #[serde(rename = "Q")]
    Queen,
    /// 王
    #[serde(rename = "K")]
    King,
}

impl PieceKind {
    /// 获取 FEN 字符（白方大写，黑方小写）
    pub fn to_fen_char(&self, side: Side) -> char {
        let c = match self {
            PieceKind::Pawn => 'p',
            PieceKind::Rook => 'r',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        match side {
            Side::White => c.to_ascii_uppercase(),
            Side::Black => c,
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<(PieceKind, Side)> {
        let side = if c.is_ascii_uppercase() {
            Side::White
        } else {
            Side::Black
        };
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'r' => PieceKind::Rook,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        Some((kind, side))
    }

    /// 是否可作为升变目标
    pub fn is_promotable(&self) -> bool {
        matches!(
            self,
            PieceKind::Queen | PieceKind::Rook | PieceKind::Bishop | PieceKind::Knight
        )
    }

    /// 显示名称
    pub fn name(&self) -> &'static str {
        match self {
            PieceKind::Pawn => "Pawn",
            PieceKind::Rook => "Rook",
            PieceKind::Knight => "Knight",
            PieceKind::Bishop => "Bishop",
            PieceKind::Queen => "Queen",
            PieceKind::King => "King",
        }
    }
}

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 白方（先手）
    White,
    /// 黑方
    Black,
}

impl Side {
    /// 获取对方阵营
    pub fn opponent(&self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// 显示名称
    pub fn name(&self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }
}

/// 棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub side: Side,
}

impl Piece {
    /// 创建新棋子
    pub const fn new(kind: PieceKind, side: Side) -> Self {
        Self { kind, side }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        self.kind.to_fen_char(self.side)
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Piece> {
        PieceKind::from_fen_char(c).map(|(kind, side)| Piece { kind, side })
    }
}

/// 棋盘格（逻辑坐标，row 0 为编码中的第一行）
///
/// 线上格式为 `[row, col]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct Square {
    pub row: usize,
    pub col: usize,
}

impl Square {
    /// 创建新位置
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// 缓存键，形如 `"row,col"`
    pub fn key(&self) -> String {
        format!("{},{}", self.row, self.col)
    }

    /// 在给定尺寸下翻转（`rows-1-r, cols-1-c`）
    pub fn flipped(&self, rows: usize, cols: usize) -> Option<Square> {
        if self.row < rows && self.col < cols {
            Some(Square::new(rows - 1 - self.row, cols - 1 - self.col))
        } else {
            None
        }
    }
}

impl From<(usize, usize)> for Square {
    fn from((row, col): (usize, usize)) -> Self {
        Square::new(row, col)
    }
}

impl From<Square> for (usize, usize) {
    fn from(square: Square) -> Self {
        (square.row, square.col)
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
