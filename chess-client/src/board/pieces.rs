//! 棋子显示

use protocol::{Piece, PieceKind, Side};

/// 棋子的 Unicode 字形
pub fn glyph(piece: Piece) -> char {
    match (piece.side, piece.kind) {
        (Side::White, PieceKind::King) => '♔',
        (Side::White, PieceKind::Queen) => '♕',
        (Side::White, PieceKind::Rook) => '♖',
        (Side::White, PieceKind::Bishop) => '♗',
        (Side::White, PieceKind::Knight) => '♘',
        (Side::White, PieceKind::Pawn) => '♙',
        (Side::Black, PieceKind::King) => '♚',
        (Side::Black, PieceKind::Queen) => '♛',
        (Side::Black, PieceKind::Rook) => '♜',
        (Side::Black, PieceKind::Bishop) => '♝',
        (Side::Black, PieceKind::Knight) => '♞',
        (Side::Black, PieceKind::Pawn) => '♟',
    }
}

/// 棋子描述，如 "White Knight"
pub fn describe(piece: Piece) -> String {
    format!("{} {}", piece.side.name(), piece.kind.name())
}

/// 升变选项的标签，如 "q: Queen"
pub fn promotion_label(kind: PieceKind) -> String {
    format!("{}: {}", kind.to_fen_char(Side::Black), kind.name())
}
