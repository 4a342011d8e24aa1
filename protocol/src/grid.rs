//! 棋盘网格

use serde::{Deserialize, Serialize};

use crate::piece::{Piece, Side, Square};

/// 棋盘网格
///
/// 尺寸由局面编码推导，不限于 8x8
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    /// 索引为 row * cols + col
    cells: Vec<Option<Piece>>,
}

impl Grid {
    /// 创建空棋盘
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    /// 从按行排列的格子创建，任意一行长度不一致时返回 None
    pub fn from_rows(rows: Vec<Vec<Option<Piece>>>) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        let row_count = rows.len();
        Some(Self {
            rows: row_count,
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// 行数
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// 列数
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// 位置是否在棋盘内
    pub fn contains(&self, square: Square) -> bool {
        square.row < self.rows && square.col < self.cols
    }

    /// 获取指定位置的棋子
    pub fn get(&self, square: Square) -> Option<Piece> {
        if self.contains(square) {
            self.cells[square.row * self.cols + square.col]
        } else {
            None
        }
    }

    /// 设置指定位置的棋子，越界时忽略
    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        if self.contains(square) {
            self.cells[square.row * self.cols + square.col] = piece;
        }
    }

    /// 某一行的格子
    pub fn row(&self, row: usize) -> &[Option<Piece>] {
        if row < self.rows {
            &self.cells[row * self.cols..(row + 1) * self.cols]
        } else {
            &[]
        }
    }

    /// 获取所有棋子
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(index, cell)| {
            cell.map(|piece| (Square::new(index / self.cols, index % self.cols), piece))
        })
    }

    /// 获取指定阵营的棋子数量
    pub fn count(&self, side: Side) -> usize {
        self.pieces().filter(|(_, piece)| piece.side == side).count()
    }

    /// 是否没有任何棋子
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceKind;

    #[test]
    fn test_get_set() {
        let mut grid = Grid::empty(8, 8);
        let square = Square::new(6, 4);
        let pawn = Piece::new(PieceKind::Pawn, Side::White);

        grid.set(square, Some(pawn));
        assert_eq!(grid.get(square), Some(pawn));
        assert_eq!(grid.count(Side::White), 1);
        assert_eq!(grid.count(Side::Black), 0);

        // 越界写入被忽略
        grid.set(Square::new(8, 0), Some(pawn));
        assert_eq!(grid.get(Square::new(8, 0)), None);
        assert_eq!(grid.pieces().count(), 1);
    }

    #[test]
    fn test_from_rows() {
        let rook = Some(Piece::new(PieceKind::Rook, Side::Black));
        let grid = Grid::from_rows(vec![vec![rook, None, None], vec![None; 3]]).unwrap();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.row(0), &[rook, None, None]);
        assert!(grid.row(5).is_empty());

        assert!(Grid::from_rows(vec![vec![None; 3], vec![None; 2]]).is_none());
    }
}
