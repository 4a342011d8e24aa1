//! 局面编码（FEN 棋子摆放字段）的解析和生成
//!
//! 只处理摆放字段：`/` 分隔各行，数字表示连续空格，字母表示棋子，
//! 大写为白方、小写为黑方。摆放字段之后的其他字段（走子方、易位权等）被忽略。
//!
//! 示例：
//! `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1`

use crate::constants::MAX_BOARD_COLUMNS;
use crate::error::CodecError;
use crate::grid::Grid;
use crate::piece::{Piece, Square};

/// 初始局面 FEN
pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// 空棋盘
pub const EMPTY_FEN: &str = "8/8/8/8/8/8/8/8";

/// FEN 格式处理
pub struct Fen;

impl Fen {
    /// 取出摆放字段
    pub fn placement(position: &str) -> &str {
        position.split_whitespace().next().unwrap_or("")
    }

    /// 解析局面编码为网格
    ///
    /// 行数为分段数，列数由第一行推导，其余各行必须与之相同。
    pub fn decode(position: &str) -> Result<Grid, CodecError> {
        let placement = Self::placement(position);
        if placement.is_empty() {
            return Err(CodecError::Empty);
        }

        let mut rows: Vec<Vec<Option<Piece>>> = Vec::new();
        let mut expected = None;

        for (rank, segment) in placement.split('/').enumerate() {
            let row = Self::decode_rank(rank, segment)?;
            match expected {
                None => expected = Some(row.len()),
                Some(cols) if cols != row.len() => {
                    return Err(CodecError::MalformedPosition {
                        rank,
                        expected: cols,
                        actual: row.len(),
                    });
                }
                Some(_) => {}
            }
            rows.push(row);
        }

        let cols = expected.unwrap_or(0);
        Grid::from_rows(rows).ok_or(CodecError::MalformedPosition {
            rank: 0,
            expected: cols,
            actual: 0,
        })
    }

    /// 解析一行
    fn decode_rank(rank: usize, segment: &str) -> Result<Vec<Option<Piece>>, CodecError> {
        let mut row = Vec::new();
        let mut run: Option<usize> = None;

        for c in segment.chars() {
            if let Some(digit) = c.to_digit(10) {
                // 连续数字视为一个多位数（宽于 9 列的棋盘）
                let count = run.unwrap_or(0) * 10 + digit as usize;
                if count > MAX_BOARD_COLUMNS {
                    return Err(Self::overflow(rank));
                }
                run = Some(count);
                continue;
            }

            if let Some(count) = run.take() {
                Self::push_empty(&mut row, count, rank)?;
            }

            let piece =
                Piece::from_fen_char(c).ok_or(CodecError::InvalidPiece { rank, symbol: c })?;
            if row.len() >= MAX_BOARD_COLUMNS {
                return Err(Self::overflow(rank));
            }
            row.push(Some(piece));
        }

        if let Some(count) = run {
            Self::push_empty(&mut row, count, rank)?;
        }

        Ok(row)
    }

    fn push_empty(
        row: &mut Vec<Option<Piece>>,
        count: usize,
        rank: usize,
    ) -> Result<(), CodecError> {
        let len = row.len() + count;
        if len > MAX_BOARD_COLUMNS {
            return Err(Self::overflow(rank));
        }
        row.resize(len, None);
        Ok(())
    }

    fn overflow(rank: usize) -> CodecError {
        CodecError::ColumnOverflow {
            rank,
            max: MAX_BOARD_COLUMNS,
        }
    }

    /// 将网格转换为摆放字段
    ///
    /// 零行网格编码为空串，`decode` 会以 `CodecError::Empty` 拒绝，不能往返。
    pub fn encode(grid: &Grid) -> String {
        let mut rows = Vec::with_capacity(grid.rows());

        for row in 0..grid.rows() {
            let mut out = String::new();
            let mut empty_count = 0;

            for col in 0..grid.cols() {
                if let Some(piece) = grid.get(Square::new(row, col)) {
                    if empty_count > 0 {
                        out.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    out.push(piece.to_fen_char());
                } else {
                    empty_count += 1;
                }
            }

            if empty_count > 0 {
                out.push_str(&empty_count.to_string());
            }

            rows.push(out);
        }

        rows.join("/")
    }

    /// 解析初始局面
    pub fn initial() -> Grid {
        // 常量输入，解析不会失败
        Self::decode(INITIAL_FEN).unwrap_or_else(|_| Grid::empty(8, 8))
    }
}
