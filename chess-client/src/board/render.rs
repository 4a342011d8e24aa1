//! 棋盘渲染结果
//!
//! `RenderedBoard` 是 `BoardView` 的纯函数输出：按屏幕顺序排列的格子，
//! 每个格子带逻辑坐标和可点击区域。

use protocol::{Piece, Square};

use super::pieces::glyph;

/// 屏幕矩形区域
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

impl Rect {
    /// 点是否落在区域内（左上闭、右下开）
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.size && y >= self.y && y < self.y + self.size
    }
}

/// 格子底色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shade {
    Light,
    Dark,
}

impl Shade {
    fn of(square: Square) -> Self {
        if (square.row + square.col) % 2 == 0 {
            Shade::Light
        } else {
            Shade::Dark
        }
    }
}

/// 高亮类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// 可达落点（只读视图中所有落点都用这一类）
    Reachable,
    /// 选中的是非走子方棋子时的落点
    EnemyReachable,
}

/// 单个格子的渲染结果
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSquare {
    /// 逻辑坐标
    pub square: Square,
    /// 屏幕坐标（翻转后）
    pub screen: Square,
    pub shade: Shade,
    pub piece: Option<Piece>,
    pub selected: bool,
    pub highlight: Option<Highlight>,
    /// 上一步的起点或终点
    pub last_move: bool,
    pub rect: Rect,
}

impl RenderedSquare {
    /// 三个字符宽的文本单元
    fn cell_text(&self) -> String {
        match (self.piece, self.selected, self.highlight) {
            (Some(piece), true, _) => format!("[{}]", glyph(piece)),
            (Some(piece), false, Some(Highlight::Reachable)) => format!("({})", glyph(piece)),
            (Some(piece), false, Some(Highlight::EnemyReachable)) => format!("<{}>", glyph(piece)),
            (Some(piece), false, None) => format!(" {} ", glyph(piece)),
            (None, _, Some(Highlight::Reachable)) => " * ".to_string(),
            (None, _, Some(Highlight::EnemyReachable)) => " x ".to_string(),
            (None, _, None) if self.last_move => " - ".to_string(),
            (None, _, None) => " . ".to_string(),
        }
    }
}

/// 整个棋盘的渲染结果
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBoard {
    pub rows: usize,
    pub cols: usize,
    pub flipped: bool,
    /// 按屏幕行优先排列
    pub squares: Vec<RenderedSquare>,
}

impl RenderedBoard {
    pub(crate) fn build(
        rows: usize,
        cols: usize,
        flipped: bool,
        squares: Vec<RenderedSquare>,
    ) -> Self {
        Self {
            rows,
            cols,
            flipped,
            squares,
        }
    }

    pub(crate) fn shade_of(square: Square) -> Shade {
        Shade::of(square)
    }

    /// 按屏幕坐标取格子
    pub fn at_screen(&self, screen: Square) -> Option<&RenderedSquare> {
        if screen.row >= self.rows || screen.col >= self.cols {
            return None;
        }
        self.squares.get(screen.row * self.cols + screen.col)
    }

    /// 按逻辑坐标取格子
    pub fn square(&self, square: Square) -> Option<&RenderedSquare> {
        self.squares.iter().find(|s| s.square == square)
    }

    /// 点击测试，返回逻辑坐标
    pub fn hit(&self, x: f32, y: f32) -> Option<Square> {
        self.squares
            .iter()
            .find(|s| s.rect.contains(x, y))
            .map(|s| s.square)
    }

    /// 被高亮的逻辑坐标
    pub fn highlighted(&self) -> impl Iterator<Item = (Square, Highlight)> + '_ {
        self.squares
            .iter()
            .filter_map(|s| s.highlight.map(|h| (s.square, h)))
    }

    pub fn selected(&self) -> Option<Square> {
        self.squares.iter().find(|s| s.selected).map(|s| s.square)
    }

    /// 渲染为文本棋盘，列标和行标随翻转方向变化
    pub fn to_text(&self) -> String {
        let files: String = (0..self.cols)
            .map(|col| {
                let logical = self
                    .at_screen(Square::new(0, col))
                    .map(|s| s.square.col)
                    .unwrap_or(col);
                format!(" {} ", file_label(logical))
            })
            .collect();

        let mut out = format!("    {}\n", files);
        for row in 0..self.rows {
            let start = row * self.cols;
            let Some(line) = self.squares.get(start..start + self.cols) else {
                break;
            };
            let rank = line
                .first()
                .map(|s| self.rows - s.square.row)
                .unwrap_or_default();
            out.push_str(&format!("{:>3} ", rank));
            for square in line {
                out.push_str(&square.cell_text());
            }
            out.push_str(&format!(" {}\n", rank));
        }
        out.push_str(&format!("    {}\n", files));
        out
    }
}

/// 列标：a..z，超出部分用数字
pub fn file_label(col: usize) -> String {
    match u8::try_from(col) {
        Ok(c) if c < 26 => char::from(b'a' + c).to_string(),
        _ => (col + 1).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains() {
        let rect = Rect {
            x: 10.0,
            y: 20.0,
            size: 5.0,
        };
        assert!(rect.contains(10.0, 20.0));
        assert!(rect.contains(14.9, 24.9));
        assert!(!rect.contains(15.0, 20.0));
        assert!(!rect.contains(9.9, 22.0));
    }

    #[test]
    fn test_shade() {
        assert_eq!(Shade::of(Square::new(0, 0)), Shade::Light);
        assert_eq!(Shade::of(Square::new(0, 1)), Shade::Dark);
        assert_eq!(Shade::of(Square::new(7, 7)), Shade::Light);
    }

    #[test]
    fn test_file_label() {
        assert_eq!(file_label(0), "a");
        assert_eq!(file_label(7), "h");
        assert_eq!(file_label(26), "27");
    }
}
