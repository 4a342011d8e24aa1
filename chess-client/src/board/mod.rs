//! 棋盘视图模块
//!
//! 负责把网格和交互状态（选中、高亮、翻转）转换为渲染结果，
//! 并把屏幕点击还原为逻辑坐标。

pub mod pieces;
mod render;

pub use pieces::*;
pub use render::*;

use protocol::{Destination, Grid, LastMove, Side, Square};

/// 棋盘布局配置
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardLayout {
    /// 棋盘左上角位置 (屏幕坐标)
    pub origin_x: f32,
    pub origin_y: f32,
    /// 格子大小
    pub cell_size: f32,
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            cell_size: 60.0,
        }
    }
}

impl BoardLayout {
    pub fn new(origin_x: f32, origin_y: f32, cell_size: f32) -> Self {
        Self {
            origin_x,
            origin_y,
            cell_size,
        }
    }

    /// 根据可用区域计算布局（居中）
    pub fn fit(width: f32, height: f32, rows: usize, cols: usize) -> Self {
        if rows == 0 || cols == 0 {
            return Self::default();
        }
        let cell_size = (width / cols as f32).min(height / rows as f32).max(1.0);
        Self {
            origin_x: (width - cell_size * cols as f32) / 2.0,
            origin_y: (height - cell_size * rows as f32) / 2.0,
            cell_size,
        }
    }

    /// 屏幕格子的矩形区域
    pub fn cell_rect(&self, screen: Square) -> Rect {
        Rect {
            x: self.origin_x + screen.col as f32 * self.cell_size,
            y: self.origin_y + screen.row as f32 * self.cell_size,
            size: self.cell_size,
        }
    }

    /// 将屏幕坐标转换为屏幕格子，棋盘外返回 None
    pub fn screen_cell(&self, x: f32, y: f32, rows: usize, cols: usize) -> Option<Square> {
        if self.cell_size <= 0.0 {
            return None;
        }
        let col = ((x - self.origin_x) / self.cell_size).floor();
        let row = ((y - self.origin_y) / self.cell_size).floor();
        if !(0.0..rows as f32).contains(&row) || !(0.0..cols as f32).contains(&col) {
            return None;
        }
        Some(Square::new(row as usize, col as usize))
    }
}

/// 棋盘视图：渲染所需的全部状态
#[derive(Debug, Clone)]
pub struct BoardView {
    pub grid: Grid,
    pub selection: Option<Square>,
    /// 选中格子的候选落点
    pub destinations: Vec<Destination>,
    /// 走子方；只读视图为 None
    pub turn_side: Option<Side>,
    pub flipped: bool,
    pub last_move: Option<LastMove>,
    pub layout: BoardLayout,
}

impl BoardView {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            selection: None,
            destinations: Vec::new(),
            turn_side: None,
            flipped: false,
            last_move: None,
            layout: BoardLayout::default(),
        }
    }

    pub fn with_selection(mut self, selection: Option<Square>, destinations: Vec<Destination>) -> Self {
        self.selection = selection;
        self.destinations = destinations;
        self
    }

    pub fn with_turn_side(mut self, turn_side: Option<Side>) -> Self {
        self.turn_side = turn_side;
        self
    }

    pub fn with_flipped(mut self, flipped: bool) -> Self {
        self.flipped = flipped;
        self
    }

    pub fn with_last_move(mut self, last_move: Option<LastMove>) -> Self {
        self.last_move = last_move;
        self
    }

    pub fn with_layout(mut self, layout: BoardLayout) -> Self {
        self.layout = layout;
        self
    }

    /// 逻辑坐标与屏幕坐标互换（翻转是对合变换）
    fn orient(&self, square: Square) -> Square {
        if self.flipped {
            square
                .flipped(self.grid.rows(), self.grid.cols())
                .unwrap_or(square)
        } else {
            square
        }
    }

    /// 逻辑坐标转屏幕坐标
    pub fn to_screen(&self, square: Square) -> Square {
        self.orient(square)
    }

    /// 屏幕坐标转逻辑坐标
    pub fn to_logical(&self, screen: Square) -> Square {
        self.orient(screen)
    }

    /// 某格的高亮类型
    pub fn highlight(&self, square: Square) -> Option<Highlight> {
        let selection = self.selection?;
        if !self.destinations.iter().any(|d| d.end == square) {
            return None;
        }
        let mover = self.grid.get(selection).map(|p| p.side);
        match (self.turn_side, mover) {
            (Some(turn), Some(side)) if turn != side => Some(Highlight::EnemyReachable),
            _ => Some(Highlight::Reachable),
        }
    }

    fn is_last_move(&self, square: Square) -> bool {
        self.last_move
            .is_some_and(|m| m.start == square || m.end == square)
    }

    /// 渲染
    pub fn render(&self) -> RenderedBoard {
        let rows = self.grid.rows();
        let cols = self.grid.cols();
        let mut squares = Vec::with_capacity(rows * cols);

        for row in 0..rows {
            for col in 0..cols {
                let screen = Square::new(row, col);
                let square = self.to_logical(screen);
                squares.push(RenderedSquare {
                    square,
                    screen,
                    shade: RenderedBoard::shade_of(square),
                    piece: self.grid.get(square),
                    selected: self.selection == Some(square),
                    highlight: self.highlight(square),
                    last_move: self.is_last_move(square),
                    rect: self.layout.cell_rect(screen),
                });
            }
        }

        RenderedBoard::build(rows, cols, self.flipped, squares)
    }

    /// 屏幕点击转换为逻辑坐标，棋盘外返回 None
    pub fn click_at(&self, x: f32, y: f32) -> Option<Square> {
        let screen = self
            .layout
            .screen_cell(x, y, self.grid.rows(), self.grid.cols())?;
        Some(self.to_logical(screen))
    }
}
