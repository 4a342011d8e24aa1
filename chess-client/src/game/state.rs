//! 棋盘会话状态
//!
//! 实时对局与存档回放共用的组合：棋局记录、视图状态机、候选落点缓存、选中格和翻转。

use protocol::{CodecError, Fen, GameRecord, Grid, LastMove, Piece, Side, Square};

use super::candidates::MoveCandidateCache;
use super::history::{history_rows, HistoryRow};
use super::view::ViewStateMachine;
use crate::board::{BoardLayout, BoardView};

/// 棋盘会话状态
#[derive(Debug, Clone, Default)]
pub struct BoardSession {
    record: Option<GameRecord>,
    view: ViewStateMachine,
    candidates: MoveCandidateCache,
    selection: Option<Square>,
    last_move: Option<LastMove>,
    flipped: bool,
    layout: BoardLayout,
}

impl BoardSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) -> Option<&GameRecord> {
        self.record.as_ref()
    }

    pub fn view(&self) -> &ViewStateMachine {
        &self.view
    }

    pub fn candidates(&self) -> &MoveCandidateCache {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut MoveCandidateCache {
        &mut self.candidates
    }

    pub fn selection(&self) -> Option<Square> {
        self.selection
    }

    pub fn ply_count(&self) -> usize {
        self.record.as_ref().map_or(0, GameRecord::ply_count)
    }

    /// 用权威记录整体替换
    ///
    /// 总是清空选中和缓存。`reset_view` 为 true 时回到 `Live`，否则保持历史下标。
    pub fn replace_record(
        &mut self,
        record: GameRecord,
        reset_view: bool,
        last_move: Option<LastMove>,
    ) {
        self.invalidate();
        if reset_view {
            self.view.reset();
        } else {
            self.view.on_authoritative_update(record.ply_count());
        }
        self.last_move = last_move;
        self.record = Some(record);
    }

    /// 装入存档记录，从 `start_index` 开始回放
    pub fn install_record(&mut self, record: GameRecord, start_index: usize) {
        self.invalidate();
        self.view.start_at(start_index, record.ply_count());
        self.last_move = None;
        self.record = Some(record);
    }

    /// 丢弃记录及全部临时状态（翻转和布局保留）
    pub fn clear(&mut self) {
        self.invalidate();
        self.view.reset();
        self.last_move = None;
        self.record = None;
    }

    fn invalidate(&mut self) {
        self.selection = None;
        self.candidates.clear();
    }

    pub fn displayed_index(&self) -> Option<usize> {
        let record = self.record.as_ref()?;
        Some(self.view.displayed_index(record.ply_count()))
    }

    /// 当前显示的局面编码
    pub fn displayed_position(&self) -> Option<&str> {
        let record = self.record.as_ref()?;
        record.position_at(self.view.displayed_index(record.ply_count()))
    }

    pub fn is_historical(&self) -> bool {
        !self.view.is_live()
    }

    /// 解码当前显示的局面
    pub fn displayed_grid(&self) -> Option<Result<Grid, CodecError>> {
        self.displayed_position().map(Fen::decode)
    }

    /// 当前显示局面中某格的棋子
    pub fn piece_at(&self, square: Square) -> Result<Option<Piece>, CodecError> {
        match self.displayed_grid() {
            Some(grid) => Ok(grid?.get(square)),
            None => Ok(None),
        }
    }

    /// 相对移动显示的步，切换时清空选中和缓存
    pub fn step(&mut self, delta: isize) -> bool {
        let changed = self.view.step(delta, self.ply_count());
        if changed {
            self.invalidate();
        }
        changed
    }

    /// 跳到指定步，切换时清空选中和缓存
    pub fn jump_to(&mut self, step: usize) -> bool {
        let changed = self.view.jump_to(step, self.ply_count());
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn select(&mut self, square: Square) {
        self.selection = Some(square);
    }

    pub fn deselect(&mut self) -> bool {
        self.selection.take().is_some()
    }

    /// 翻转棋盘（不影响选中）
    pub fn toggle_flip(&mut self) -> bool {
        self.flipped = !self.flipped;
        self.flipped
    }

    pub fn flipped(&self) -> bool {
        self.flipped
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        self.flipped = flipped;
    }

    pub fn set_layout(&mut self, layout: BoardLayout) {
        self.layout = layout;
    }

    /// 生成棋盘视图；没有记录时为 None，当前步无法解码时为 Err
    ///
    /// `turn_side` 仅在可交互时传入。上一步标记只在 `Live` 时显示。
    pub fn board_view(&self, turn_side: Option<Side>) -> Option<Result<BoardView, CodecError>> {
        let grid = match self.displayed_grid()? {
            Ok(grid) => grid,
            Err(e) => return Some(Err(e)),
        };
        let destinations = self
            .selection
            .and_then(|s| self.candidates.get(s))
            .map(<[_]>::to_vec)
            .unwrap_or_default();
        let last_move = if self.view.is_live() {
            self.last_move
        } else {
            None
        };

        Some(Ok(BoardView::new(grid)
            .with_selection(self.selection, destinations)
            .with_turn_side(turn_side)
            .with_flipped(self.flipped)
            .with_last_move(last_move)
            .with_layout(self.layout)))
    }

    /// 屏幕坐标转逻辑坐标，棋盘外或当前步无法解码时为 None
    pub fn square_at(&self, x: f32, y: f32) -> Option<Square> {
        let view = self.board_view(None)?.ok()?;
        view.click_at(x, y)
    }

    pub fn history_rows(&self) -> Vec<HistoryRow> {
        match (&self.record, self.displayed_index()) {
            (Some(record), Some(index)) => history_rows(record, index),
            _ => Vec::new(),
        }
    }
}
