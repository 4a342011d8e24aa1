//! 点击处理
//!
//! 按顺序尝试：走棋 → 选中棋子 → 取消选中。

use protocol::{AnalysisRequest, MoveKind, Side, Square};

use super::candidates::CandidateSource;
use super::state::BoardSession;

/// 当前局面是否允许走棋
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// 可走棋，携带走子方
    Interactive(Side),
    /// 只读（历史步、已结束对局、存档）
    ReadOnly,
}

/// 选中棋子后需要发起的查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// 通过实时通道请求候选落点
    Candidates(Square),
    /// 单次分析请求
    Analysis(AnalysisRequest),
}

/// 点击结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// 走棋（升变需再选择棋子）
    Move {
        start: Square,
        end: Square,
        kind: MoveKind,
    },
    /// 选中棋子，可能需要发起查询
    Select {
        square: Square,
        lookup: Option<Lookup>,
    },
    /// 取消选中
    Deselect,
    /// 没有可显示的局面或坐标不在棋盘内
    Ignored,
}

/// 处理一次点击
pub fn resolve_click(
    board: &mut BoardSession,
    square: Square,
    interaction: Interaction,
) -> ClickOutcome {
    let grid = match board.displayed_grid() {
        Some(Ok(grid)) => grid,
        Some(Err(e)) => {
            tracing::warn!("Click ignored, displayed position cannot be decoded: {}", e);
            return ClickOutcome::Ignored;
        }
        None => return ClickOutcome::Ignored,
    };
    if !grid.contains(square) {
        return ClickOutcome::Ignored;
    }

    // 1. 点击已选中棋子的候选落点
    if let (Interaction::Interactive(turn), Some(selected)) = (interaction, board.selection()) {
        let mover = grid.get(selected).map(|p| p.side);
        if let Some(dest) = board.candidates().destination(selected, square) {
            if mover == Some(turn) {
                board.deselect();
                return ClickOutcome::Move {
                    start: selected,
                    end: square,
                    kind: dest.kind,
                };
            }
        }
    }

    // 2. 点击棋子
    if grid.get(square).is_some() {
        if board.selection() == Some(square) {
            board.deselect();
            return ClickOutcome::Deselect;
        }
        board.select(square);

        let source = match interaction {
            Interaction::Interactive(_) => CandidateSource::Channel,
            Interaction::ReadOnly => CandidateSource::Analysis,
        };
        let lookup = if board.candidates_mut().request(square, source) {
            match interaction {
                Interaction::Interactive(_) => Some(Lookup::Candidates(square)),
                Interaction::ReadOnly => board.displayed_position().map(|fen| {
                    Lookup::Analysis(AnalysisRequest {
                        fen: fen.to_string(),
                        pos: square,
                    })
                }),
            }
        } else {
            None
        };
        return ClickOutcome::Select { square, lookup };
    }

    // 3. 点击空格
    board.deselect();
    ClickOutcome::Deselect
}
