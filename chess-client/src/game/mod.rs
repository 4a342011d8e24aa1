//! 会话逻辑模块
//!
//! 实时对局与存档回放共用的状态机组件，以及会话事件和命令类型。
//! 会话只通过 `handle` 接收事件、返回命令，不直接进行任何 IO。

pub mod candidates;
pub mod history;
pub mod input;
pub mod promotion;
pub mod state;
pub mod view;

pub use candidates::{CandidateSource, MoveCandidateCache};
pub use history::{history_rows, history_text, HistoryCell, HistoryRow};
pub use input::{resolve_click, ClickOutcome, Interaction, Lookup};
pub use promotion::{PendingPromotion, PromotionFlow};
pub use state::BoardSession;
pub use view::{ViewState, ViewStateMachine};

use protocol::{
    AnalysisRequest, ArchiveId, ClientMessage, CodecError, Destination, GameRecord, PieceKind,
    ServerMessage, Square,
};

use crate::board::RenderedBoard;

/// 需要用户确认的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    /// 悔棋
    Undo,
    /// 重新开局
    Reset,
    /// 离开进行中的对局
    Leave,
}

impl ConfirmAction {
    /// 提示文本
    pub fn prompt(&self) -> &'static str {
        match self {
            ConfirmAction::Undo => "Undo the last move?",
            ConfirmAction::Reset => "Start a new game? The current game will be discarded.",
            ConfirmAction::Leave => "Leave the room? The game is still in progress.",
        }
    }
}

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// 面向用户的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// 会话事件
///
/// 带 `generation` 的事件来自某一条实时通道；代数与当前通道不一致的事件一律忽略。
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// 点击逻辑坐标
    SquareClicked(Square),
    /// 点击屏幕坐标（按当前布局换算）
    PointerAt { x: f32, y: f32 },
    /// 前进/后退若干步
    Step(isize),
    /// 跳到指定步
    JumpTo(usize),
    /// 翻转棋盘
    ToggleFlip,
    /// 选定升变棋子
    PromotionChosen(PieceKind),
    /// 取消升变
    PromotionCancelled,
    /// 请求悔棋（需确认）
    RequestUndo,
    /// 请求重新开局（需确认）
    RequestReset,
    /// 请求离开房间
    RequestLeave,
    /// 用户确认
    Confirmed(ConfirmAction),
    /// 用户拒绝
    Declined(ConfirmAction),
    /// 分析结果，携带请求时的局面
    AnalysisResolved {
        position: String,
        square: Square,
        moves: Vec<Destination>,
    },
    /// 分析失败
    AnalysisFailed {
        position: String,
        square: Square,
        reason: String,
    },
    /// 实时通道已连接
    ChannelOpened { generation: u64 },
    /// 收到服务端消息
    Server {
        generation: u64,
        message: ServerMessage,
    },
    /// 收到无法解析的消息
    ProtocolViolation { generation: u64, detail: String },
    /// 实时通道断开
    ChannelClosed { generation: u64, reason: String },
    /// 存档加载完成
    ArchiveLoaded { id: ArchiveId, record: GameRecord },
    /// 存档加载失败
    ArchiveFailed { id: ArchiveId, reason: String },
}

/// 会话产生的命令，由运行时执行
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// 通过实时通道发送
    Send(ClientMessage),
    /// 发起单次分析请求
    Analyze(AnalysisRequest),
    /// 获取存档
    FetchArchive(ArchiveId),
    /// 关闭实时通道
    CloseChannel,
    /// 请求用户确认
    Confirm(ConfirmAction),
    /// 显示升变选择
    PromptPromotion(PendingPromotion),
    /// 关闭升变选择
    DismissPromotion,
    /// 通知用户
    Notify(Notice),
}

/// 一帧渲染数据
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 没有记录时为 None；当前步无法解码时为 Err
    pub board: Option<Result<RenderedBoard, CodecError>>,
    pub history: Vec<HistoryRow>,
    pub status: String,
}

impl Frame {
    /// 从棋盘会话生成
    pub fn from_board(board: &BoardSession, turn_side: Option<protocol::Side>, status: String) -> Self {
        Self {
            board: board
                .board_view(turn_side)
                .map(|view| view.map(|v| v.render())),
            history: board.history_rows(),
            status,
        }
    }
}

/// 会话 trait
pub trait Session {
    /// 处理一个事件，返回需要执行的命令
    fn handle(&mut self, event: SessionEvent) -> Vec<Command>;

    /// 生成当前帧
    fn frame(&self) -> Frame;
}

/// 把分析结果写入棋盘缓存
///
/// 只接受针对当前显示局面、且仍在等待中的格子；其余结果属于过期请求。
pub(crate) fn apply_analysis(
    board: &mut BoardSession,
    position: &str,
    square: Square,
    moves: Vec<Destination>,
) -> bool {
    if board.displayed_position() != Some(position) {
        tracing::warn!("Dropping analysis for {}: position is no longer displayed", square);
        return false;
    }
    if !board
        .candidates_mut()
        .fulfil(square, CandidateSource::Analysis, moves)
    {
        tracing::warn!("Dropping unsolicited analysis for {}", square);
        return false;
    }
    true
}

/// 分析失败：放弃等待中的查询以便重试
pub(crate) fn abandon_analysis(
    board: &mut BoardSession,
    position: &str,
    square: Square,
    reason: &str,
) -> Vec<Command> {
    if board.displayed_position() != Some(position)
        || !board
            .candidates_mut()
            .abandon(square, CandidateSource::Analysis)
    {
        tracing::debug!("Ignoring stale analysis failure for {}: {}", square, reason);
        return Vec::new();
    }
    tracing::error!("Analysis failed for {}: {}", square, reason);
    vec![Command::Notify(Notice::error(format!(
        "Analysis failed: {}",
        reason
    )))]
}
