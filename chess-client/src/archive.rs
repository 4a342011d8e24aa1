//! 存档回放会话
//!
//! 只读：点击棋子发起单次分析请求，从不走棋。

use protocol::{ArchiveId, GameRecord};

use crate::game::{
    abandon_analysis, apply_analysis, resolve_click, BoardSession, ClickOutcome, Command, Frame,
    Interaction, Lookup, Notice, Session, SessionEvent,
};
use crate::storage::RecallStore;

/// 存档回放会话
#[derive(Debug, Default)]
pub struct ArchiveSession {
    board: BoardSession,
    recall: RecallStore,
    /// 正在显示的存档
    current: Option<ArchiveId>,
    /// 正在加载的存档
    loading: Option<ArchiveId>,
}

impl ArchiveSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &BoardSession {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut BoardSession {
        &mut self.board
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn loading(&self) -> Option<&str> {
        self.loading.as_deref()
    }

    pub fn recall(&self) -> &RecallStore {
        &self.recall
    }

    /// 打开存档：已缓存则直接显示，否则发起请求
    pub fn open(&mut self, id: &str) -> Vec<Command> {
        if let Some(record) = self.recall.get(id).cloned() {
            tracing::debug!("Archive {} served from recall store", id);
            self.loading = None;
            self.install(id, record);
            return Vec::new();
        }
        tracing::info!("Loading archive {}", id);
        self.loading = Some(id.to_string());
        vec![Command::FetchArchive(id.to_string())]
    }

    /// 存档被删除：移出缓存，正在显示则卸载
    pub fn evict(&mut self, id: &str) -> bool {
        self.recall.remove(id);
        if self.loading.as_deref() == Some(id) {
            self.loading = None;
        }
        if self.current.as_deref() == Some(id) {
            self.close();
            return true;
        }
        false
    }

    /// 卸载当前存档
    pub fn close(&mut self) {
        self.board.clear();
        self.current = None;
        self.loading = None;
    }

    fn install(&mut self, id: &str, record: GameRecord) {
        tracing::info!("Archive {} loaded ({} moves)", id, record.ply_count());
        self.board.install_record(record, 0);
        self.current = Some(id.to_string());
    }

    fn on_loaded(&mut self, id: ArchiveId, record: GameRecord) -> Vec<Command> {
        if self.loading.as_deref() != Some(id.as_str()) {
            tracing::warn!("Dropping archive {} that is no longer requested", id);
            return Vec::new();
        }
        self.loading = None;
        if let Err(e) = record.validate() {
            tracing::warn!("Archive {} is malformed: {}", id, e);
            return vec![Command::Notify(Notice::error(format!(
                "Cannot open {}: {}",
                id, e
            )))];
        }
        self.recall.insert(id.clone(), record.clone());
        self.install(&id, record);
        Vec::new()
    }

    fn on_click(&mut self, square: protocol::Square) -> Vec<Command> {
        match resolve_click(&mut self.board, square, Interaction::ReadOnly) {
            ClickOutcome::Select {
                lookup: Some(Lookup::Analysis(request)),
                ..
            } => vec![Command::Analyze(request)],
            _ => Vec::new(),
        }
    }

    fn status_line(&self) -> String {
        if let Some(id) = &self.loading {
            return format!("[Archive] loading {}...", id);
        }
        match (&self.current, self.board.displayed_index()) {
            (Some(id), Some(index)) => {
                let mut line = format!(
                    "[Archive] {} | step {} / {}",
                    id,
                    index,
                    self.board.ply_count()
                );
                if let Some(record) = self.board.record() {
                    line.push_str(&format!(" | {}", record.status.describe()));
                }
                line
            }
            _ => "[Archive] no game loaded".to_string(),
        }
    }
}

impl Session for ArchiveSession {
    fn handle(&mut self, event: SessionEvent) -> Vec<Command> {
        match event {
            SessionEvent::SquareClicked(square) => self.on_click(square),
            SessionEvent::PointerAt { x, y } => match self.board.square_at(x, y) {
                Some(square) => self.on_click(square),
                None => Vec::new(),
            },
            SessionEvent::Step(delta) => {
                self.board.step(delta);
                Vec::new()
            }
            SessionEvent::JumpTo(step) => {
                self.board.jump_to(step);
                Vec::new()
            }
            SessionEvent::ToggleFlip => {
                self.board.toggle_flip();
                Vec::new()
            }
            SessionEvent::AnalysisResolved {
                position,
                square,
                moves,
            } => {
                apply_analysis(&mut self.board, &position, square, moves);
                Vec::new()
            }
            SessionEvent::AnalysisFailed {
                position,
                square,
                reason,
            } => abandon_analysis(&mut self.board, &position, square, &reason),
            SessionEvent::ArchiveLoaded { id, record } => self.on_loaded(id, record),
            SessionEvent::ArchiveFailed { id, reason } => {
                if self.loading.as_deref() != Some(id.as_str()) {
                    return Vec::new();
                }
                self.loading = None;
                tracing::error!("Failed to load archive {}: {}", id, reason);
                vec![Command::Notify(Notice::error(format!(
                    "Cannot open {}: {}",
                    id, reason
                )))]
            }
            SessionEvent::RequestUndo | SessionEvent::RequestReset => vec![Command::Notify(
                Notice::info("Archived games are read-only"),
            )],
            SessionEvent::RequestLeave => {
                self.close();
                Vec::new()
            }
            SessionEvent::PromotionChosen(_)
            | SessionEvent::PromotionCancelled
            | SessionEvent::Confirmed(_)
            | SessionEvent::Declined(_)
            | SessionEvent::ChannelOpened { .. }
            | SessionEvent::Server { .. }
            | SessionEvent::ProtocolViolation { .. }
            | SessionEvent::ChannelClosed { .. } => Vec::new(),
        }
    }

    fn frame(&self) -> Frame {
        Frame::from_board(&self.board, None, self.status_line())
    }
}
