//! 实时对局会话
//!
//! 镜像服务端权威的棋局记录，把用户操作翻译为协议消息。
//! 本地从不修改棋局，所有变化都来自 `init`/`update`。

use protocol::{
    ClientMessage, GameRecord, LastMove, MoveKind, RoomId, ServerMessage, Side, Square,
    DEFAULT_ROOM_ID,
};

use crate::game::{
    abandon_analysis, apply_analysis, resolve_click, BoardSession, CandidateSource, ClickOutcome,
    Command, ConfirmAction, Frame, Interaction, Lookup, Notice, PromotionFlow, Session,
    SessionEvent,
};

/// 连接状态
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// 实时对局会话
#[derive(Debug)]
pub struct LiveSession {
    room_id: RoomId,
    board: BoardSession,
    promotion: PromotionFlow,
    status: ConnectionStatus,
    /// 当前通道代数，每次连接或断开递增
    generation: u64,
    /// 连接建立后立即发送 reset
    reset_on_open: bool,
}

impl Default for LiveSession {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_ID)
    }
}

impl LiveSession {
    pub fn new(room_id: impl Into<RoomId>) -> Self {
        Self {
            room_id: room_id.into(),
            board: BoardSession::new(),
            promotion: PromotionFlow::new(),
            status: ConnectionStatus::Disconnected,
            generation: 0,
            reset_on_open: false,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// 切换房间（需要重新连接）
    pub fn set_room(&mut self, room_id: impl Into<RoomId>) {
        self.room_id = room_id.into();
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn board(&self) -> &BoardSession {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut BoardSession {
        &mut self.board
    }

    pub fn record(&self) -> Option<&GameRecord> {
        self.board.record()
    }

    pub fn promotion(&self) -> &PromotionFlow {
        &self.promotion
    }

    /// 开始一次新连接，返回新通道的代数
    ///
    /// 丢弃记录和全部临时状态，旧通道的迟到事件将被忽略。
    pub fn begin_connect(&mut self, reset: bool) -> u64 {
        self.board.clear();
        self.promotion.cancel();
        self.generation += 1;
        self.status = ConnectionStatus::Connecting;
        self.reset_on_open = reset;
        tracing::info!(
            "Connecting to room {} (generation {})",
            self.room_id,
            self.generation
        );
        self.generation
    }

    /// 本地断开，丢弃记录
    pub fn disconnect(&mut self) -> Vec<Command> {
        self.generation += 1;
        self.status = ConnectionStatus::Disconnected;
        self.reset_on_open = false;
        self.board.clear();
        self.dismiss_promotion()
    }

    /// 是否可以走棋：已连接、跟随最新局面、对局进行中
    pub fn is_interactive(&self) -> bool {
        self.status == ConnectionStatus::Connected
            && !self.board.is_historical()
            && self.record().is_some_and(|r| r.status.is_ongoing())
    }

    /// 当前走子方（仅在可走棋时有意义）
    pub fn side_to_move(&self) -> Option<Side> {
        if self.is_interactive() {
            self.record().map(|r| r.turn)
        } else {
            None
        }
    }

    /// 离开时无需确认：没有记录或尚未走棋
    pub fn can_quietly_exit(&self) -> bool {
        self.record().map_or(true, |r| r.history.is_empty())
    }

    /// 离开房间：已结束的对局先发送 reset 丢弃，然后关闭通道
    pub fn leave(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(record) = self.record() {
            if !record.status.is_ongoing() && !record.history.is_empty() {
                tracing::info!("Discarding finished game in room {}", self.room_id);
                commands.push(Command::Send(ClientMessage::Reset));
            }
        }
        commands.push(Command::CloseChannel);
        commands.extend(self.disconnect());
        commands
    }

    fn dismiss_promotion(&mut self) -> Vec<Command> {
        if self.promotion.cancel() {
            vec![Command::DismissPromotion]
        } else {
            Vec::new()
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "Ignoring event from superseded channel (generation {}, current {})",
                generation,
                self.generation
            );
            return false;
        }
        true
    }

    fn on_server_message(&mut self, message: ServerMessage) -> Vec<Command> {
        tracing::debug!("Received {} message", message.kind());
        match message {
            ServerMessage::Init { state } => self.apply_state(state, true, None),
            ServerMessage::Update { state, last_move } => self.apply_state(state, false, last_move),
            ServerMessage::PieceMoves { pos, moves } => {
                // 候选落点针对最新局面，离开最新局面后不再显示
                if !self.is_interactive() {
                    tracing::warn!("Dropping piece_moves for {}: not on the live position", pos);
                } else if !self
                    .board
                    .candidates_mut()
                    .fulfil(pos, CandidateSource::Channel, moves)
                {
                    tracing::warn!("Dropping unsolicited piece_moves for {}", pos);
                }
                Vec::new()
            }
            ServerMessage::Error { message } => {
                tracing::error!("Server rejected request: {}", message);
                vec![Command::Notify(Notice::error(message))]
            }
        }
    }

    fn apply_state(
        &mut self,
        state: GameRecord,
        reset_view: bool,
        last_move: Option<LastMove>,
    ) -> Vec<Command> {
        if let Err(e) = state.validate() {
            tracing::warn!("Rejecting malformed game state: {}", e);
            return vec![Command::Notify(Notice::error(format!(
                "Protocol error: {}",
                e
            )))];
        }
        self.board.replace_record(state, reset_view, last_move);
        self.dismiss_promotion()
    }

    fn on_click(&mut self, square: Square) -> Vec<Command> {
        if self.promotion.is_pending() {
            tracing::debug!("Click ignored while promotion choice is open");
            return Vec::new();
        }
        let interaction = match self.side_to_move() {
            Some(side) => Interaction::Interactive(side),
            None => Interaction::ReadOnly,
        };

        match resolve_click(&mut self.board, square, interaction) {
            ClickOutcome::Move { start, end, kind } => {
                if kind == MoveKind::Promotion {
                    let pending = self.promotion.begin(start, end);
                    vec![Command::PromptPromotion(pending)]
                } else {
                    vec![Command::Send(ClientMessage::Move {
                        start,
                        end,
                        promotion: None,
                    })]
                }
            }
            ClickOutcome::Select {
                lookup: Some(Lookup::Candidates(pos)),
                ..
            } => vec![Command::Send(ClientMessage::GetMoves { pos })],
            ClickOutcome::Select {
                lookup: Some(Lookup::Analysis(request)),
                ..
            } => vec![Command::Analyze(request)],
            ClickOutcome::Select { lookup: None, .. }
            | ClickOutcome::Deselect
            | ClickOutcome::Ignored => Vec::new(),
        }
    }

    fn on_confirmed(&mut self, action: ConfirmAction) -> Vec<Command> {
        match action {
            ConfirmAction::Undo => {
                if self.status != ConnectionStatus::Connected {
                    return vec![Command::Notify(Notice::error("Not connected"))];
                }
                self.board.candidates_mut().clear();
                vec![Command::Send(ClientMessage::Undo)]
            }
            ConfirmAction::Reset => {
                if self.status != ConnectionStatus::Connected {
                    return vec![Command::Notify(Notice::error("Not connected"))];
                }
                vec![Command::Send(ClientMessage::Reset)]
            }
            ConfirmAction::Leave => self.leave(),
        }
    }

    fn status_line(&self) -> String {
        let connection = match self.status {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => match self.record() {
                Some(record) if !record.status.is_ongoing() => "Finished",
                _ => "Online",
            },
        };
        let mut line = format!("[{}] room {}", connection, self.room_id);

        if let Some(record) = self.record() {
            if record.status.is_ongoing() {
                line.push_str(&format!(" | {} to move", record.turn.name()));
            } else {
                line.push_str(&format!(" | {}", record.status.describe()));
            }
            if self.board.is_historical() {
                let index = self.board.displayed_index().unwrap_or_default();
                line.push_str(&format!(
                    " | viewing history {} / {}",
                    index,
                    record.ply_count()
                ));
            }
        }
        line
    }
}

impl Session for LiveSession {
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
            SessionEvent::PromotionChosen(kind) => match self.promotion.choose(kind) {
                Some(message) => vec![Command::DismissPromotion, Command::Send(message)],
                None => Vec::new(),
            },
            SessionEvent::PromotionCancelled => self.dismiss_promotion(),
            SessionEvent::RequestUndo => {
                if self.record().is_some_and(|r| !r.history.is_empty()) {
                    vec![Command::Confirm(ConfirmAction::Undo)]
                } else {
                    vec![Command::Notify(Notice::info("Nothing to undo"))]
                }
            }
            SessionEvent::RequestReset => vec![Command::Confirm(ConfirmAction::Reset)],
            SessionEvent::RequestLeave => {
                let ongoing = self.record().is_some_and(|r| r.status.is_ongoing());
                if ongoing && !self.can_quietly_exit() {
                    vec![Command::Confirm(ConfirmAction::Leave)]
                } else {
                    self.leave()
                }
            }
            SessionEvent::Confirmed(action) => self.on_confirmed(action),
            SessionEvent::Declined(action) => {
                tracing::debug!("User declined {:?}", action);
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
            SessionEvent::ChannelOpened { generation } => {
                if !self.is_current(generation) {
                    return Vec::new();
                }
                tracing::info!("Joined room {}", self.room_id);
                self.status = ConnectionStatus::Connected;
                if std::mem::take(&mut self.reset_on_open) {
                    vec![Command::Send(ClientMessage::Reset)]
                } else {
                    Vec::new()
                }
            }
            SessionEvent::Server {
                generation,
                message,
            } => {
                if !self.is_current(generation) {
                    return Vec::new();
                }
                self.on_server_message(message)
            }
            SessionEvent::ProtocolViolation { generation, detail } => {
                if !self.is_current(generation) {
                    return Vec::new();
                }
                tracing::warn!("Protocol violation: {}", detail);
                vec![Command::Notify(Notice::error(format!(
                    "Unexpected message from server: {}",
                    detail
                )))]
            }
            SessionEvent::ChannelClosed { generation, reason } => {
                if !self.is_current(generation) {
                    return Vec::new();
                }
                tracing::error!("Connection to room {} lost: {}", self.room_id, reason);
                let mut commands = self.disconnect();
                commands.push(Command::Notify(Notice::error(format!(
                    "Connection lost: {}",
                    reason
                ))));
                commands
            }
            SessionEvent::ArchiveLoaded { .. } | SessionEvent::ArchiveFailed { .. } => Vec::new(),
        }
    }

    fn frame(&self) -> Frame {
        Frame::from_board(&self.board, self.side_to_move(), self.status_line())
    }
}
