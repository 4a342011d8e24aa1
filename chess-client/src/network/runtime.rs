//! 客户端运行时
//!
//! 单消费者事件循环：每次取一个 `SessionEvent` 交给对应会话处理，
//! 执行返回的命令，然后渲染当前会话。网络请求在后台任务中完成，
//! 结果作为新事件排队，因此同一通道上的消息严格按到达顺序处理。

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;

use protocol::{
    ArchiveId, Connector, NetworkConfig, RoomId, SaveRequest, PROMOTION_KINDS,
};

use super::connection::LiveChannel;
use super::session::LiveSession;
use crate::api::{ApiError, ArchiveApi};
use crate::archive::ArchiveSession;
use crate::game::{Command, Notice, Session, SessionEvent};
use crate::ui::Frontend;

/// 事件队列容量
const EVENT_QUEUE_CAPACITY: usize = 256;

/// 当前显示的会话
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionKind {
    #[default]
    Live,
    Archive,
}

/// 事件的处理方
enum Route {
    Live,
    Archive,
    Both,
    Active,
}

impl Route {
    fn of(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::ChannelOpened { .. }
            | SessionEvent::Server { .. }
            | SessionEvent::ProtocolViolation { .. }
            | SessionEvent::ChannelClosed { .. } => Route::Live,
            SessionEvent::ArchiveLoaded { .. } | SessionEvent::ArchiveFailed { .. } => {
                Route::Archive
            }
            // 分析结果带局面，两个会话各自判断是否属于自己
            SessionEvent::AnalysisResolved { .. } | SessionEvent::AnalysisFailed { .. } => {
                Route::Both
            }
            _ => Route::Active,
        }
    }
}

/// 默认存档名，如 `game_2024_01_31_20_15_00`
pub fn default_save_name(at: NaiveDateTime) -> String {
    at.format("game_%Y_%m_%d_%H_%M_%S").to_string()
}

/// 客户端运行时
pub struct ClientRuntime<A, F> {
    live: LiveSession,
    archive: ArchiveSession,
    active: SessionKind,
    channel: Option<LiveChannel>,
    api: Arc<A>,
    frontend: F,
    config: NetworkConfig,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
}

impl<A, F> ClientRuntime<A, F>
where
    A: ArchiveApi + 'static,
    F: Frontend,
{
    pub fn new(config: NetworkConfig, room_id: impl Into<RoomId>, api: A, frontend: F) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        Self {
            live: LiveSession::new(room_id),
            archive: ArchiveSession::new(),
            active: SessionKind::Live,
            channel: None,
            api: Arc::new(api),
            frontend,
            config,
            events_tx,
            events_rx,
        }
    }

    pub fn live(&self) -> &LiveSession {
        &self.live
    }

    pub fn archive(&self) -> &ArchiveSession {
        &self.archive
    }

    pub fn active(&self) -> SessionKind {
        self.active
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// 设置两个会话的棋盘朝向
    pub fn set_flipped(&mut self, flipped: bool) {
        self.live.board_mut().set_flipped(flipped);
        self.archive.board_mut().set_flipped(flipped);
    }

    /// 连接实时通道，先拆除已有通道
    pub async fn connect<C: Connector>(&mut self, connector: &C, reset: bool) -> protocol::Result<()> {
        self.close_channel().await;
        let generation = self.live.begin_connect(reset);
        self.active = SessionKind::Live;
        self.render();

        let opened = match self.config.live_url(self.live.room_id()) {
            Ok(url) => LiveChannel::open(connector, &url, generation, self.events_tx.clone()).await,
            Err(e) => Err(e),
        };
        match opened {
            Ok(channel) => {
                self.channel = Some(channel);
                Ok(())
            }
            Err(e) => {
                self.dispatch(SessionEvent::ChannelClosed {
                    generation,
                    reason: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    /// 断开实时通道并丢弃实时棋局
    pub async fn disconnect(&mut self) {
        self.close_channel().await;
        let commands = self.live.disconnect();
        self.execute(commands).await;
        self.render();
    }

    async fn close_channel(&mut self) {
        if let Some(channel) = self.channel.take() {
            tracing::debug!("Closing live channel (generation {})", channel.generation());
            channel.close().await;
        }
    }

    /// 切换显示的会话
    pub fn show(&mut self, kind: SessionKind) {
        self.active = kind;
        self.render();
    }

    /// 打开存档并切换到回放
    pub async fn open_archive(&mut self, id: &str) {
        self.active = SessionKind::Archive;
        let commands = self.archive.open(id);
        self.execute(commands).await;
        self.render();
    }

    /// 存档列表
    pub async fn list_archives(&mut self) -> Result<Vec<ArchiveId>, ApiError> {
        let result = self.api.list_archives().await;
        if let Err(e) = &result {
            tracing::error!("Failed to list archives: {}", e);
            self.frontend
                .notify(&Notice::error(format!("Cannot list archives: {}", e)));
        }
        result
    }

    /// 删除存档，成功后移出召回缓存
    pub async fn delete_archive(&mut self, id: &str) -> Result<(), ApiError> {
        match self.api.delete_archive(id).await {
            Ok(message) => {
                tracing::info!("Archive {} deleted", id);
                let unloaded = self.archive.evict(id);
                self.frontend.notify(&Notice::info(message));
                if unloaded {
                    self.render();
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to delete archive {}: {}", id, e);
                self.frontend
                    .notify(&Notice::error(format!("Cannot delete {}: {}", id, e)));
                Err(e)
            }
        }
    }

    /// 保存实时对局，未给出名字时按当前时间生成
    pub async fn save_game(&mut self, name: Option<String>) -> Result<(), ApiError> {
        if self.live.record().is_none() {
            self.frontend.notify(&Notice::error("No live game to save"));
            return Ok(());
        }
        let filename = name.unwrap_or_else(|| default_save_name(Local::now().naive_local()));
        let request = SaveRequest {
            filename,
            screenshot: None,
        };

        match self.api.save_game(self.live.room_id(), &request).await {
            Ok(message) => {
                tracing::info!("Saved room {} as {}", self.live.room_id(), request.filename);
                self.frontend.notify(&Notice::info(message));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to save room {}: {}", self.live.room_id(), e);
                self.frontend
                    .notify(&Notice::error(format!("Cannot save game: {}", e)));
                Err(e)
            }
        }
    }

    /// 等待下一个排队的事件
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// 处理所有已排队的事件，返回处理数量
    pub async fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event).await;
            handled += 1;
        }
        handled
    }

    /// 处理一个事件：交给会话、执行命令、渲染
    pub async fn dispatch(&mut self, event: SessionEvent) {
        if let SessionEvent::ChannelClosed { generation, .. } = &event {
            if self.channel.as_ref().map(LiveChannel::generation) == Some(*generation) {
                // 通道任务已退出
                self.channel = None;
            }
        }

        let commands = match Route::of(&event) {
            Route::Live => self.live.handle(event),
            Route::Archive => self.archive.handle(event),
            Route::Both => {
                let mut commands = self.live.handle(event.clone());
                commands.extend(self.archive.handle(event));
                commands
            }
            Route::Active => match self.active {
                SessionKind::Live => self.live.handle(event),
                SessionKind::Archive => self.archive.handle(event),
            },
        };
        self.execute(commands).await;
        self.render();
    }

    async fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Send(msg) => {
                    let sent = match &self.channel {
                        Some(channel) => channel.send(msg).await,
                        None => false,
                    };
                    if !sent {
                        tracing::warn!("Dropping outbound message: not connected");
                        self.frontend.notify(&Notice::error("Not connected"));
                    }
                }
                Command::Analyze(request) => {
                    let api = Arc::clone(&self.api);
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        let event = match api.analyze(&request).await {
                            Ok(response) => {
                                if response.pos != request.pos {
                                    tracing::warn!(
                                        "Analysis answered {} for request {}",
                                        response.pos,
                                        request.pos
                                    );
                                }
                                SessionEvent::AnalysisResolved {
                                    position: request.fen,
                                    square: request.pos,
                                    moves: response.moves,
                                }
                            }
                            Err(e) => SessionEvent::AnalysisFailed {
                                position: request.fen,
                                square: request.pos,
                                reason: e.to_string(),
                            },
                        };
                        let _ = events.send(event).await;
                    });
                }
                Command::FetchArchive(id) => {
                    let api = Arc::clone(&self.api);
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        let event = match api.fetch_archive(&id).await {
                            Ok(record) => SessionEvent::ArchiveLoaded { id, record },
                            Err(e) => SessionEvent::ArchiveFailed {
                                id,
                                reason: e.to_string(),
                            },
                        };
                        let _ = events.send(event).await;
                    });
                }
                Command::CloseChannel => self.close_channel().await,
                Command::Confirm(action) => self.frontend.ask(action),
                Command::PromptPromotion(pending) => {
                    self.frontend.prompt_promotion(pending, &PROMOTION_KINDS)
                }
                Command::DismissPromotion => self.frontend.dismiss_promotion(),
                Command::Notify(notice) => self.frontend.notify(&notice),
            }
        }
    }

    fn render(&mut self) {
        let frame = match self.active {
            SessionKind::Live => self.live.frame(),
            SessionKind::Archive => self.archive.frame(),
        };
        self.frontend.render(&frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use protocol::{
        AnalysisRequest, AnalysisResponse, ClientMessage, Destination, GameRecord, PieceKind,
        ServerMessage, Square, INITIAL_FEN,
    };

    use crate::game::{ConfirmAction, Frame, PendingPromotion};
    use crate::network::testing::{memory, MemoryConnector};
    use crate::network::ConnectionStatus;
    use crate::ui::{Confirmer, Notifier, Presenter};

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Frame>,
        notices: Vec<Notice>,
        asked: Vec<ConfirmAction>,
        prompts: Vec<PendingPromotion>,
    }

    impl Notifier for Recorder {
        fn notify(&mut self, notice: &Notice) {
            self.notices.push(notice.clone());
        }
    }

    impl Confirmer for Recorder {
        fn ask(&mut self, action: ConfirmAction) {
            self.asked.push(action);
        }
    }

    impl Presenter for Recorder {
        fn render(&mut self, frame: &Frame) {
            self.frames.push(frame.clone());
        }

        fn prompt_promotion(&mut self, pending: PendingPromotion, _choices: &[PieceKind]) {
            self.prompts.push(pending);
        }

        fn dismiss_promotion(&mut self) {}
    }

    #[derive(Default)]
    struct FakeApi {
        archives: HashMap<String, GameRecord>,
        fetches: Mutex<usize>,
        saved: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ArchiveApi for FakeApi {
        async fn list_archives(&self) -> Result<Vec<ArchiveId>, ApiError> {
            let mut ids: Vec<_> = self.archives.keys().cloned().collect();
            ids.sort();
            Ok(ids)
        }

        async fn fetch_archive(&self, id: &str) -> Result<GameRecord, ApiError> {
            *self.fetches.lock().unwrap() += 1;
            self.archives.get(id).cloned().ok_or(ApiError::Rejected {
                reason: "Game not found".to_string(),
            })
        }

        async fn delete_archive(&self, id: &str) -> Result<String, ApiError> {
            if self.archives.contains_key(id) {
                Ok(format!("Deleted {}", id))
            } else {
                Err(ApiError::Rejected {
                    reason: "Game not found".to_string(),
                })
            }
        }

        async fn save_game(&self, room: &str, request: &SaveRequest) -> Result<String, ApiError> {
            self.saved
                .lock()
                .unwrap()
                .push((room.to_string(), request.filename.clone()));
            Ok("Saved".to_string())
        }

        async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, ApiError> {
            Ok(AnalysisResponse {
                pos: request.pos,
                moves: vec![Destination::normal(Square::new(4, 4))],
            })
        }
    }

    fn archived() -> GameRecord {
        let mut record = GameRecord::new(INITIAL_FEN);
        record.push("e4", "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1");
        record
    }

    fn runtime() -> ClientRuntime<FakeApi, Recorder> {
        let mut api = FakeApi::default();
        api.archives.insert("game_1".to_string(), archived());
        ClientRuntime::new(NetworkConfig::default(), "default", api, Recorder::default())
    }

    #[test]
    fn test_default_save_name() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(20, 5, 9)
            .unwrap();
        assert_eq!(default_save_name(at), "game_2024_01_31_20_05_09");
    }

    #[tokio::test]
    async fn test_archive_load_and_analysis() {
        let mut rt = runtime();
        rt.open_archive("game_1").await;
        assert_eq!(rt.active(), SessionKind::Archive);

        let event = rt.next_event().await.unwrap();
        assert!(matches!(event, SessionEvent::ArchiveLoaded { .. }));
        rt.dispatch(event).await;
        assert_eq!(rt.archive().current(), Some("game_1"));

        rt.dispatch(SessionEvent::SquareClicked(Square::new(6, 4))).await;
        let event = rt.next_event().await.unwrap();
        rt.dispatch(event).await;

        let frame = rt.frontend().frames.last().unwrap();
        let board = frame.board.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(board.highlighted().count(), 1);

        // 再次打开走召回缓存
        rt.open_archive("game_1").await;
        assert_eq!(*rt.api.fetches.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_evicts_archive() {
        let mut rt = runtime();
        rt.open_archive("game_1").await;
        let event = rt.next_event().await.unwrap();
        rt.dispatch(event).await;

        rt.delete_archive("game_1").await.unwrap();
        assert!(rt.archive().current().is_none());
        assert!(!rt.archive().recall().contains("game_1"));
        assert!(rt.delete_archive("missing").await.is_err());
        assert_eq!(rt.frontend().notices.len(), 2);
    }

    #[tokio::test]
    async fn test_live_round_trip() {
        let (conn, inbound, mut sent) = memory();
        let connector = MemoryConnector::new(conn);
        let mut rt = runtime();

        rt.connect(&connector, false).await.unwrap();
        assert_eq!(
            connector.urls.lock().unwrap().as_slice(),
            ["ws://127.0.0.1:8000/ws/default".to_string()]
        );
        let opened = rt.next_event().await.unwrap();
        rt.dispatch(opened).await;
        assert_eq!(rt.live().status(), ConnectionStatus::Connected);

        let init = ServerMessage::Init {
            state: GameRecord::new(INITIAL_FEN),
        };
        inbound.send(Ok(serde_json::to_value(init).unwrap())).unwrap();
        let event = rt.next_event().await.unwrap();
        rt.dispatch(event).await;
        assert!(rt.live().is_interactive());

        rt.dispatch(SessionEvent::SquareClicked(Square::new(6, 4))).await;
        assert_eq!(
            sent.recv().await.unwrap(),
            serde_json::to_value(ClientMessage::GetMoves {
                pos: Square::new(6, 4)
            })
            .unwrap()
        );

        // 服务端断开
        drop(inbound);
        let event = rt.next_event().await.unwrap();
        rt.dispatch(event).await;
        assert!(!rt.is_connected());
        assert_eq!(rt.live().status(), ConnectionStatus::Disconnected);
        assert!(rt
            .frontend()
            .notices
            .iter()
            .any(|n| n.message.starts_with("Connection lost")));
    }

    #[tokio::test]
    async fn test_connect_failure_marks_disconnected() {
        let mut rt = runtime();
        assert!(rt.connect(&MemoryConnector::refusing(), true).await.is_err());
        assert_eq!(rt.live().status(), ConnectionStatus::Disconnected);
        assert!(!rt.is_connected());
    }

    #[tokio::test]
    async fn test_save_game() {
        let mut rt = runtime();
        rt.save_game(None).await.unwrap();
        assert!(rt.api.saved.lock().unwrap().is_empty());

        let (conn, inbound, _sent) = memory();
        rt.connect(&MemoryConnector::new(conn), false).await.unwrap();
        let opened = rt.next_event().await.unwrap();
        rt.dispatch(opened).await;
        let init = ServerMessage::Init {
            state: GameRecord::new(INITIAL_FEN),
        };
        inbound.send(Ok(serde_json::to_value(init).unwrap())).unwrap();
        let event = rt.next_event().await.unwrap();
        rt.dispatch(event).await;

        rt.save_game(Some("opening".to_string())).await.unwrap();
        rt.save_game(None).await.unwrap();
        let saved = rt.api.saved.lock().unwrap();
        assert_eq!(saved[0], ("default".to_string(), "opening".to_string()));
        assert!(saved[1].1.starts_with("game_"));
    }
}
