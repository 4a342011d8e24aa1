//! 消息类型定义
//!
//! 实时通道上的消息均为带 `type` 标签的 JSON 对象；
//! 存档与分析接口使用普通 JSON 请求/响应体。

use serde::{Deserialize, Serialize};

use crate::piece::{PieceKind, Square};
use crate::record::{GameRecord, LastMove};

/// 房间 ID
pub type RoomId = String;

/// 存档 ID
pub type ArchiveId = String;

/// 走法类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// 普通走法
    Normal,
    /// 兵升变，需要选择升变棋子
    Promotion,
    /// 王车易位
    Castling,
    /// 吃过路兵
    EnPassant,
    /// 其他特殊走法
    #[serde(other)]
    Special,
}

/// 候选落点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub end: Square,
    #[serde(rename = "type", default = "Destination::default_kind")]
    pub kind: MoveKind,
}

impl Destination {
    /// 创建候选落点
    pub const fn new(end: Square, kind: MoveKind) -> Self {
        Self { end, kind }
    }

    /// 普通落点
    pub const fn normal(end: Square) -> Self {
        Self::new(end, MoveKind::Normal)
    }

    /// 是否为升变
    pub fn is_promotion(&self) -> bool {
        self.kind == MoveKind::Promotion
    }

    fn default_kind() -> MoveKind {
        MoveKind::Normal
    }
}

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 请求某格棋子的候选落点
    GetMoves { pos: Square },
    /// 走棋
    Move {
        start: Square,
        end: Square,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        promotion: Option<PieceKind>,
    },
    /// 悔棋
    Undo,
    /// 重新开局
    Reset,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 连接建立或重新开局后的完整状态
    Init { state: GameRecord },
    /// 走棋/悔棋后的完整状态
    Update {
        state: GameRecord,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_move: Option<LastMove>,
    },
    /// 候选落点
    PieceMoves { pos: Square, moves: Vec<Destination> },
    /// 错误消息
    Error { message: String },
}

impl ServerMessage {
    /// 消息类型名（用于日志）
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Init { .. } => "init",
            ServerMessage::Update { .. } => "update",
            ServerMessage::PieceMoves { .. } => "piece_moves",
            ServerMessage::Error { .. } => "error",
        }
    }
}

/// 单次分析请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// 局面编码
    pub fen: String,
    /// 被查询的格子
    pub pos: Square,
}

/// 单次分析响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub pos: Square,
    #[serde(default)]
    pub moves: Vec<Destination>,
}

/// 存档列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveList {
    #[serde(default)]
    pub games: Vec<ArchiveId>,
}

/// 保存当前对局的请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub filename: String,
    /// 渲染快照（Base64 Data URL）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// 通用应答：`{message}` 或 `{error}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiReply {
    /// 转换为结果，`error` 字段优先
    pub fn into_result(self) -> Result<String, String> {
        match self.error {
            Some(reason) => Err(reason),
            None => Ok(self.message.unwrap_or_default()),
        }
    }
}
