//! 棋局记录
//!
//! 由服务端权威维护，客户端只读镜像。每次 `init`/`update` 整体替换。

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::piece::{Side, Square};

/// 对局状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// 进行中
    #[default]
    Ongoing,
    /// 和棋
    Draw,
    /// 白方胜
    WhiteWin,
    /// 黑方胜
    BlackWin,
}

impl GameStatus {
    /// 是否进行中
    pub fn is_ongoing(&self) -> bool {
        matches!(self, GameStatus::Ongoing)
    }

    /// 胜方（和棋或未结束时为 None）
    pub fn winner(&self) -> Option<Side> {
        match self {
            GameStatus::WhiteWin => Some(Side::White),
            GameStatus::BlackWin => Some(Side::Black),
            GameStatus::Ongoing | GameStatus::Draw => None,
        }
    }

    /// 棋谱结果标记
    pub fn result_token(&self) -> &'static str {
        match self {
            GameStatus::Ongoing => "*",
            GameStatus::Draw => "1/2-1/2",
            GameStatus::WhiteWin => "1-0",
            GameStatus::BlackWin => "0-1",
        }
    }

    /// 结果描述
    pub fn describe(&self) -> &'static str {
        match self {
            GameStatus::Ongoing => "Game in progress",
            GameStatus::Draw => "Draw",
            GameStatus::WhiteWin => "White wins",
            GameStatus::BlackWin => "Black wins",
        }
    }
}

/// 最后一步走法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    pub start: Square,
    pub end: Square,
}

fn default_turn() -> Side {
    Side::White
}

/// 完整的棋局记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// 房间 ID 或存档 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 代数记谱的走法列表
    #[serde(default)]
    pub history: Vec<String>,
    /// 每一步之后的局面编码，下标 0 为初始局面，长度比 `history` 多一
    #[serde(rename = "fen_history", alias = "position_history")]
    pub position_history: Vec<String>,
    /// 当前走子方
    #[serde(default = "default_turn")]
    pub turn: Side,
    /// 对局状态
    #[serde(default)]
    pub status: GameStatus,
}

impl GameRecord {
    /// 创建只有初始局面的记录
    pub fn new(initial_position: impl Into<String>) -> Self {
        Self {
            id: None,
            history: Vec::new(),
            position_history: vec![initial_position.into()],
            turn: Side::White,
            status: GameStatus::Ongoing,
        }
    }

    /// 设置 ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 追加一步（仅用于构造测试数据和本地合成）
    pub fn push(&mut self, notation: impl Into<String>, position: impl Into<String>) {
        self.history.push(notation.into());
        self.position_history.push(position.into());
        self.turn = self.turn.opponent();
    }

    /// 已走步数
    pub fn ply_count(&self) -> usize {
        self.history.len()
    }

    /// 走完 `index` 步之后的局面
    pub fn position_at(&self, index: usize) -> Option<&str> {
        self.position_history.get(index).map(String::as_str)
    }

    /// 当前（最新）局面
    pub fn current_position(&self) -> Option<&str> {
        self.position_history.last().map(String::as_str)
    }

    /// 检查 `position_history` 与 `history` 的长度关系
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.position_history.len() != self.history.len() + 1 {
            return Err(ProtocolError::UnexpectedMessage(format!(
                "record has {} moves but {} positions",
                self.history.len(),
                self.position_history.len()
            )));
        }
        Ok(())
    }

    /// 生成棋谱文本，如 `1. e4 e5 2. Nf3 *`
    pub fn movetext(&self) -> String {
        let mut out = String::new();
        for (i, pair) in self.history.chunks(2).enumerate() {
            out.push_str(&format!("{}. {} ", i + 1, pair[0]));
            if let Some(reply) = pair.get(1) {
                out.push_str(reply);
                out.push(' ');
            }
        }
        out.push_str(self.status.result_token());
        out
    }
}
