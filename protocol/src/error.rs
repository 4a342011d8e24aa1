//! 错误类型定义

use thiserror::Error;

/// 局面编码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// 空字符串
    #[error("Empty position string")]
    Empty,

    /// 某一行的列数与第一行不一致
    #[error("Malformed position: rank {rank} has {actual} columns, expected {expected}")]
    MalformedPosition {
        rank: usize,
        expected: usize,
        actual: usize,
    },

    /// 无效的棋子字符
    #[error("Invalid piece symbol '{symbol}' in rank {rank}")]
    InvalidPiece { rank: usize, symbol: char },

    /// 某一行超过最大列数
    #[error("Rank {rank} is wider than {max} columns")]
    ColumnOverflow { rank: usize, max: usize },
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket 错误
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// 地址解析错误
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 收到无法识别的消息
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    /// 局面编码错误
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
