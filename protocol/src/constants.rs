//! 协议常量定义

use std::time::Duration;

use crate::piece::PieceKind;

/// 标准棋盘边长
pub const STANDARD_BOARD_SIZE: usize = 8;

/// 局面编码中一行允许的最大列数
pub const MAX_BOARD_COLUMNS: usize = 64;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 1 << 20;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 默认房间 ID
pub const DEFAULT_ROOM_ID: &str = "default";

/// 兵升变可选的棋子（按展示顺序）
pub const PROMOTION_KINDS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];
