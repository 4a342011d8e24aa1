//! 国际象棋客户端共享协议库
//!
//! 包含:
//! - 棋子、网格、格子坐标等核心数据结构
//! - 局面编码（FEN 摆放字段）的解析与生成
//! - 消息类型定义 (ClientMessage, ServerMessage) 及存档/分析接口载荷
//! - 棋局记录 (GameRecord)
//! - 传输层抽象 (Connector, Connection traits) 与 WebSocket 实现

mod constants;
mod error;
mod fen;
mod grid;
mod message;
mod piece;
mod record;
mod transport;

pub use constants::*;
pub use error::{CodecError, ProtocolError, Result};
pub use fen::{Fen, EMPTY_FEN, INITIAL_FEN};
pub use grid::Grid;
pub use message::{
    AnalysisRequest, AnalysisResponse, ApiReply, ArchiveId, ArchiveList, ClientMessage,
    Destination, MoveKind, RoomId, SaveRequest, ServerMessage,
};
pub use piece::{Piece, PieceKind, Side, Square};
pub use record::{GameRecord, GameStatus, LastMove};
pub use transport::{Connection, Connector, NetworkConfig, WsConnection, WsConnector};
