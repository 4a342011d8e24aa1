//! 国际象棋客户端
//!
//! 与服务端同步棋盘：实时对局通过 WebSocket 通道，存档回放与走法分析通过 HTTP 接口。
//! 合法性判断全部由服务端完成，客户端只负责显示、选择与回放。

pub mod api;
pub mod archive;
pub mod board;
pub mod game;
pub mod network;
pub mod settings;
pub mod storage;
pub mod ui;
