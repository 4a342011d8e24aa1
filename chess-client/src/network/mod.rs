//! 网络通信模块
//!
//! - `session`：实时对局会话（状态机，不做 I/O）
//! - `connection`：实时通道后台任务
//! - `runtime`：事件循环，连接会话、通道、存档接口与前端

mod connection;
mod runtime;
mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use connection::*;
pub use runtime::*;
pub use session::*;
