//! 测试用内存连接

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use url::Url;

use protocol::{Connection, Connector, ProtocolError};

/// 测试向连接注入的入站帧
pub type Inbound = mpsc::UnboundedSender<protocol::Result<serde_json::Value>>;

/// 内存连接：入站消息来自测试，出站消息回传给测试
pub struct MemoryConnection {
    inbound: mpsc::UnboundedReceiver<protocol::Result<serde_json::Value>>,
    sent: mpsc::UnboundedSender<serde_json::Value>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn send<M: Serialize + Send + Sync>(&mut self, msg: &M) -> protocol::Result<()> {
        let value = serde_json::to_value(msg)?;
        self.sent
            .send(value)
            .map_err(|_| ProtocolError::ConnectionClosed)
    }

    async fn recv<M: DeserializeOwned>(&mut self) -> protocol::Result<M> {
        match self.inbound.recv().await {
            Some(Ok(value)) => Ok(serde_json::from_value(value)?),
            Some(Err(e)) => Err(e),
            None => Err(ProtocolError::ConnectionClosed),
        }
    }

    async fn close(&mut self) -> protocol::Result<()> {
        Ok(())
    }

    fn peer_addr(&self) -> Option<String> {
        Some("memory".to_string())
    }
}

/// 创建内存连接，返回 (连接, 入站注入端, 出站接收端)
pub fn memory() -> (
    MemoryConnection,
    Inbound,
    mpsc::UnboundedReceiver<serde_json::Value>,
) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    (
        MemoryConnection {
            inbound: in_rx,
            sent: sent_tx,
        },
        in_tx,
        sent_rx,
    )
}

/// 只能连接一次的连接器，并记录连接地址
pub struct MemoryConnector {
    conn: Mutex<Option<MemoryConnection>>,
    pub urls: Mutex<Vec<String>>,
}

impl MemoryConnector {
    pub fn new(conn: MemoryConnection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// 连接总是失败
    pub fn refusing() -> Self {
        Self {
            conn: Mutex::new(None),
            urls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Conn = MemoryConnection;

    async fn connect(&self, url: &Url) -> protocol::Result<MemoryConnection> {
        self.urls.lock().unwrap().push(url.to_string());
        let conn = self.conn.lock().unwrap().take();
        conn.ok_or(ProtocolError::ConnectionTimeout)
    }
}
