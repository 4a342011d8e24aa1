//! 传输层抽象
//!
//! 提供 Connector/Connection traits 使上层会话与具体传输实现解耦。
//! 默认实现为 WebSocket 文本帧，每帧一个 JSON 对象。

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{ProtocolError, Result};
use crate::{CONNECT_TIMEOUT, MAX_FRAME_SIZE};

/// 网络配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
    /// 使用 wss/https
    #[serde(default)]
    pub secure: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            secure: false,
        }
    }
}

impl NetworkConfig {
    fn base(&self, scheme: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}://{}:{}/", scheme, self.host, self.port))?)
    }

    fn with_segments(mut url: Url, segments: &[&str]) -> Result<Url> {
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ProtocolError::UnexpectedMessage("URL cannot carry a path".to_string())
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// 实时通道地址 `ws(s)://host:port/ws/{room}`
    pub fn live_url(&self, room: &str) -> Result<Url> {
        let scheme = if self.secure { "wss" } else { "ws" };
        Self::with_segments(self.base(scheme)?, &["ws", room])
    }

    /// HTTP 接口地址 `http(s)://host:port/{segments...}`
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        Self::with_segments(self.base(scheme)?, segments)
    }
}

/// 连接抽象 trait（核心抽象，用于会话层）
#[async_trait]
pub trait Connection: Send {
    /// 发送消息
    async fn send<M: Serialize + Send + Sync>(&mut self, msg: &M) -> Result<()>;

    /// 接收消息
    ///
    /// 必须可安全取消：在 `select!` 中被丢弃时不能丢失已读取的帧
    async fn recv<M: DeserializeOwned>(&mut self) -> Result<M>;

    /// 关闭连接
    async fn close(&mut self) -> Result<()>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 连接器 trait（客户端使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection + 'static;

    /// 建立连接
    async fn connect(&self, url: &Url) -> Result<Self::Conn>;
}

// ============================================================================
// WebSocket 实现
// ============================================================================

/// WebSocket 连接器
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Conn = WsConnection<MaybeTlsStream<TcpStream>>;

    async fn connect(&self, url: &Url) -> Result<Self::Conn> {
        let (stream, _response) = timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)??;

        tracing::debug!("WebSocket handshake completed: {}", url);

        Ok(WsConnection {
            stream,
            peer_addr: Some(url.to_string()),
        })
    }
}

/// WebSocket 连接
pub struct WsConnection<S> {
    stream: WebSocketStream<S>,
    peer_addr: Option<String>,
}

impl<S> WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// 从已完成握手的流创建（服务端或测试使用）
    pub fn from_stream(stream: WebSocketStream<S>, peer_addr: Option<String>) -> Self {
        Self { stream, peer_addr }
    }

    fn check_size(size: usize) -> Result<()> {
        if size > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size,
                max: MAX_FRAME_SIZE,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<S> Connection for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send<M: Serialize + Send + Sync>(&mut self, msg: &M) -> Result<()> {
        let payload = serde_json::to_string(msg)?;
        Self::check_size(payload.len())?;
        self.stream.send(Message::Text(payload.into())).await?;
        Ok(())
    }

    async fn recv<M: DeserializeOwned>(&mut self) -> Result<M> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    Self::check_size(text.len())?;
                    return Ok(serde_json::from_str(text.as_str())?);
                }
                Some(Ok(Message::Binary(bytes))) => {
                    Self::check_size(bytes.len())?;
                    return Ok(serde_json::from_slice(&bytes)?);
                }
                Some(Ok(Message::Close(_))) | None => return Err(ProtocolError::ConnectionClosed),
                // Ping/Pong 由 tungstenite 自动应答
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ClientMessage, ServerMessage};
    use crate::piece::Square;

    #[test]
    fn test_network_urls() {
        let config = NetworkConfig::default();
        assert_eq!(
            config.live_url("default").unwrap().as_str(),
            "ws://127.0.0.1:8000/ws/default"
        );
        assert_eq!(
            config.live_url("room 1").unwrap().as_str(),
            "ws://127.0.0.1:8000/ws/room%201"
        );

        let secure = NetworkConfig {
            host: "chess.example.com".to_string(),
            port: 443,
            secure: true,
        };
        assert_eq!(
            secure.endpoint(&["archives", "game_1"]).unwrap().as_str(),
            "https://chess.example.com/archives/game_1"
        );
    }

    #[test]
    fn test_secure_live_url() {
        let secure = NetworkConfig {
            host: "chess.example.com".to_string(),
            port: 8443,
            secure: true,
        };
        let url = secure.live_url("club").unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.as_str(), "wss://chess.example.com:8443/ws/club");
    }

    #[tokio::test]
    async fn test_ws_connection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // 服务端
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut conn = WsConnection::from_stream(ws, None);

            let msg: ClientMessage = conn.recv().await.unwrap();
            assert_eq!(
                msg,
                ClientMessage::GetMoves {
                    pos: Square::new(6, 4)
                }
            );

            conn.send(&ServerMessage::Error {
                message: "not your turn".to_string(),
            })
            .await
            .unwrap();
        });

        // 客户端
        let url = Url::parse(&format!("ws://{}/ws/default", addr)).unwrap();
        let mut conn = WsConnector.connect(&url).await.unwrap();
        conn.send(&ClientMessage::GetMoves {
            pos: Square::new(6, 4),
        })
        .await
        .unwrap();

        let msg: ServerMessage = conn.recv().await.unwrap();
        assert_eq!(
            msg,
            ServerMessage::Error {
                message: "not your turn".to_string()
            }
        );

        server.await.unwrap();

        // 服务端关闭后读取返回连接关闭
        assert!(conn.recv::<ServerMessage>().await.is_err());
    }
}
