//! 实时通道
//!
//! 每条通道由一个后台任务持有连接：出站消息经 mpsc 队列写入连接，
//! 入站消息转换为带代数的 `SessionEvent` 投递给运行时。

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use url::Url;

use protocol::{ClientMessage, Connection, Connector, ProtocolError, ServerMessage};

use crate::game::SessionEvent;

/// 出站队列容量
const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// 实时通道句柄
///
/// 丢弃句柄即关闭连接，此后不会再产生任何事件。
pub struct LiveChannel {
    generation: u64,
    outbound: mpsc::Sender<ClientMessage>,
    /// 丢弃即通知后台任务停止投递事件
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl LiveChannel {
    /// 建立连接并启动后台任务
    pub async fn open<C: Connector>(
        connector: &C,
        url: &Url,
        generation: u64,
        events: mpsc::Sender<SessionEvent>,
    ) -> protocol::Result<Self> {
        let conn = connector.connect(url).await?;
        tracing::info!(
            "Live channel connected: {} (generation {})",
            conn.peer_addr().unwrap_or_else(|| url.to_string()),
            generation
        );
        Ok(Self::spawn(conn, generation, events))
    }

    /// 用已建立的连接启动后台任务
    pub fn spawn<T: Connection + 'static>(
        conn: T,
        generation: u64,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let (outbound, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(conn, generation, rx, shutdown_rx, events));
        Self {
            generation,
            outbound,
            shutdown,
            task,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 发送消息，通道已关闭时返回 false
    pub async fn send(&self, msg: ClientMessage) -> bool {
        self.outbound.send(msg).await.is_ok()
    }

    /// 关闭通道：已排队的消息先写出，然后关闭连接
    ///
    /// 后台任务即使卡在投递事件（事件队列已满）也会立即退出投递。
    pub async fn close(self) {
        let Self {
            outbound,
            shutdown,
            task,
            ..
        } = self;
        drop(outbound);
        drop(shutdown);
        if let Err(e) = task.await {
            tracing::warn!("Live channel task ended abnormally: {}", e);
        }
    }
}

/// 事件投递结果
enum Delivery {
    Sent,
    /// 运行时已退出
    Dropped,
    /// 句柄已关闭
    Closing,
}

async fn deliver(
    events: &mpsc::Sender<SessionEvent>,
    shutdown: &mut oneshot::Receiver<()>,
    event: SessionEvent,
) -> Delivery {
    tokio::select! {
        sent = events.send(event) => match sent {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Dropped,
        },
        _ = shutdown => Delivery::Closing,
    }
}

/// 写出剩余的出站消息并关闭连接
async fn finish<T: Connection>(
    conn: &mut T,
    outbound: &mut mpsc::Receiver<ClientMessage>,
    generation: u64,
) {
    while let Ok(msg) = outbound.try_recv() {
        if let Err(e) = conn.send(&msg).await {
            tracing::debug!("Dropping queued {:?} on close: {}", msg, e);
            break;
        }
    }
    if let Err(e) = conn.close().await {
        tracing::debug!("Error while closing live channel: {}", e);
    }
    tracing::info!("Live channel closed (generation {})", generation);
}

async fn run<T: Connection>(
    mut conn: T,
    generation: u64,
    mut outbound: mpsc::Receiver<ClientMessage>,
    mut shutdown: oneshot::Receiver<()>,
    events: mpsc::Sender<SessionEvent>,
) {
    match deliver(&events, &mut shutdown, SessionEvent::ChannelOpened { generation }).await {
        Delivery::Sent => {}
        Delivery::Dropped => return,
        Delivery::Closing => return finish(&mut conn, &mut outbound, generation).await,
    }

    let reason = loop {
        tokio::select! {
            msg = outbound.recv() => match msg {
                Some(msg) => {
                    tracing::debug!("Sending {:?}", msg);
                    if let Err(e) = conn.send(&msg).await {
                        break e.to_string();
                    }
                }
                None => {
                    // 句柄已丢弃：静默关闭
                    return finish(&mut conn, &mut outbound, generation).await;
                }
            },
            result = conn.recv::<ServerMessage>() => {
                let event = match result {
                    Ok(message) => SessionEvent::Server { generation, message },
                    Err(ProtocolError::Json(e)) => SessionEvent::ProtocolViolation {
                        generation,
                        detail: e.to_string(),
                    },
                    Err(e) => break e.to_string(),
                };
                match deliver(&events, &mut shutdown, event).await {
                    Delivery::Sent => {}
                    Delivery::Dropped => return,
                    Delivery::Closing => {
                        return finish(&mut conn, &mut outbound, generation).await;
                    }
                }
            }
        }
    };

    tracing::warn!("Live channel failed (generation {}): {}", generation, reason);
    let closed = SessionEvent::ChannelClosed { generation, reason };
    let _ = deliver(&events, &mut shutdown, closed).await;
}
