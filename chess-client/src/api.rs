//! 存档与分析接口客户端
//!
//! 一次性 HTTP 请求：存档列表、获取、删除、保存，以及单步分析。

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use protocol::{
    AnalysisRequest, AnalysisResponse, ApiReply, ArchiveId, ArchiveList, GameRecord,
    NetworkConfig, ProtocolError, SaveRequest,
};

/// 请求超时（秒）
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// 接口错误
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP 请求失败
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 服务端返回 `{error}` 或非成功状态码
    #[error("Rejected by server: {reason}")]
    Rejected { reason: String },

    /// 地址无效或记录不合法
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// 响应体无法解析
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// 存档与分析接口
#[async_trait]
pub trait ArchiveApi: Send + Sync {
    /// 存档 ID 列表
    async fn list_archives(&self) -> Result<Vec<ArchiveId>, ApiError>;

    /// 获取单个存档
    async fn fetch_archive(&self, id: &str) -> Result<GameRecord, ApiError>;

    /// 删除存档，返回服务端消息
    async fn delete_archive(&self, id: &str) -> Result<String, ApiError>;

    /// 保存房间内的当前对局，返回服务端消息
    async fn save_game(&self, room: &str, request: &SaveRequest) -> Result<String, ApiError>;

    /// 单步分析
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, ApiError>;
}

/// 解析响应体：带 `error` 字段的对象视为拒绝
fn parse_body<T: DeserializeOwned>(status: reqwest::StatusCode, body: &str) -> Result<T, ApiError> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(ApiError::Rejected {
                reason: status.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(reason) = value.get("error").and_then(|e| e.as_str()) {
        return Err(ApiError::Rejected {
            reason: reason.to_string(),
        });
    }
    if !status.is_success() {
        return Err(ApiError::Rejected {
            reason: status.to_string(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

/// 把 `{message}`/`{error}` 应答转换为结果
fn reply_message(reply: ApiReply) -> Result<String, ApiError> {
    reply
        .into_result()
        .map_err(|reason| ApiError::Rejected { reason })
}

/// 校验存档记录并补全 ID
fn archive_record(id: &str, mut record: GameRecord) -> Result<GameRecord, ApiError> {
    record.validate()?;
    if record.id.is_none() {
        record.id = Some(id.to_string());
    }
    Ok(record)
}

/// HTTP 实现
pub struct HttpArchiveApi {
    config: NetworkConfig,
    client: reqwest::Client,
}

impl HttpArchiveApi {
    pub fn new(config: NetworkConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { config, client })
    }

    async fn read<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("HTTP {} ({} bytes)", status, body.len());
        parse_body(status, &body)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.config.endpoint(segments)?;
        self.read(self.client.get(url)).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.config.endpoint(segments)?;
        self.read(self.client.post(url).json(body)).await
    }
}

#[async_trait]
impl ArchiveApi for HttpArchiveApi {
    async fn list_archives(&self) -> Result<Vec<ArchiveId>, ApiError> {
        let list: ArchiveList = self.get(&["archives"]).await?;
        Ok(list.games)
    }

    async fn fetch_archive(&self, id: &str) -> Result<GameRecord, ApiError> {
        let record: GameRecord = self.get(&["archives", id]).await?;
        archive_record(id, record)
    }

    async fn delete_archive(&self, id: &str) -> Result<String, ApiError> {
        let url = self.config.endpoint(&["archives", id])?;
        let reply: ApiReply = self.read(self.client.delete(url)).await?;
        reply_message(reply)
    }

    async fn save_game(&self, room: &str, request: &SaveRequest) -> Result<String, ApiError> {
        let reply: ApiReply = self.post(&["archives", "save", room], request).await?;
        reply_message(reply)
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, ApiError> {
        self.post(&["analyze"], request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Square, INITIAL_FEN};
    use reqwest::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_body() {
        let list: ArchiveList =
            parse_body(StatusCode::OK, r#"{"games": ["game_1", "game_2"]}"#).unwrap();
        assert_eq!(list.games.len(), 2);

        let err = parse_body::<ArchiveList>(StatusCode::OK, r#"{"error": "Game not found"}"#)
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { reason } if reason == "Game not found"));

        let err = parse_body::<ArchiveList>(StatusCode::NOT_FOUND, "Not Found").unwrap_err();
        assert!(matches!(err, ApiError::Rejected { .. }));

        let err = parse_body::<ArchiveList>(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_archive_record() {
        let record = archive_record("game_1", GameRecord::new(INITIAL_FEN)).unwrap();
        assert_eq!(record.id.as_deref(), Some("game_1"));

        let mut bad = GameRecord::new(INITIAL_FEN);
        bad.history.push("e4".to_string());
        assert!(matches!(
            archive_record("game_1", bad),
            Err(ApiError::Protocol(_))
        ));
    }

    #[test]
    fn test_reply_message() {
        let ok = ApiReply {
            message: Some("Deleted".to_string()),
            error: None,
        };
        assert_eq!(reply_message(ok).unwrap(), "Deleted");

        let rejected = ApiReply {
            message: None,
            error: Some("Room not found".to_string()),
        };
        assert!(matches!(reply_message(rejected), Err(ApiError::Rejected { .. })));
    }

    /// 单次应答的最小 HTTP 服务，返回收到的请求头
    async fn serve_once(body: &'static str) -> (NetworkConfig, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            // 读完请求头和请求体
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let request = String::from_utf8_lossy(&buf).to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });
        let config = NetworkConfig {
            host: "127.0.0.1".to_string(),
            port,
            secure: false,
        };
        (config, handle)
    }

    #[tokio::test]
    async fn test_http_list_archives() {
        let (config, server) = serve_once(r#"{"games": ["game_2024_01_01_10_00_00"]}"#).await;
        let api = HttpArchiveApi::new(config).unwrap();

        let games = api.list_archives().await.unwrap();
        assert_eq!(games, vec!["game_2024_01_01_10_00_00".to_string()]);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /archives HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_http_fetch_archive_sets_id() {
        let (config, server) = serve_once(
            r#"{"history": [], "fen_history": ["8/8/8/8/8/8/8/8"], "turn": "white", "status": "draw"}"#,
        )
        .await;
        let api = HttpArchiveApi::new(config).unwrap();

        let record = api.fetch_archive("game_1").await.unwrap();
        assert_eq!(record.id.as_deref(), Some("game_1"));
        assert!(server.await.unwrap().starts_with("GET /archives/game_1 "));
    }

    #[tokio::test]
    async fn test_http_analyze() {
        let (config, server) =
            serve_once(r#"{"pos": [6, 4], "moves": [{"end": [4, 4], "type": "normal"}]}"#).await;
        let api = HttpArchiveApi::new(config).unwrap();

        let response = api
            .analyze(&AnalysisRequest {
                fen: INITIAL_FEN.to_string(),
                pos: Square::new(6, 4),
            })
            .await
            .unwrap();
        assert_eq!(response.pos, Square::new(6, 4));
        assert_eq!(response.moves.len(), 1);
        assert!(server.await.unwrap().starts_with("POST /analyze "));
    }
}
