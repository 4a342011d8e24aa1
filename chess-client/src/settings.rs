//! 客户端设置
//!
//! 保存在 `{config_dir}/chess-client/settings.json`，读取失败时回退到默认值。

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use protocol::{NetworkConfig, RoomId, DEFAULT_ROOM_ID};

/// 默认日志过滤
pub const DEFAULT_LOG_FILTER: &str = "chess_client=info";

/// 客户端设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// 服务器地址
    pub network: NetworkConfig,
    /// 默认加入的房间
    pub room_id: RoomId,
    /// 翻转棋盘（黑方在下）
    pub flipped: bool,
    /// tracing 过滤指令，如 `chess_client=debug`
    pub log_filter: String,
}

/// 加载设置期间使用的日志订阅者
///
/// 正式订阅者的过滤指令来自设置本身，加载时只能先用默认过滤（`RUST_LOG` 优先）。
pub fn startup_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish()
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            room_id: DEFAULT_ROOM_ID.to_string(),
            flipped: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ClientSettings {
    /// 设置文件路径
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("chess-client");
            path.push("settings.json");
            path
        })
    }

    /// 从默认位置加载设置
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::warn!("Cannot locate config directory, using default settings");
                Self::default()
            }
        }
    }

    /// 从指定文件加载设置
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("Settings file not found, using defaults");
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => {
                    tracing::info!("Loaded settings: {:?}", path);
                    settings
                }
                Err(e) => {
                    tracing::warn!("Invalid settings file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Cannot read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// 记录会话中修改过的选项
    pub fn remember(&mut self, room_id: &str, flipped: bool) {
        self.room_id = room_id.to_string();
        self.flipped = flipped;
    }

    /// 保存到默认位置
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::settings_path().context("Cannot locate config directory")?;
        self.save_to(&path)
    }

    /// 保存到指定文件
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create config directory {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("Cannot serialize settings")?;
        std::fs::write(path, content).with_context(|| format!("Cannot write {:?}", path))?;

        tracing::info!("Settings saved: {:?}", path);
        Ok(())
    }
}
