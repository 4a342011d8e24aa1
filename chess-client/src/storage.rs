//! 存档召回缓存
//!
//! 进程内按存档 ID 保存已加载的棋局记录，避免重复请求。没有容量上限和过期策略。

use std::collections::HashMap;

use protocol::{ArchiveId, GameRecord};

/// 存档召回缓存
#[derive(Debug, Clone, Default)]
pub struct RecallStore {
    records: HashMap<ArchiveId, GameRecord>,
}

impl RecallStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&GameRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn insert(&mut self, id: impl Into<ArchiveId>, record: GameRecord) {
        self.records.insert(id.into(), record);
    }

    /// 移除条目（存档被删除时）
    pub fn remove(&mut self, id: &str) -> Option<GameRecord> {
        self.records.remove(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
