//! 候选落点缓存
//!
//! 每个格子最多发起一次查询；权威局面替换时整体清空。
//! 等待中的条目记录查询来源，响应只能填入同一来源的条目。

use std::collections::HashMap;

use protocol::{Destination, Square};

/// 候选落点的查询来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// 实时通道的 `get_moves`（针对最新局面）
    Channel,
    /// 分析接口（针对显示中的局面）
    Analysis,
}

#[derive(Debug, Clone)]
enum Entry {
    /// 已发出查询，尚未收到响应
    Pending(CandidateSource),
    /// 已收到响应
    Ready(Vec<Destination>),
}

/// 候选落点缓存
#[derive(Debug, Clone, Default)]
pub struct MoveCandidateCache {
    entries: HashMap<Square, Entry>,
}

impl MoveCandidateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已收到的候选落点
    pub fn get(&self, square: Square) -> Option<&[Destination]> {
        match self.entries.get(&square) {
            Some(Entry::Ready(destinations)) => Some(destinations),
            _ => None,
        }
    }

    /// 是否正在等待响应
    pub fn is_pending(&self, square: Square) -> bool {
        matches!(self.entries.get(&square), Some(Entry::Pending(_)))
    }

    fn is_pending_from(&self, square: Square, source: CandidateSource) -> bool {
        matches!(self.entries.get(&square), Some(Entry::Pending(s)) if *s == source)
    }

    /// 登记一次查询
    ///
    /// 返回 true 表示调用方需要发出查询；已有条目（无论是否已响应）时返回 false。
    pub fn request(&mut self, square: Square, source: CandidateSource) -> bool {
        if self.entries.contains_key(&square) {
            return false;
        }
        self.entries.insert(square, Entry::Pending(source));
        true
    }

    /// 写入查询结果
    ///
    /// 只接受同一来源、仍在等待中的格子；清空之后到达的旧响应以及
    /// 来源不符的响应返回 false 并被丢弃。
    pub fn fulfil(
        &mut self,
        square: Square,
        source: CandidateSource,
        destinations: Vec<Destination>,
    ) -> bool {
        if !self.is_pending_from(square, source) {
            return false;
        }
        self.entries.insert(square, Entry::Ready(destinations));
        true
    }

    /// 放弃同一来源的等待中查询，允许之后重新发起
    pub fn abandon(&mut self, square: Square, source: CandidateSource) -> bool {
        if self.is_pending_from(square, source) {
            self.entries.remove(&square);
            true
        } else {
            false
        }
    }

    /// 查找 `from` 的候选落点中终点为 `to` 的一项
    pub fn destination(&self, from: Square, to: Square) -> Option<Destination> {
        self.get(from)?.iter().copied().find(|d| d.end == to)
    }

    /// 清空全部条目（包括等待中的查询）
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
