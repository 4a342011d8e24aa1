//! 升变选择

use protocol::{ClientMessage, PieceKind, Square, PROMOTION_KINDS};

/// 等待选择升变棋子的走法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPromotion {
    pub start: Square,
    pub end: Square,
}

/// 升变流程
#[derive(Debug, Clone, Default)]
pub struct PromotionFlow {
    pending: Option<PendingPromotion>,
}

impl PromotionFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录待升变走法（覆盖之前未完成的选择）
    pub fn begin(&mut self, start: Square, end: Square) -> PendingPromotion {
        let pending = PendingPromotion { start, end };
        self.pending = Some(pending);
        pending
    }

    pub fn pending(&self) -> Option<PendingPromotion> {
        self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// 可选的升变棋子
    pub fn choices(&self) -> &'static [PieceKind] {
        &PROMOTION_KINDS
    }

    /// 选定升变棋子，返回要发送的走棋消息
    pub fn choose(&mut self, kind: PieceKind) -> Option<ClientMessage> {
        if !kind.is_promotable() {
            tracing::warn!("Ignoring non-promotable piece kind: {:?}", kind);
            return None;
        }
        let PendingPromotion { start, end } = self.pending.take()?;
        Some(ClientMessage::Move {
            start,
            end,
            promotion: Some(kind),
        })
    }

    /// 取消，返回是否有待选择的走法被丢弃
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}
