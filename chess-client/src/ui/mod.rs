//! UI 模块
//!
//! 会话之外的协作者：通知、确认、渲染。运行时只通过这些 trait 与界面交互。

mod console;

pub use console::*;

use protocol::PieceKind;

use crate::game::{ConfirmAction, Frame, Notice, PendingPromotion};

/// 通知用户（toast 之类）
pub trait Notifier {
    fn notify(&mut self, notice: &Notice);
}

/// 请求用户确认
///
/// 答复通过 `SessionEvent::Confirmed`/`Declined` 回到会话。
pub trait Confirmer {
    fn ask(&mut self, action: ConfirmAction);
}

/// 渲染帧和升变选择
pub trait Presenter {
    fn render(&mut self, frame: &Frame);

    fn prompt_promotion(&mut self, pending: PendingPromotion, choices: &[PieceKind]);

    fn dismiss_promotion(&mut self);
}

/// 完整的前端
pub trait Frontend: Notifier + Confirmer + Presenter {}

impl<T: Notifier + Confirmer + Presenter> Frontend for T {}
