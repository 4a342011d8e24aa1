//! 视图状态机
//!
//! `Live` 跟随权威局面的最新一步；`Historical(i)` 固定显示走完 `i` 步之后的局面。
//! 下标等于步数时总是折叠回 `Live`。

/// 当前显示的步
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewState {
    /// 跟随最新局面
    #[default]
    Live,
    /// 固定在某一步
    Historical(usize),
}

/// 视图状态机
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewStateMachine {
    state: ViewState,
}

impl ViewStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == ViewState::Live
    }

    /// 实际显示的下标，范围 `[0, ply_count]`
    pub fn displayed_index(&self, ply_count: usize) -> usize {
        match self.state {
            ViewState::Live => ply_count,
            ViewState::Historical(index) => index.min(ply_count),
        }
    }

    /// 相对移动，返回状态是否改变
    pub fn step(&mut self, delta: isize, ply_count: usize) -> bool {
        let current = self.displayed_index(ply_count);
        let target = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta.unsigned_abs())
        };
        self.jump_to(target, ply_count)
    }

    /// 跳到指定步（点击历史记录），返回状态是否改变
    pub fn jump_to(&mut self, step: usize, ply_count: usize) -> bool {
        let next = Self::settle(step, ply_count);
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// 以固定下标开始（存档从初始局面开始回放）
    pub fn start_at(&mut self, index: usize, ply_count: usize) {
        self.state = Self::settle(index, ply_count);
    }

    /// 回到 `Live`
    pub fn reset(&mut self) {
        self.state = ViewState::Live;
    }

    /// 权威局面替换后调整
    ///
    /// `Live` 保持不变；`Historical(i)` 保持同一下标，只有悔棋使步数缩短到 `i` 及以下时才折叠。
    pub fn on_authoritative_update(&mut self, ply_count: usize) {
        if let ViewState::Historical(index) = self.state {
            if index >= ply_count {
                self.state = ViewState::Live;
            }
        }
    }

    fn settle(index: usize, ply_count: usize) -> ViewState {
        if index >= ply_count {
            ViewState::Live
        } else {
            ViewState::Historical(index)
        }
    }
}
