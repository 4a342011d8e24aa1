//! 终端前端

use std::io::Write;

use protocol::{PieceKind, Square, STANDARD_BOARD_SIZE};

use super::{Confirmer, Notifier, Presenter};
use crate::board::{describe, promotion_label};
use crate::game::{history_text, ConfirmAction, Frame, Notice, NoticeLevel, PendingPromotion};

/// 终端命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// 点击格子
    Click(Square),
    Back,
    Forward,
    First,
    Last,
    Jump(usize),
    Flip,
    Undo,
    Reset,
    Promote(PieceKind),
    Cancel,
    Yes,
    No,
    Save(Option<String>),
    Archives,
    Open(String),
    Delete(String),
    /// 切回实时对局
    Live,
    /// 重新连接（可选先 reset）
    Connect { reset: bool },
    /// 保存当前房间和朝向为默认设置
    SaveSettings,
    Leave,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  e2 | 6 4          click a square (algebraic or row col)
  back | fwd        step through history
  first | last      jump to the start / the live position
  jump N            show the position after N moves
  flip              flip the board
  undo | reset      undo the last move / start a new game
  q | r | b | n     choose a promotion piece, `cancel` to abort
  y | no            answer a confirmation
  save [name]       save the live game
  archives          list saved games
  open ID | delete ID
  live              return to the live game
  connect [reset]   reconnect to the room
  settings          remember the current room and orientation
  leave | quit";

/// 解析格子：代数记号（`e2`）或行列（`6 4`）
pub fn parse_square(text: &str, rows: usize) -> Option<Square> {
    let mut parts = text.split_whitespace();
    let first = parts.next()?;
    if let Some(second) = parts.next() {
        if parts.next().is_some() {
            return None;
        }
        return Some(Square::new(first.parse().ok()?, second.parse().ok()?));
    }

    let mut chars = first.chars();
    let file = chars.next()?.to_ascii_lowercase();
    if !file.is_ascii_lowercase() {
        return None;
    }
    let rank: usize = chars.as_str().parse().ok()?;
    if rank == 0 || rank > rows {
        return None;
    }
    Some(Square::new(rows - rank, file as usize - 'a' as usize))
}

/// 解析一行输入
pub fn parse_command(line: &str, rows: usize) -> Option<ConsoleCommand> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let argument = || (!rest.is_empty()).then(|| rest.to_string());

    let command = match head.to_ascii_lowercase().as_str() {
        "" => return None,
        "back" | "<" => ConsoleCommand::Back,
        "fwd" | "forward" | ">" => ConsoleCommand::Forward,
        "first" => ConsoleCommand::First,
        "last" => ConsoleCommand::Last,
        "jump" => ConsoleCommand::Jump(rest.parse().ok()?),
        "flip" => ConsoleCommand::Flip,
        "undo" => ConsoleCommand::Undo,
        "reset" => ConsoleCommand::Reset,
        "q" | "r" | "b" | "n" if rest.is_empty() => {
            let symbol = head.chars().next()?;
            ConsoleCommand::Promote(PieceKind::from_fen_char(symbol)?.0)
        }
        "cancel" => ConsoleCommand::Cancel,
        "y" | "yes" => ConsoleCommand::Yes,
        "no" => ConsoleCommand::No,
        "save" => ConsoleCommand::Save(argument()),
        "archives" | "ls" => ConsoleCommand::Archives,
        "open" => ConsoleCommand::Open(argument()?),
        "delete" | "rm" => ConsoleCommand::Delete(argument()?),
        "live" => ConsoleCommand::Live,
        "connect" => ConsoleCommand::Connect {
            reset: rest.eq_ignore_ascii_case("reset"),
        },
        "settings" => ConsoleCommand::SaveSettings,
        "leave" => ConsoleCommand::Leave,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => ConsoleCommand::Click(parse_square(line, rows)?),
    };
    Some(command)
}

/// 终端前端
pub struct ConsoleFrontend<W: Write> {
    out: W,
    pending_confirm: Option<ConfirmAction>,
    promotion_open: bool,
    rows: usize,
}

impl<W: Write> ConsoleFrontend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            pending_confirm: None,
            promotion_open: false,
            rows: STANDARD_BOARD_SIZE,
        }
    }

    /// 取出等待答复的确认
    pub fn take_confirmation(&mut self) -> Option<ConfirmAction> {
        self.pending_confirm.take()
    }

    pub fn promotion_open(&self) -> bool {
        self.promotion_open
    }

    /// 最近一次渲染的棋盘行数（用于解析代数记号）
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn print(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            tracing::warn!("Failed to write to console: {}", e);
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Notifier for ConsoleFrontend<W> {
    fn notify(&mut self, notice: &Notice) {
        let prefix = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        self.print(&format!("{}: {}", prefix, notice.message));
    }
}

impl<W: Write> Confirmer for ConsoleFrontend<W> {
    fn ask(&mut self, action: ConfirmAction) {
        self.pending_confirm = Some(action);
        self.print(&format!("{} [yes/no]", action.prompt()));
    }
}

impl<W: Write> Presenter for ConsoleFrontend<W> {
    fn render(&mut self, frame: &Frame) {
        let mut text = String::new();
        match &frame.board {
            Some(Ok(board)) => {
                self.rows = board.rows;
                text.push_str(&board.to_text());
                if let Some(piece) = board
                    .selected()
                    .and_then(|s| board.square(s))
                    .and_then(|s| s.piece)
                {
                    text.push_str(&format!("selected: {}\n", describe(piece)));
                }
            }
            Some(Err(e)) => text.push_str(&format!("(cannot display this position: {})\n", e)),
            None => text.push_str("(no game)\n"),
        }
        let history = history_text(&frame.history);
        if !history.is_empty() {
            text.push_str(&history);
            text.push('\n');
        }
        text.push_str(&frame.status);
        self.print(&text);
    }

    fn prompt_promotion(&mut self, pending: PendingPromotion, choices: &[PieceKind]) {
        self.promotion_open = true;
        let labels: Vec<String> = choices.iter().map(|k| promotion_label(*k)).collect();
        self.print(&format!(
            "Promote {} -> {}: {} (or cancel)",
            pending.start,
            pending.end,
            labels.join(", ")
        ));
    }

    fn dismiss_promotion(&mut self) {
        self.promotion_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{BoardSession, HistoryRow};
    use protocol::{GameRecord, INITIAL_FEN};

    #[test]
    fn test_parse_square() {
        assert_eq!(parse_square("e2", 8), Some(Square::new(6, 4)));
        assert_eq!(parse_square("A8", 8), Some(Square::new(0, 0)));
        assert_eq!(parse_square("6 4", 8), Some(Square::new(6, 4)));
        assert_eq!(parse_square("e9", 8), None);
        assert_eq!(parse_square("e0", 8), None);
        assert_eq!(parse_square("1 2 3", 8), None);
        assert_eq!(parse_square("j10", 10), Some(Square::new(0, 9)));
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("back", 8), Some(ConsoleCommand::Back));
        assert_eq!(parse_command(" jump 3 ", 8), Some(ConsoleCommand::Jump(3)));
        assert_eq!(parse_command("jump x", 8), None);
        assert_eq!(
            parse_command("q", 8),
            Some(ConsoleCommand::Promote(PieceKind::Queen))
        );
        assert_eq!(
            parse_command("n", 8),
            Some(ConsoleCommand::Promote(PieceKind::Knight))
        );
        assert_eq!(parse_command("save", 8), Some(ConsoleCommand::Save(None)));
        assert_eq!(
            parse_command("save my game", 8),
            Some(ConsoleCommand::Save(Some("my game".to_string())))
        );
        assert_eq!(parse_command("open", 8), None);
        assert_eq!(
            parse_command("connect reset", 8),
            Some(ConsoleCommand::Connect { reset: true })
        );
        assert_eq!(
            parse_command("e4", 8),
            Some(ConsoleCommand::Click(Square::new(4, 4)))
        );
        assert_eq!(
            parse_command("6 4", 8),
            Some(ConsoleCommand::Click(Square::new(6, 4)))
        );
        assert_eq!(
            parse_command("settings", 8),
            Some(ConsoleCommand::SaveSettings)
        );
        assert_eq!(parse_command("", 8), None);
        assert_eq!(parse_command("dance", 8), None);
    }

    #[test]
    fn test_confirm_roundtrip() {
        let mut console = ConsoleFrontend::new(Vec::new());
        console.ask(ConfirmAction::Undo);
        assert_eq!(console.take_confirmation(), Some(ConfirmAction::Undo));
        assert_eq!(console.take_confirmation(), None);

        let out = String::from_utf8(console.into_inner()).unwrap();
        assert!(out.contains("Undo the last move? [yes/no]"));
    }

    #[test]
    fn test_render_frame() {
        let mut board = BoardSession::new();
        board.replace_record(GameRecord::new(INITIAL_FEN), true, None);
        board.select(Square::new(7, 6));
        let frame = Frame::from_board(&board, None, "[Online] room default".to_string());

        let mut console = ConsoleFrontend::new(Vec::new());
        console.render(&frame);
        console.notify(&Notice::error("Illegal move"));
        let out = String::from_utf8(console.into_inner()).unwrap();
        assert!(out.contains("[♘]"));
        assert!(out.contains("selected: White Knight"));
        assert!(out.contains("error: Illegal move"));
        assert!(out.ends_with("error: Illegal move\n"));
    }

    #[test]
    fn test_render_empty_frame() {
        let frame = Frame {
            board: None,
            history: Vec::<HistoryRow>::new(),
            status: "[Disconnected] room default".to_string(),
        };
        let mut console = ConsoleFrontend::new(Vec::new());
        console.render(&frame);
        console.prompt_promotion(
            PendingPromotion {
                start: Square::new(1, 0),
                end: Square::new(0, 0),
            },
            &protocol::PROMOTION_KINDS,
        );
        assert!(console.promotion_open());
        let out = String::from_utf8(console.into_inner()).unwrap();
        assert!(out.starts_with("(no game)"));
        assert!(out.contains("q: Queen, r: Rook, b: Bishop, n: Knight"));
    }
}
