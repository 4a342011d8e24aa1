//! 端到端场景：解码局面、实时会话的选择、更新与升变

use chess_client::game::{Command, Session, SessionEvent};
use chess_client::network::LiveSession;
use protocol::{
    ClientMessage, Destination, Fen, GameRecord, MoveKind, Piece, PieceKind, ServerMessage, Side,
    Square, EMPTY_FEN, INITIAL_FEN,
};

const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
const AFTER_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";
const PAWN_ON_SEVENTH: &str = "7k/P7/8/8/8/8/8/7K w - - 0 1";

/// 已连接并收到 init 的实时会话
fn joined(record: GameRecord) -> (LiveSession, u64) {
    let mut session = LiveSession::new("default");
    let generation = session.begin_connect(false);
    session.handle(SessionEvent::ChannelOpened { generation });
    session.handle(SessionEvent::Server {
        generation,
        message: ServerMessage::Init { state: record },
    });
    (session, generation)
}

fn sent(commands: &[Command]) -> Vec<&ClientMessage> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::Send(msg) => Some(msg),
            _ => None,
        })
        .collect()
}

#[test]
fn test_empty_position_decodes_to_empty_grid() {
    let grid = Fen::decode(EMPTY_FEN).unwrap();
    assert_eq!((grid.rows(), grid.cols()), (8, 8));
    assert!(grid.is_empty());
}

#[test]
fn test_initial_position_layout() {
    let grid = Fen::decode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR").unwrap();
    assert_eq!(
        grid.get(Square::new(7, 4)),
        Some(Piece::new(PieceKind::King, Side::White))
    );
    assert_eq!(
        grid.get(Square::new(0, 3)),
        Some(Piece::new(PieceKind::Queen, Side::Black))
    );
    for col in 0..8 {
        assert_eq!(
            grid.get(Square::new(6, col)),
            Some(Piece::new(PieceKind::Pawn, Side::White))
        );
        assert_eq!(
            grid.get(Square::new(1, col)),
            Some(Piece::new(PieceKind::Pawn, Side::Black))
        );
        for row in 2..6 {
            assert_eq!(grid.get(Square::new(row, col)), None);
        }
    }
    assert_eq!(grid.count(Side::White), 16);
    assert_eq!(grid.count(Side::Black), 16);
}

#[test]
fn test_repeated_selection_requests_candidates_once() {
    let (mut session, _) = joined(GameRecord::new(INITIAL_FEN));
    let pawn = Square::new(6, 4);

    let first = session.handle(SessionEvent::SquareClicked(pawn));
    assert_eq!(sent(&first), vec![&ClientMessage::GetMoves { pos: pawn }]);

    // 再次点击同一格：取消选中，缓存仍在等待，不会重复请求
    let second = session.handle(SessionEvent::SquareClicked(pawn));
    assert!(sent(&second).is_empty());
    let third = session.handle(SessionEvent::SquareClicked(pawn));
    assert!(sent(&third).is_empty());
    assert_eq!(session.board().selection(), Some(pawn));
}

#[test]
fn test_update_clears_selection_and_candidates() {
    let mut record = GameRecord::new(INITIAL_FEN);
    record.push("e4", AFTER_E4);
    let (mut session, generation) = joined(record.clone());

    let pawn = Square::new(4, 4);
    session.handle(SessionEvent::SquareClicked(pawn));
    session.handle(SessionEvent::Server {
        generation,
        message: ServerMessage::PieceMoves {
            pos: pawn,
            moves: vec![Destination::normal(Square::new(3, 4))],
        },
    });
    assert_eq!(session.board().selection(), Some(pawn));
    assert!(!session.board().candidates().is_empty());

    record.push("e5", AFTER_E5);
    session.handle(SessionEvent::Server {
        generation,
        message: ServerMessage::Update {
            state: record,
            last_move: None,
        },
    });
    assert_eq!(session.board().selection(), None);
    assert!(session.board().candidates().is_empty());
}

#[test]
fn test_promotion_waits_for_choice() {
    let (mut session, generation) = joined(GameRecord::new(PAWN_ON_SEVENTH));
    let start = Square::new(1, 0);
    let end = Square::new(0, 0);

    session.handle(SessionEvent::SquareClicked(start));
    session.handle(SessionEvent::Server {
        generation,
        message: ServerMessage::PieceMoves {
            pos: start,
            moves: vec![Destination::new(end, MoveKind::Promotion)],
        },
    });

    let clicked = session.handle(SessionEvent::SquareClicked(end));
    assert!(sent(&clicked).is_empty());
    assert!(matches!(clicked.as_slice(), [Command::PromptPromotion(_)]));

    let chosen = session.handle(SessionEvent::PromotionChosen(PieceKind::Queen));
    assert_eq!(
        sent(&chosen),
        vec![&ClientMessage::Move {
            start,
            end,
            promotion: Some(PieceKind::Queen),
        }]
    );
    assert!(!session.promotion().is_pending());

    // 只发送一次
    let again = session.handle(SessionEvent::PromotionChosen(PieceKind::Queen));
    assert!(sent(&again).is_empty());
}

#[test]
fn test_update_keeps_historical_view() {
    let mut record = GameRecord::new(INITIAL_FEN);
    record.push("e4", AFTER_E4);
    let (mut session, generation) = joined(record.clone());

    session.handle(SessionEvent::JumpTo(0));
    let before = session.board().displayed_grid().unwrap().unwrap();

    record.push("e5", AFTER_E5);
    session.handle(SessionEvent::Server {
        generation,
        message: ServerMessage::Update {
            state: record,
            last_move: None,
        },
    });
    assert_eq!(session.board().displayed_index(), Some(0));
    assert_eq!(session.board().displayed_grid().unwrap().unwrap(), before);
    assert!(!session.is_interactive());
}
