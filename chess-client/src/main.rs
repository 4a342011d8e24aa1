use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chess_client::api::HttpArchiveApi;
use chess_client::game::{ConfirmAction, SessionEvent};
use chess_client::network::{ClientRuntime, SessionKind};
use chess_client::settings::{startup_subscriber, ClientSettings};
use chess_client::ui::{parse_command, ConsoleCommand, ConsoleFrontend, HELP};
use protocol::WsConnector;

type Runtime = ClientRuntime<HttpArchiveApi, ConsoleFrontend<std::io::Stdout>>;

#[derive(Parser, Debug)]
#[command(name = "chess-client", version, about = "Terminal client for server-hosted chess games")]
struct Args {
    /// 服务器主机
    #[arg(long)]
    host: Option<String>,
    /// 服务器端口
    #[arg(long)]
    port: Option<u16>,
    /// 使用 wss/https
    #[arg(long)]
    secure: bool,
    /// 加入的房间
    #[arg(long)]
    room: Option<String>,
    /// 启动时打开存档而不是连接房间
    #[arg(long)]
    archive: Option<String>,
    /// 黑方在下
    #[arg(long)]
    flipped: bool,
    /// 连接后重新开局
    #[arg(long)]
    reset: bool,
}

enum Input {
    Line(Option<String>),
    Event(Option<SessionEvent>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    // 正式订阅者依赖设置中的过滤指令，加载设置时先用临时订阅者
    let mut settings =
        tracing::subscriber::with_default(startup_subscriber(std::io::stderr), ClientSettings::load);

    // 初始化日志（输出到 stderr，stdout 留给棋盘）
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("Invalid log filter")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Some(host) = args.host {
        settings.network.host = host;
    }
    if let Some(port) = args.port {
        settings.network.port = port;
    }
    if args.secure {
        settings.network.secure = true;
    }
    if let Some(room) = args.room {
        settings.room_id = room;
    }
    if args.flipped {
        settings.flipped = true;
    }

    tracing::info!(
        "Chess client starting: {}:{} room {}",
        settings.network.host,
        settings.network.port,
        settings.room_id
    );

    let api = HttpArchiveApi::new(settings.network.clone()).context("Cannot build HTTP client")?;
    let frontend = ConsoleFrontend::new(std::io::stdout());
    let mut runtime = ClientRuntime::new(settings.network.clone(), settings.room_id.clone(), api, frontend);
    runtime.set_flipped(settings.flipped);

    match args.archive {
        Some(id) => runtime.open_archive(&id).await,
        None => {
            if let Err(e) = runtime.connect(&WsConnector, args.reset).await {
                tracing::warn!("Initial connection failed: {}", e);
            }
        }
    }
    runtime.frontend_mut().print("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line.context("Cannot read stdin")?),
            event = runtime.next_event() => Input::Event(event),
        };

        match input {
            Input::Line(None) => break,
            Input::Line(Some(line)) => {
                let rows = runtime.frontend().rows();
                match parse_command(&line, rows) {
                    Some(command) => {
                        if !run_command(&mut runtime, &mut settings, command).await {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => runtime
                        .frontend_mut()
                        .print("Unknown command, type `help` for a list."),
                }
            }
            Input::Event(Some(event)) => runtime.dispatch(event).await,
            Input::Event(None) => break,
        }
    }

    runtime.disconnect().await;
    tracing::info!("Chess client stopped");
    Ok(())
}

/// 执行一条终端命令，返回 false 表示退出
async fn run_command(
    runtime: &mut Runtime,
    settings: &mut ClientSettings,
    command: ConsoleCommand,
) -> bool {
    let event = match command {
        ConsoleCommand::Click(square) => SessionEvent::SquareClicked(square),
        ConsoleCommand::Back => SessionEvent::Step(-1),
        ConsoleCommand::Forward => SessionEvent::Step(1),
        ConsoleCommand::First => SessionEvent::JumpTo(0),
        ConsoleCommand::Last => SessionEvent::JumpTo(usize::MAX),
        ConsoleCommand::Jump(step) => SessionEvent::JumpTo(step),
        ConsoleCommand::Flip => SessionEvent::ToggleFlip,
        ConsoleCommand::Undo => SessionEvent::RequestUndo,
        ConsoleCommand::Reset => SessionEvent::RequestReset,
        ConsoleCommand::Promote(kind) => SessionEvent::PromotionChosen(kind),
        ConsoleCommand::Cancel => SessionEvent::PromotionCancelled,
        ConsoleCommand::Yes => match pending_confirmation(runtime) {
            Some(action) => SessionEvent::Confirmed(action),
            None => return true,
        },
        ConsoleCommand::No => match pending_confirmation(runtime) {
            Some(action) => SessionEvent::Declined(action),
            None => return true,
        },
        ConsoleCommand::Save(name) => {
            if let Err(e) = runtime.save_game(name).await {
                tracing::debug!("Save failed: {}", e);
            }
            return true;
        }
        ConsoleCommand::Archives => {
            if let Ok(ids) = runtime.list_archives().await {
                let text = if ids.is_empty() {
                    "No saved games.".to_string()
                } else {
                    ids.join("\n")
                };
                runtime.frontend_mut().print(&text);
            }
            return true;
        }
        ConsoleCommand::Open(id) => {
            runtime.open_archive(&id).await;
            return true;
        }
        ConsoleCommand::Delete(id) => {
            if let Err(e) = runtime.delete_archive(&id).await {
                tracing::debug!("Delete failed: {}", e);
            }
            return true;
        }
        ConsoleCommand::Live => {
            runtime.show(SessionKind::Live);
            return true;
        }
        ConsoleCommand::Connect { reset } => {
            if let Err(e) = runtime.connect(&WsConnector, reset).await {
                tracing::warn!("Connection failed: {}", e);
            }
            return true;
        }
        ConsoleCommand::SaveSettings => {
            settings.remember(runtime.live().room_id(), runtime.live().board().flipped());
            let text = match settings.save() {
                Ok(()) => "Settings saved.".to_string(),
                Err(e) => {
                    tracing::error!("Failed to save settings: {:#}", e);
                    format!("Cannot save settings: {:#}", e)
                }
            };
            runtime.frontend_mut().print(&text);
            return true;
        }
        ConsoleCommand::Leave => SessionEvent::RequestLeave,
        ConsoleCommand::Help => {
            runtime.frontend_mut().print(HELP);
            return true;
        }
        ConsoleCommand::Quit => return false,
    };

    let leaving_archive =
        event == SessionEvent::RequestLeave && runtime.active() == SessionKind::Archive;
    let confirmed_leave = event == SessionEvent::Confirmed(ConfirmAction::Leave);
    runtime.dispatch(event).await;
    if leaving_archive || confirmed_leave {
        runtime.show(SessionKind::Live);
    }
    true
}

fn pending_confirmation(runtime: &mut Runtime) -> Option<ConfirmAction> {
    let action = runtime.frontend_mut().take_confirmation();
    if action.is_none() {
        runtime.frontend_mut().print("Nothing to confirm.");
    }
    action
}
