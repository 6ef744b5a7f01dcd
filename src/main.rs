//! Terry the Tube Kiosk - Main Entry Point
//!
//! Flags:
//! - `--websocket` / `--polling`: override the configured transport
//! - `--config <path>`: load an explicit configuration file
//! - `--debug`: verbose logging

use anyhow::{bail, Context, Result};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use terry_kiosk::business::{resolve_personality, HELP};
use terry_kiosk::state::SectionRenderer;
use terry_kiosk::{
    AppController, AppState, Command, ConnectionManager, Document, KioskConfig, PollingManager,
    SocketManager, StateStore, TerminalPainter, TokioFrames, TransportKind, UiEvent,
    ViewController,
};

struct Args {
    transport: Option<TransportKind>,
    config: Option<PathBuf>,
    debug: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        transport: None,
        config: None,
        debug: false,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--polling" => args.transport = Some(TransportKind::Polling),
            "--websocket" => args.transport = Some(TransportKind::Websocket),
            "--debug" | "-d" => args.debug = true,
            "--config" | "-c" => {
                let path = iter.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(args)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = parse_args()?;
    init_logging(args.debug);

    info!("Starting Terry the Tube kiosk v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => KioskConfig::load_from(path)?,
        None => KioskConfig::load_or_default()?,
    };
    if let Some(transport) = args.transport {
        config.server.transport = transport;
    }
    info!("Configuration loaded ({:?} transport)", config.server.transport);

    let local = tokio::task::LocalSet::new();
    local.run_until(run(config)).await
}

async fn run(config: KioskConfig) -> Result<()> {
    let store = StateStore::new(
        AppState::from_config(&config),
        TokioFrames::new(config.ui.frame_interval()),
    );
    let document = Rc::new(Document::kiosk());
    let view = ViewController::new(store.clone(), document.clone(), &config.ui);
    let renderer: Rc<dyn SectionRenderer> = view.clone();
    store.set_renderer(Rc::downgrade(&renderer));

    let connection: Rc<dyn ConnectionManager> = match config.server.transport {
        TransportKind::Websocket => SocketManager::new(
            store.clone(),
            view.clone(),
            config.server.websocket_url()?,
            &config.connection,
        ),
        TransportKind::Polling => PollingManager::new(
            store.clone(),
            view.clone(),
            config.server.http_base()?,
            &config.polling,
        )?,
    };

    let app = AppController::new(store.clone(), view.clone(), connection, &config.ui);
    app.init();

    let painter = TerminalPainter::new(document);
    let paint_interval = config.ui.paint_interval();
    tokio::task::spawn_local(async move {
        let mut ticker = tokio::time::interval(paint_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = painter.paint() {
                warn!("Failed to paint screen: {}", e);
            }
        }
    });

    println!("════════════════════════════════════════");
    println!("  Commands:");
    println!("{}", HELP);
    println!("════════════════════════════════════════");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!(">>> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            info!("Input closed");
            break;
        };

        match Command::parse(&line) {
            Command::Quit => {
                info!("User requested exit");
                break;
            }
            Command::Help => println!("{}", HELP),
            Command::ListPersonalities => {
                let personalities = store.read(|s| s.data.available_personalities.clone());
                if personalities.is_empty() {
                    println!("No personalities loaded yet");
                }
                for (n, personality) in personalities.iter().enumerate() {
                    println!("  {}) {} [{}]", n + 1, personality.name, personality.key);
                }
            }
            Command::Unknown(cmd) => {
                println!("Unknown command: {}", cmd);
                println!("{}", HELP);
            }
            Command::ChoosePersonality(choice) => {
                let personalities = store.read(|s| s.data.available_personalities.clone());
                match resolve_personality(&choice, &personalities) {
                    Some(key) => app.handle_event(UiEvent::PersonalityChanged(Some(key))),
                    None => println!("No personality matches {}", choice),
                }
            }
            command => {
                for event in command.into_events(&[]) {
                    app.handle_event(event);
                }
            }
        }
    }

    info!("Kiosk exited");
    Ok(())
}

fn init_logging(debug: bool) {
    let level = if debug {
        "terry_kiosk=debug"
    } else {
        "terry_kiosk=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
