//! Line-oriented cheddar front-end.
//!
//! Spawns the host process, then reads commands from stdin. Lines starting
//! with `/` are actions; anything else is sent to the assistant.

use anyhow::Context;
use cheddar::controller::history::MemoryConversationStorage;
use cheddar::host::stdio::StdioHostBridge;
use cheddar::settings::FileSettingsStore;
use cheddar::ui::{CaptureDefaults, Role, SessionView};
use cheddar::{Cheddar, CheddarConfig, LayoutMode, cheddar_dirs};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
commands:
  /start                 start capture
  /stop                  stop capture
  /init                  initialize the assistant
  /hide                  toggle window visibility
  /protect on|off        content protection
  /layout normal|compact layout mode
  /key <api key>         store the API key
  /prompt <text>         store the custom prompt
  /sessions              list stored conversations
  /quit                  quit the application
anything else is sent as a message";

/// Cheddar: AI-assistant session controller.
#[derive(Parser)]
#[command(name = "cheddar", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host executable, overriding the configured one.
    #[arg(long)]
    host: Option<PathBuf>,

    /// Settings file, overriding the default location.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout is the UI; logs go to a daily file.
    let logs_dir = cheddar_dirs::logs_dir();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("failed to create log directory {}", logs_dir.display()))?;
    let (log_writer, _log_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&logs_dir, "cheddar.log"));
    tracing_subscriber::fmt()
        .with_writer(log_writer)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cheddar=info")),
        )
        .init();

    let config_path = cli.config.unwrap_or_else(cheddar_dirs::config_file);
    let config = CheddarConfig::load_or_default(&config_path)?;

    let host_program = match cli.host.or_else(|| config.host.command.clone()) {
        Some(path) => path,
        None => sibling_host_binary()?,
    };
    let bridge = StdioHostBridge::spawn(&host_program.to_string_lossy(), &config.host.args)?;

    let settings_path = cli.settings.unwrap_or_else(cheddar_dirs::settings_file);
    let settings = FileSettingsStore::open(settings_path);

    let controller = Arc::new(
        Cheddar::new(Arc::new(settings), Arc::new(bridge))
            .with_conversation_storage(Arc::new(MemoryConversationStorage::new())),
    );
    controller.init_conversation_storage().await;

    let view = Arc::new(
        SessionView::new(Arc::clone(&controller))
            .with_capture_defaults(CaptureDefaults::from(&config.capture)),
    );

    let mut updates = view.subscribe_transcript();
    let printer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(message) => {
                    let label = match message.role {
                        Role::User => "you",
                        Role::Assistant => "assistant",
                        Role::System => "system",
                    };
                    println!("[{label}] {}", message.text);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "transcript printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut statuses = controller.subscribe_status();
    let status_printer = tokio::spawn(async move {
        loop {
            match statuses.recv().await {
                Ok(status) => eprintln!("status: {status}"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "status printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("Cheddar v{}", env!("CARGO_PKG_VERSION"));
    let platform = controller.platform();
    tracing::info!(
        view = controller.current_view(),
        is_linux = platform.is_linux,
        is_macos = platform.is_macos,
        "front-end ready"
    );

    let ready = controller
        .initialize_assistant(&config.assistant.profile, &config.assistant.language)
        .await;
    controller.set_status(if ready {
        "Assistant ready"
    } else {
        "Assistant not configured; set a key with /key"
    });
    println!("Type /help for commands.");

    let mut sends = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !run_line(&view, &config, line.trim(), &mut sends).await {
            break;
        }
    }

    drain_sends(&mut sends).await;
    view.teardown();
    // The printers stop once the last sender of each channel is gone, after
    // printing everything already queued.
    drop(view);
    drop(controller);
    let _ = printer.await;
    let _ = status_printer.await;
    Ok(())
}

/// Wait for every in-flight send so its reply reaches the transcript.
async fn drain_sends(sends: &mut JoinSet<()>) {
    while let Some(joined) = sends.join_next().await {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "send task failed");
        }
    }
}

/// Handle one input line. Returns `false` when the front-end should exit.
async fn run_line(
    view: &Arc<SessionView>,
    config: &CheddarConfig,
    line: &str,
    sends: &mut JoinSet<()>,
) -> bool {
    let controller = view.controller();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "/help" => println!("{HELP}"),
        "/start" => view.start_capture().await,
        "/stop" => view.stop_capture(),
        "/init" => {
            let ready = controller
                .initialize_assistant(&config.assistant.profile, &config.assistant.language)
                .await;
            controller.set_status(if ready {
                "Assistant ready"
            } else {
                "Assistant initialization failed"
            });
        }
        "/hide" => controller.toggle_window_visibility().await,
        "/protect" => match rest {
            "on" => controller.set_content_protection(true).await,
            "off" => controller.set_content_protection(false).await,
            "" => println!(
                "content protection is {}",
                if controller.get_content_protection() { "on" } else { "off" }
            ),
            other => println!("expected on or off, got {other:?}"),
        },
        "/layout" => match LayoutMode::parse(rest) {
            Some(mode) => controller.set_layout_mode(mode).await,
            None if rest.is_empty() => println!("layout is {}", controller.get_layout_mode()),
            None => println!("expected normal or compact, got {rest:?}"),
        },
        "/key" => {
            controller.set_api_key(rest);
            controller.set_status("API key saved");
        }
        "/prompt" => {
            controller.set_custom_prompt(rest);
            controller.set_status("Custom prompt saved");
        }
        "/sessions" => {
            let ids = controller.get_all_conversation_sessions().await;
            if ids.is_empty() {
                println!("no stored conversations");
            }
            for id in ids {
                println!("  {id}");
            }
        }
        "/quit" => {
            drain_sends(sends).await;
            controller.quit_application().await;
            return false;
        }
        _ => {
            // Sends run concurrently; replies still land in submission order.
            let view = Arc::clone(view);
            let text = line.to_owned();
            sends.spawn(async move {
                view.submit(&text).await;
            });
        }
    }
    true
}

/// `cheddar-host` installed next to the running executable.
fn sibling_host_binary() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the running executable")?;
    let dir = exe
        .parent()
        .context("running executable has no parent directory")?;
    Ok(dir.join(format!("cheddar-host{}", std::env::consts::EXE_SUFFIX)))
}
