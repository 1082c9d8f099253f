use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gpttui_core::constants::defaults;
use gpttui_core::llm;
use gpttui_core::store::open_store;
use gpttui_core::{BackendKind, ConversationController, SessionManager, Settings, StoreKind};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

mod app;
mod keys;
mod theme;

#[derive(Parser)]
#[command(name = "gpttui")]
#[command(about = "gpttui - terminal chat client with persistent sessions")]
#[command(version)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    chat: ChatArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Open the chat UI (default)
    Chat(ChatArgs),
    /// Write the default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// List stored sessions
    Sessions {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Delete a session and all of its messages
    Delete {
        session: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Send one message and print the reply
    Ask {
        text: String,
        #[command(flatten)]
        chat: ChatArgs,
    },
}

#[derive(clap::Args, Default, Clone)]
struct StoreArgs {
    /// Storage backend (sqlite, memory)
    #[arg(long)]
    database_kind: Option<StoreKind>,

    /// Database file
    #[arg(long)]
    database: Option<PathBuf>,
}

#[derive(clap::Args, Default, Clone)]
struct ChatArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Session name
    #[arg(long)]
    session: Option<String>,

    /// Model backend (openai, chatsonic, colossal)
    #[arg(long)]
    backend: Option<BackendKind>,

    /// OpenAI model name
    #[arg(long)]
    model: Option<String>,

    /// System context used to seed new sessions
    #[arg(long)]
    context: Option<String>,

    /// Color theme (gruvbox, dark)
    #[arg(long)]
    theme: Option<String>,
}

impl StoreArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(kind) = self.database_kind {
            settings.general.database_kind = kind;
        }
        if let Some(ref path) = self.database {
            settings.general.database = path.clone();
        }
    }
}

impl ChatArgs {
    fn apply(&self, settings: &mut Settings) {
        self.store.apply(settings);
        if let Some(ref session) = self.session {
            settings.general.session = session.clone();
        }
        if let Some(backend) = self.backend {
            settings.general.backend = backend;
        }
        if let Some(ref model) = self.model {
            settings.openai.model = model.clone();
        }
        if let Some(ref context) = self.context {
            settings.general.context = context.clone();
        }
        if let Some(ref theme) = self.theme {
            settings.general.theme = theme.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);

    match cli.command {
        Some(Command::Init { force }) => {
            if Settings::init_at(&config_path, force)? {
                println!("Wrote {}", config_path.display());
            } else {
                println!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
        }
        Some(Command::Sessions { store }) => {
            let mut settings = load_settings(cli.config.as_deref())?;
            store.apply(&mut settings);
            let store = open_store(settings.general.database_kind, &settings.general.database)?;
            for name in store.list_sessions()? {
                println!("{name}");
            }
            store.close()?;
        }
        Some(Command::Delete { session, store }) => {
            let mut settings = load_settings(cli.config.as_deref())?;
            store.apply(&mut settings);
            let store = open_store(settings.general.database_kind, &settings.general.database)?;
            store
                .delete_session(&session)
                .with_context(|| format!("Failed to delete session '{session}'"))?;
            store.close()?;
            println!("Deleted session '{session}'");
        }
        Some(Command::Ask { text, chat }) => {
            let mut settings = load_settings(cli.config.as_deref())?;
            chat.apply(&mut settings);
            let controller = build_controller(&settings)?;
            app::run_single_prompt(&controller, &text).await?;
        }
        Some(Command::Chat(chat)) => run_chat(cli.config.as_deref(), &chat).await?,
        None => run_chat(cli.config.as_deref(), &cli.chat).await?,
    }

    Ok(())
}

async fn run_chat(config: Option<&Path>, chat: &ChatArgs) -> Result<()> {
    let mut settings = load_settings(config)?;
    chat.apply(&mut settings);
    let controller = build_controller(&settings)?;
    let theme = settings.general.theme.clone();
    app::run_tui(controller, &settings, &theme).await
}

/// An explicit `--config` must parse; the default location falls back to
/// defaults.
fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Ok(Settings::load_from(path)?),
        None => Ok(Settings::load()),
    }
}

fn build_controller(settings: &Settings) -> Result<ConversationController> {
    let store = open_store(settings.general.database_kind, &settings.general.database)
        .with_context(|| {
            format!(
                "Failed to open database {}",
                settings.general.database.display()
            )
        })?;
    let session = SessionManager::new(
        store,
        settings.general.session.clone(),
        settings.general.context.clone(),
    )?;
    let backend = llm::configure(settings.backend_config(), session)?;
    Ok(ConversationController::new(backend))
}

/// Log to a file under the config dir; the TUI owns the terminal.
/// `RUST_LOG` overrides the default `warn` level.
fn init_logging() {
    let log_path = Settings::config_dir().join(defaults::LOG_FILE);
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}
