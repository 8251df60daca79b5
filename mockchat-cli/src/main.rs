//! CLI entry point for mockchat

mod chat;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Input, Password};
use mockchat_core::auth::{self, Route, SessionStore};
use mockchat_core::config::{Config, ConfigLoader};
use mockchat_core::logging::init_logging;
use mockchat_core::storage::FileStore;
use mockchat_core::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "mockchat")]
#[command(about = "A demo chat with mocked sign-in and canned replies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
        /// Email address
        #[arg(short, long)]
        email: Option<String>,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign in to an existing account
    Login {
        /// Email address
        #[arg(short, long)]
        email: Option<String>,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Show configuration and storage status
    Status,
    /// Open the interactive chat
    Chat,
}

/// Everything a command needs, built once per invocation
struct App {
    loader: ConfigLoader,
    config: Config,
    sessions: SessionStore,
    storage: Arc<FileStore>,
}

impl App {
    fn open(loader: ConfigLoader) -> Result<Self> {
        let mut config = loader.load()?;

        let log_dir = PathBuf::from(&config.logging.dir);
        if log_dir.is_relative() {
            config.logging.dir = loader.config_dir().join(log_dir).display().to_string();
        }

        let storage = Arc::new(FileStore::new(
            config.storage.resolve_dir(loader.config_dir()),
        ));
        let sessions = SessionStore::new(storage.clone(), config.auth.clone());

        Ok(Self {
            loader,
            config,
            sessions,
            storage,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };
    let app = App::open(config_loader)?;
    let _log_guard = init_logging(&app.config.logging);

    match cli.command {
        Commands::Register {
            name,
            email,
            password,
        } => {
            info!("Running register command");
            run_register(&app, name, email, password).await?;
        }
        Commands::Login { email, password } => {
            info!("Running login command");
            run_login(&app, email, password).await?;
        }
        Commands::Logout => {
            app.sessions.end_session()?;
            println!("{}", style("Signed out.").green());
        }
        Commands::Whoami => run_whoami(&app)?,
        Commands::Status => run_status(&app)?,
        Commands::Chat => {
            info!("Starting chat");
            chat::run_chat(&app.sessions, &app.config).await?;
        }
    }

    Ok(())
}

fn prompt_text(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
    }
}

fn prompt_secret(value: Option<String>, confirm: bool) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

async fn run_register(
    app: &App,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let name = prompt_text(name, "Name")?;
    let email = prompt_text(email, "Email")?;
    let password = prompt_secret(password, true)?;

    match app.sessions.register(name, email, password).await {
        Ok(session) => {
            println!(
                "{} Welcome, {}!",
                style("✓").green().bold(),
                style(&session.display_name).bold()
            );
            Ok(())
        }
        Err(Error::AlreadyExists(email)) => {
            bail!("an account for {} already exists; try `mockchat login`", email)
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_login(app: &App, email: Option<String>, password: Option<String>) -> Result<()> {
    let email = prompt_text(email, "Email")?;
    let password = prompt_secret(password, false)?;

    match app.sessions.authenticate(&email, &password).await {
        Ok(session) => {
            println!(
                "{} Signed in as {}",
                style("✓").green().bold(),
                style(&session.display_name).bold()
            );
            Ok(())
        }
        Err(Error::InvalidCredentials) => bail!("invalid email or password"),
        Err(e) => Err(e.into()),
    }
}

fn run_whoami(app: &App) -> Result<()> {
    match auth::route(&app.sessions) {
        Route::Chat(session) => {
            println!("{} <{}>", style(&session.display_name).bold(), session.email)
        }
        Route::Login => println!("{}", style("Not signed in").dim()),
    }
    Ok(())
}

fn run_status(app: &App) -> Result<()> {
    println!("{}", style("mockchat Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", app.loader.config_dir().display());
    println!("  Storage directory: {}", app.storage.dir().display());
    println!("  Log directory: {}", app.config.logging.dir);
    println!();

    println!("{}", style("Accounts:").bold());
    println!("  Registered: {}", app.sessions.registered_count()?);
    match app.sessions.current_session() {
        Some(session) => println!("  Signed in: {}", style(&session.email).green()),
        None => println!("  Signed in: {}", style("no").dim()),
    }
    println!();

    println!("{}", style("Chat:").bold());
    println!("  Default model: {}", app.config.chat.default_model);
    println!("  Reply delay: {}ms", app.config.chat.reply_delay_ms);
    Ok(())
}
