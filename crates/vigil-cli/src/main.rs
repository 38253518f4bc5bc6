//! `vigil` — health assistant over a per-subject fact store.
//!
//! # Usage
//!
//! ```text
//! vigil init
//! vigil chat --user alice
//! vigil history --user alice --limit 7
//! vigil serve
//! ```
//!
//! Settings come from `config.toml` (or `--config FILE`) and `VIGIL_*`
//! environment variables.

mod settings;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::{
  io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader},
  net::TcpListener,
};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use vigil_api::AppState;
use vigil_core::{
  assistant::{Assistant, AssistantConfig, GREETING, Session},
  clock::{Clock, LocalClock},
  engine::UpsertEngine,
  memory::MemoryStore,
  store::FactStore,
  subject::SubjectName,
  window::{render_context, window},
};
use vigil_llm::GeminiClient;
use vigil_store_sqlite::SqliteStore;

use crate::settings::AppConfig;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Vigil health assistant")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "config.toml")]
  config: PathBuf,

  /// Keep everything in memory instead of the SQLite file.
  #[arg(long, global = true)]
  in_memory: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create the store and its schema, then exit.
  Init,
  /// Talk to the assistant on stdin. `exit` quits.
  Chat {
    #[arg(short, long)]
    user: String,
  },
  /// Print the history window for a subject as the assistant sees it.
  History {
    #[arg(short, long)]
    user:  String,
    #[arg(short, long)]
    limit: Option<usize>,
  },
  /// Serve the JSON API.
  Serve,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  let location = store_location(&cfg, cli.in_memory);
  if cli.in_memory {
    run(cli.command, &cfg, &location, Arc::new(MemoryStore::new())).await
  } else {
    let store = SqliteStore::open(&cfg.store_path)
      .await
      .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
    run(cli.command, &cfg, &location, Arc::new(store)).await
  }
}

async fn run<S>(
  command: Command,
  cfg: &AppConfig,
  location: &str,
  store: Arc<S>,
) -> anyhow::Result<()>
where
  S: FactStore + 'static,
{
  let engine = Arc::new(UpsertEngine::new(store));
  let clock: Arc<dyn Clock> = Arc::new(LocalClock);

  match command {
    Command::Init => {
      info!(%location, "store ready");
      Ok(())
    }
    Command::Chat { user } => chat(cfg, engine, clock, &user).await,
    Command::History { user, limit } => {
      let subject = SubjectName::parse(&user)?;
      let limit = limit.unwrap_or(cfg.window_limit);
      let days = window(engine.store().as_ref(), &subject, limit).await?;
      println!("{}", render_context(&days));
      Ok(())
    }
    Command::Serve => {
      let state = AppState::new(engine, clock).with_window_limit(cfg.window_limit);
      let app = vigil_api::api_router(state);
      let address = format!("{}:{}", cfg.host, cfg.port);

      info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
      Ok(())
    }
  }
}

// ─── Chat loop ───────────────────────────────────────────────────────────────

async fn chat<S>(
  cfg: &AppConfig,
  engine: Arc<UpsertEngine<S>>,
  clock: Arc<dyn Clock>,
  user: &str,
) -> anyhow::Result<()>
where
  S: FactStore + 'static,
{
  let subject = SubjectName::parse(user)?;
  let client = GeminiClient::new(cfg.api_key()?)?.with_model(cfg.model.clone());
  let assistant = Assistant::new(engine, client.clone(), client, clock, AssistantConfig {
    window_limit: cfg.window_limit,
    timeout:      Duration::from_secs(cfg.llm_timeout_secs),
  });
  let mut session = Session::new(subject);

  let mut stdout = tokio::io::stdout();
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  println!("Assistant: {GREETING}");
  loop {
    stdout.write_all(b"You: ").await?;
    stdout.flush().await?;

    let Some(line) = lines.next_line().await? else {
      break;
    };
    let input = line.trim();
    if input.is_empty() {
      continue;
    }
    if input.eq_ignore_ascii_case("exit") {
      break;
    }

    match assistant.process_turn(&mut session, input).await {
      Ok(turn) => println!("Assistant: {}", turn.reply),
      Err(err) if err.is_retryable() => {
        eprintln!("Something is unavailable right now, please try again later. ({err})");
      }
      Err(err) => eprintln!("Error: {err}"),
    }
  }

  println!("Goodbye!");
  Ok(())
}

/// Where the store lives, for log lines.
fn store_location(cfg: &AppConfig, in_memory: bool) -> String {
  if in_memory {
    "in memory (nothing is persisted)".to_owned()
  } else {
    cfg.store_path.display().to_string()
  }
}
