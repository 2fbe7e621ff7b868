mod app;
mod handler;
mod tui;
mod ui;

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use assistant_core::{
    control_meta, Admission, AiModel, AssistantControl, Config, Configuration, OpenAIClient,
};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use app::App;

#[derive(Parser)]
#[command(name = "ai-assistant")]
#[command(version, about = "Ask an OpenAI chat model from the terminal")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// API key (defaults to OPENAI_API_KEY, then the settings file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Chat model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// System prompt or persona
    #[arg(short, long, global = true)]
    system_prompt: Option<String>,

    /// Lock the system prompt so it cannot be edited
    #[arg(long, global = true)]
    no_system_edit: bool,

    /// Chat-completion endpoint URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive assistant (default)
    Tui {
        /// Prompt to pre-fill
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// Ask one question and print the resulting value-change event as JSON
    Ask {
        /// Your question
        prompt: String,
    },
    /// Print the control metadata as JSON
    Describe,
    /// List the supported chat models
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui { prompt: None });

    init_logging(cli.verbose, matches!(command, Commands::Tui { .. }))?;

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not read settings; using defaults");
        Config::new()
    });
    if let Some(model) = cli.model {
        config.model = Some(model);
    }
    if let Some(system_prompt) = cli.system_prompt {
        config.system_prompt = Some(system_prompt);
    }
    if cli.no_system_edit {
        config.allow_system_prompt = Some(false);
    }
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }

    let mut configuration = config.to_configuration()?;
    if let Some(key) = cli.api_key {
        configuration.api_key = key;
    }
    if configuration.api_key.is_empty() && !matches!(command, Commands::Describe | Commands::Models) {
        warn!("no API key configured; requests will be rejected by the endpoint");
    }

    match command {
        Commands::Tui { prompt } => {
            if prompt.is_some() {
                config.prompt = prompt;
            }
            run_tui(config, configuration).await
        }
        Commands::Ask { prompt } => ask(&config, configuration, prompt).await,
        Commands::Describe => {
            println!("{}", serde_json::to_string_pretty(&control_meta())?);
            Ok(())
        }
        Commands::Models => {
            for model in AiModel::all() {
                println!("{:<20} {}", model.as_str(), model.display_name());
            }
            Ok(())
        }
    }
}

/// Level used when `RUST_LOG` is unset, in every mode.
fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Logs go to a file while the terminal UI owns the screen, stderr otherwise.
fn init_logging(verbose: bool, to_file: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false);

    if to_file {
        let dir = Config::config_dir()?;
        std::fs::create_dir_all(&dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("ai-assistant.log"))?;
        let subscriber = builder.with_ansi(false).with_writer(Mutex::new(file)).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = builder.with_writer(std::io::stderr).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

async fn run_tui(config: Config, configuration: Configuration) -> Result<()> {
    let mut app = App::new(config, configuration)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = event_loop(&mut terminal, &mut app).await;
    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new();
    app.mount();
    info!("assistant ready");

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;
        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
        app.poll_completion().await;
    }
    Ok(())
}

async fn ask(config: &Config, configuration: Configuration, prompt: String) -> Result<()> {
    let client = OpenAIClient::with_endpoint(config.endpoint());
    let (mut control, mut events) = AssistantControl::new(configuration, client);
    control.set_prompt_text(prompt);

    if control.submit()? == Admission::Ignored {
        bail!("Prompt is empty; nothing to ask");
    }
    control.wait_for_completion().await;

    let event = events
        .recv()
        .await
        .ok_or_else(|| anyhow!("completion settled without a notification"))?;
    println!("{}", serde_json::to_string_pretty(&event)?);

    if !event.is_success() {
        bail!("{}", event.detail);
    }
    Ok(())
}
