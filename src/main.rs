mod answer_client;
mod app;
mod config;
mod console;
mod frame_source;
mod ocr;
mod reasoner;
mod server;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use answer_client::HttpAnswerClient;
use app::{AppState, BackendEvent};
use config::Config;
use frame_source::DirectoryFrameSource;
use ocr::OcrSpaceClient;
use reasoner::ChatCompletionsClient;
use server::ServerState;

#[derive(Parser)]
#[command(name = "snap-answer")]
#[command(about = "Point a camera at a question, confirm the text, get an answer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the question-answering server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Watch a frame directory, recognize questions and ask for answers
    Scan {
        /// Directory the camera tool writes frames into
        #[arg(short, long)]
        frames: Option<PathBuf>,
        /// Base URL of the question-answering server
        #[arg(short, long)]
        server: Option<String>,
        /// Seconds between automatic captures
        #[arg(short, long)]
        interval: Option<u64>,
        /// Capture once right away instead of waiting one interval
        #[arg(long)]
        now: bool,
    },
    /// Query the server health endpoint
    Health {
        #[arg(short, long)]
        server: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::load();

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            log::debug!("Config: {config:?}");
            run_server(config).await
        }
        Commands::Scan {
            frames,
            server,
            interval,
            now,
        } => {
            if let Some(frames) = frames {
                config.frames_dir = frames;
            }
            if let Some(server) = server {
                config.server_url = server;
            }
            if let Some(secs) = interval.filter(|s| *s > 0) {
                config.capture_interval_secs = secs;
            }
            log::debug!("Config: {config:?}");
            run_scanner(config, now).await
        }
        Commands::Health { server } => {
            let url = server.unwrap_or(config.server_url);
            let body = HttpAnswerClient::new(url.as_str())
                .health()
                .await
                .with_context(|| format!("server at {url} is not reachable"))?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
    }
}

async fn run_server(config: Config) -> Result<()> {
    if config.reasoning.api_key.is_empty() {
        log::warn!("OPENAI_API_KEY is not set; upstream calls will be rejected");
    }
    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("invalid bind address")?;
    let state = ServerState {
        reasoner: Arc::new(ChatCompletionsClient::new(&config.reasoning)),
    };
    server::start_server(addr, state).await
}

async fn run_scanner(config: Config, capture_now: bool) -> Result<()> {
    if config.ocr.api_key.is_empty() {
        log::warn!("OCR_API_KEY is not set; recognition requests will be rejected");
    }
    log::info!(
        "Watching {} every {}s, answers from {}",
        config.frames_dir.display(),
        config.capture_interval_secs,
        config.server_url
    );

    // Single event loop: timer ticks, pipeline completions and user commands
    let (backend_tx, backend_rx) = async_channel::unbounded::<BackendEvent>();

    let mut state = AppState::new(
        backend_tx.clone(),
        Box::new(DirectoryFrameSource::new(&config.frames_dir)),
        Arc::new(OcrSpaceClient::new(&config.ocr)),
        Arc::new(HttpAnswerClient::new(config.server_url.as_str())),
        Duration::from_secs(config.capture_interval_secs),
    );

    console::spawn_command_reader(backend_tx);
    println!("{}", console::HELP);

    let mut renderer = console::Renderer::default();
    state.start();
    if capture_now {
        state.scheduler.trigger_now();
    }
    renderer.render(&state.overlay());

    loop {
        let event = tokio::select! {
            event = backend_rx.recv() => match event {
                Ok(event) => event,
                Err(_) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };
        app::handle_backend_event(&mut state, event);
        if !state.is_active() {
            break;
        }
        renderer.render(&state.overlay());
    }

    state.shutdown();
    Ok(())
}
