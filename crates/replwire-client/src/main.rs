//! replwire entry point.
//!
//! Connects to a remote REPL server, forwards what the user types and prints
//! what the server answers.  Messages on the wire are raw bytes followed by
//! one `0x04` byte.
//!
//! # Usage
//!
//! ```text
//! replwire [OPTIONS] [HOST] [PORT]
//!
//! Arguments:
//!   [HOST]  REPL server host [default: localhost]
//!   [PORT]  REPL server port [default: 11211]
//!
//! Options:
//!       --config <PATH>      Config file [default: platform config dir]
//!       --chunk-size <N>     Most bytes per read or write call [default: 1024]
//!       --mode <MODE>        line | balanced [default: balanced]
//!       --no-prompt          Never print the input prompt
//!   -e, --eval <CODE>        Send CODE before reading stdin (repeatable)
//!       --log-file <PATH>    Write logs to PATH instead of stderr
//!       --log-level <LEVEL>  Log filter when RUST_LOG is unset [default: info]
//!       --print-config       Print the effective configuration and exit
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence over the environment, which takes precedence over
//! the config file.
//!
//! | Variable               | Overrides      |
//! |------------------------|----------------|
//! | `REPLWIRE_HOST`        | `[HOST]`       |
//! | `REPLWIRE_PORT`        | `[PORT]`       |
//! | `REPLWIRE_CONFIG`      | `--config`     |
//! | `REPLWIRE_CHUNK_SIZE`  | `--chunk-size` |
//! | `REPLWIRE_MODE`        | `--mode`       |
//! | `REPLWIRE_LOG_FILE`    | `--log-file`   |
//! | `REPLWIRE_LOG_LEVEL`   | `--log-level`  |
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ InputSource thread    stdin -> BlockComposer -> OutboundQueue
//!  └─ EventLoop::run()      OutboundQueue -> Connection -> socket
//!                           socket -> Connection -> stdout
//!  └─ signal task           Ctrl-C / SIGTERM -> ShutdownHandle
//! ```

use std::fs::OpenOptions;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use replwire_client::application::compose_input::{BlockComposer, InputMode};
use replwire_client::infrastructure::input_source::InputSource;
use replwire_client::infrastructure::network::{
    Connection, ConnectionConfig, EventLoop, OutboundQueue, WriterSink,
};
use replwire_client::infrastructure::storage::config::{load_config, AppConfig, LoggingSection};
use replwire_core::Message;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Interactive client for EOT-delimited remote REPL servers.
#[derive(Debug, Parser)]
#[command(name = "replwire", version)]
struct Cli {
    /// REPL server host.
    #[arg(env = "REPLWIRE_HOST")]
    host: Option<String>,

    /// REPL server port.
    #[arg(env = "REPLWIRE_PORT")]
    port: Option<u16>,

    /// Config file to read instead of the platform default.
    #[arg(long, value_name = "PATH", env = "REPLWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Most bytes moved by one read or write call.
    #[arg(long, value_name = "N", env = "REPLWIRE_CHUNK_SIZE")]
    chunk_size: Option<usize>,

    /// How input lines are grouped into messages.
    #[arg(long, value_enum, env = "REPLWIRE_MODE")]
    mode: Option<InputMode>,

    /// Never print the input prompt.
    #[arg(long)]
    no_prompt: bool,

    /// Code to send before reading stdin.  May be repeated; sent in order.
    #[arg(short, long = "eval", value_name = "CODE")]
    eval: Vec<String>,

    /// Write logs to this file instead of stderr.
    #[arg(long, value_name = "PATH", env = "REPLWIRE_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, value_name = "LEVEL", env = "REPLWIRE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    /// Layers the command-line values over `config`.
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.connection.host = host.clone();
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.connection.chunk_size = chunk_size;
        }
        if let Some(mode) = self.mode {
            config.input.mode = mode;
        }
        if self.no_prompt {
            config.input.prompt.clear();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }

    /// The `--eval` forms as messages.
    ///
    /// # Errors
    ///
    /// Fails if any form contains the message terminator.
    fn eval_messages(&self) -> anyhow::Result<Vec<Message>> {
        self.eval
            .iter()
            .map(|code| {
                Message::new(code.as_str()).with_context(|| format!("invalid --eval form {code:?}"))
            })
            .collect()
    }
}

// ── Logging ───────────────────────────────────────────────────────────────────

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level.  Logs never go to stdout,
/// which carries REPL output only.
fn init_logging(logging: &LoggingSection) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("invalid log level {:?}", logging.level))?,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

// ── Signals ───────────────────────────────────────────────────────────────────

/// Resolves on Ctrl-C, or SIGTERM on Unix.  Never resolves if no handler
/// could be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_to(&mut config);
    config.validate().context("invalid configuration")?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&config.logging)?;
    let eval = cli.eval_messages()?;

    let host = config.connection.host.clone();
    let port = config.connection.port;
    info!(%host, port, mode = ?config.input.mode, "replwire starting");

    // ── Connection ────────────────────────────────────────────────────────────
    let queue = OutboundQueue::new();
    let mut connection: Connection<TcpStream> = Connection::new(
        ConnectionConfig {
            chunk_size: config.connection.chunk_size,
        },
        queue.clone(),
        Box::new(WriterSink::stdout()),
    );
    connection
        .open(&host, port)
        .await
        .context("could not reach the REPL server")?;

    for msg in eval {
        connection.enqueue(msg);
    }

    // ── Input thread ──────────────────────────────────────────────────────────
    let interactive = io::stdin().is_terminal();
    let prompt = (interactive && !config.input.prompt.is_empty()).then(|| config.input.prompt.clone());
    let input = InputSource::spawn(
        BufReader::new(io::stdin()),
        io::stdout(),
        BlockComposer::new(config.input.mode),
        prompt,
        queue,
    )
    .context("failed to start the input thread")?;

    // ── Event loop ────────────────────────────────────────────────────────────
    let mut event_loop = EventLoop::new();
    let shutdown = event_loop.shutdown_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        shutdown.trigger();
    });

    event_loop.register(Box::new(connection));
    event_loop.run().await;

    match input.shutdown() {
        Some(Ok(summary)) => debug!(?summary, "input thread joined"),
        Some(Err(e)) => warn!("{e}"),
        None => {}
    }

    info!("replwire stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use replwire_client::infrastructure::storage::config::ConfigError;

    use super::*;

    #[test]
    fn test_cli_without_arguments_keeps_config_values() {
        // Arrange
        let cli = Cli::parse_from(["replwire"]);
        let mut config = AppConfig::default();

        // Act
        cli.apply_to(&mut config);

        // Assert
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_cli_positional_host_and_port_override() {
        let cli = Cli::parse_from(["replwire", "10.0.0.5", "5555"]);
        let mut config = AppConfig::default();

        cli.apply_to(&mut config);

        assert_eq!(config.connection.host, "10.0.0.5");
        assert_eq!(config.connection.port, 5555);
    }

    #[test]
    fn test_cli_chunk_size_and_mode_override() {
        let cli = Cli::parse_from(["replwire", "--chunk-size", "8", "--mode", "line"]);
        let mut config = AppConfig::default();

        cli.apply_to(&mut config);

        assert_eq!(config.connection.chunk_size, 8);
        assert_eq!(config.input.mode, InputMode::Line);
    }

    #[test]
    fn test_cli_no_prompt_clears_prompt() {
        let cli = Cli::parse_from(["replwire", "--no-prompt"]);
        let mut config = AppConfig::default();

        cli.apply_to(&mut config);

        assert!(config.input.prompt.is_empty());
    }

    #[test]
    fn test_cli_logging_overrides() {
        let cli = Cli::parse_from(["replwire", "--log-level", "debug", "--log-file", "/tmp/r.log"]);
        let mut config = AppConfig::default();

        cli.apply_to(&mut config);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/r.log")));
    }

    #[test]
    fn test_cli_zero_chunk_size_fails_validation() {
        let cli = Cli::parse_from(["replwire", "--chunk-size", "0"]);
        let mut config = AppConfig::default();

        cli.apply_to(&mut config);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_huge_chunk_size_fails_validation() {
        let huge = usize::MAX.to_string();
        let cli = Cli::parse_from(["replwire", "--chunk-size", huge.as_str()]);
        let mut config = AppConfig::default();

        cli.apply_to(&mut config);

        assert!(matches!(config.validate(), Err(ConfigError::InvalidChunkSize)));
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        let result = Cli::try_parse_from(["replwire", "--mode", "vertical"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_eval_forms_keep_order() {
        // Arrange
        let cli = Cli::parse_from(["replwire", "-e", "(ns user)", "--eval", "(+ 1 2)"]);

        // Act
        let msgs = cli.eval_messages().unwrap();

        // Assert
        assert_eq!(msgs, vec![Message::new("(ns user)").unwrap(), Message::new("(+ 1 2)").unwrap()]);
    }

    #[test]
    fn test_eval_form_with_terminator_is_rejected() {
        let cli = Cli::parse_from(["replwire", "--eval", "bad\u{4}"]);
        assert!(cli.eval_messages().is_err());
    }
}
