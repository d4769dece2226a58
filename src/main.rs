use std::io::{self, Write as _};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use time::UtcOffset;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use livechat_monitor::api::{ApiError, HttpMonitorApi, MonitorApi};
use livechat_monitor::clock::SystemClock;
use livechat_monitor::config::{ConfigArgs, ConfigError, DashboardConfig};
use livechat_monitor::dashboard::Dashboard;
use livechat_monitor::mock_backend::{self, MockStore};
use livechat_monitor::polling::{PollingLoop, RefreshTask};
use livechat_monitor::table::{ColumnSort, SortField, render_header, render_table};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("backend request failed: {0}")]
    Api(#[from] ApiError),
    #[error("I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "livechat-monitor", about = "Live chat participant monitor")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Live dashboard with auto-refresh; reads operator commands from stdin.
    Watch {
        /// Switch the backend to this video before the first refresh.
        #[arg(long)]
        video_id: Option<String>,
    },
    /// Fetch and print the participant table once.
    Users,
    /// Serve the in-process mock backend until Ctrl-C.
    MockServer {
        #[arg(long, env = "MONITOR_MOCK_PORT", default_value_t = 8080)]
        port: u16,
    },
}

// =============================================================================
// OPERATOR COMMANDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum OperatorCommand {
    Switch(String),
    Pull,
    Reset,
    Refresh,
    Interval(u64),
    Sort(Option<SortField>),
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
enum CommandError {
    #[error("unknown command '{0}' (try: switch, pull, reset, refresh, interval, sort, quit)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one stdin line. Blank lines yield `None`.
fn parse_operator_command(line: &str) -> Result<Option<OperatorCommand>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("switch", Some(id)) => OperatorCommand::Switch(id.to_owned()),
        ("switch", None) => return Err(CommandError::Usage("switch <videoId>")),
        ("pull", _) => OperatorCommand::Pull,
        ("reset", _) => OperatorCommand::Reset,
        ("refresh", _) => OperatorCommand::Refresh,
        ("interval", Some(secs)) => match secs.parse() {
            Ok(secs) => OperatorCommand::Interval(secs),
            Err(_) => return Err(CommandError::Usage("interval <seconds>")),
        },
        ("interval", None) => return Err(CommandError::Usage("interval <seconds>")),
        ("sort", Some("comments")) => OperatorCommand::Sort(Some(SortField::CommentCount)),
        ("sort", Some("first")) => OperatorCommand::Sort(Some(SortField::FirstCommentedAt)),
        ("sort", Some("none")) => OperatorCommand::Sort(None),
        ("sort", _) => return Err(CommandError::Usage("sort comments|first|none")),
        ("quit" | "exit", _) => OperatorCommand::Quit,
        (other, _) => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(Some(command))
}

// =============================================================================
// ENTRY
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = DashboardConfig::from_args(&cli.config)?;
    init_tracing(config.log_level);

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => debug!("no .env file"),
        Err(e) => warn!(error = %e, "ignoring unreadable .env"),
    }

    match cli.command {
        Command::Watch { video_id } => watch(&config, video_id).await,
        Command::Users => print_users(&config).await,
        Command::MockServer { port } => serve_mock(port).await,
    }
}

/// Logs go to stderr so stdout carries only the table. `RUST_LOG` wins.
fn init_tracing(level: tracing::Level) {
    let level = level.as_str().to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,livechat_monitor={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_dashboard(config: &DashboardConfig) -> Result<Arc<Dashboard>, CliError> {
    let api: Arc<dyn MonitorApi> = Arc::new(HttpMonitorApi::new(&config.backend_url, config.timeouts)?);
    Ok(Arc::new(Dashboard::new(
        api,
        Arc::new(SystemClock),
        config.utc_offset,
        config.refresh_interval.as_secs(),
    )))
}

// =============================================================================
// USERS
// =============================================================================

async fn print_users(config: &DashboardConfig) -> Result<(), CliError> {
    let dashboard = build_dashboard(config)?;
    dashboard.refresh().await?;

    let view = dashboard.snapshot();
    let mut out = io::stdout().lock();
    write!(out, "{}", render_header(&view))?;
    write!(out, "{}", render_table(&view.users, None, config.utc_offset))?;
    Ok(())
}

// =============================================================================
// WATCH
// =============================================================================

struct Screen {
    sort: Option<ColumnSort>,
    offset: UtcOffset,
    notice: Option<String>,
}

impl Screen {
    fn draw(&self, dashboard: &Dashboard) -> io::Result<()> {
        let view = dashboard.snapshot();
        let mut out = io::stdout().lock();
        // Clear and home the cursor.
        write!(out, "\x1b[2J\x1b[H")?;
        write!(out, "{}", render_header(&view))?;
        writeln!(out)?;
        write!(out, "{}", render_table(&view.users, self.sort, self.offset))?;
        if let Some(notice) = &self.notice {
            writeln!(out, "\n{notice}")?;
        }
        write!(out, "> ")?;
        out.flush()
    }
}

async fn watch(config: &DashboardConfig, video_id: Option<String>) -> Result<(), CliError> {
    let dashboard = build_dashboard(config)?;
    let mut changes = dashboard.subscribe();

    if let Some(video_id) = video_id {
        dashboard.set_video_id(video_id);
        if let Err(e) = dashboard.switch_video().await {
            warn!(error = %e, "initial switch failed");
        }
    }
    if let Err(e) = dashboard.refresh().await {
        warn!(error = %e, "initial refresh failed");
    }

    let task: Arc<dyn RefreshTask> = dashboard.clone();
    let mut poller = PollingLoop::new();
    poller.configure(config.refresh_interval, Arc::clone(&task));

    let mut screen = Screen { sort: None, offset: config.utc_offset, notice: None };
    screen.draw(&dashboard)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                screen.draw(&dashboard)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                screen.notice = None;
                match parse_operator_command(&line) {
                    Ok(Some(OperatorCommand::Quit)) => break,
                    Ok(Some(command)) => run_operator_command(command, &dashboard, &task, &mut poller, &mut screen),
                    Ok(None) => {}
                    Err(e) => screen.notice = Some(e.to_string()),
                }
                screen.draw(&dashboard)?;
            }
        }
    }

    poller.stop();
    Ok(())
}

fn run_operator_command(
    command: OperatorCommand,
    dashboard: &Arc<Dashboard>,
    task: &Arc<dyn RefreshTask>,
    poller: &mut PollingLoop,
    screen: &mut Screen,
) {
    let dash = Arc::clone(dashboard);
    match command {
        OperatorCommand::Switch(video_id) => {
            dashboard.set_video_id(video_id);
            tokio::spawn(async move { dash.switch_video().await });
        }
        OperatorCommand::Pull => {
            tokio::spawn(async move { dash.pull().await });
        }
        OperatorCommand::Reset => {
            tokio::spawn(async move { dash.reset().await });
        }
        OperatorCommand::Refresh => {
            tokio::spawn(async move { dash.refresh().await });
        }
        OperatorCommand::Interval(secs) => {
            dashboard.set_interval_secs(secs);
            poller.configure(Duration::from_secs(secs), Arc::clone(task));
        }
        OperatorCommand::Sort(field) => {
            screen.sort = field.map(|field| ColumnSort::toggle(screen.sort, field));
        }
        OperatorCommand::Quit => {}
    }
}

// =============================================================================
// MOCK SERVER
// =============================================================================

async fn serve_mock(port: u16) -> Result<(), CliError> {
    let app = mock_backend::router(MockStore::new());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    info!(%port, "mock backend listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed");
    }
    info!("shutting down");
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
