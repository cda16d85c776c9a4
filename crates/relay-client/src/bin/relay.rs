use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use relay_client::{RelayClient, discover, output, status, watermark};

/// Message relay for agent communication.
#[derive(Parser)]
#[command(name = "relay", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a message
    Say(SayArgs),
    /// Receive messages
    Hear(HearArgs),
    /// Show message history
    Log(LogArgs),
    /// Check whether the relay is running
    Status(ServerArg),
}

#[derive(Args)]
struct ServerArg {
    /// Server URL (default: $RELAY_SERVER, then auto-discover)
    #[arg(long)]
    server: Option<String>,
}

#[derive(Args)]
struct SayArgs {
    /// Sender name (default: $USER)
    #[arg(long)]
    from: Option<String>,
    #[command(flatten)]
    server: ServerArg,
    /// Message text; read from stdin when omitted
    message: Vec<String>,
}

#[derive(Args)]
struct HearArgs {
    /// Name to receive messages for (default: $USER)
    #[arg(long = "for")]
    for_name: Option<String>,
    #[command(flatten)]
    server: ServerArg,
    /// Hear all messages, not just mentions
    #[arg(long)]
    all: bool,
    /// Stream messages live instead of polling
    #[arg(long)]
    stream: bool,
    /// Show at most this many of the newest messages (0 = all)
    #[arg(long, default_value_t = 0)]
    limit: usize,
}

#[derive(Args)]
struct LogArgs {
    #[command(flatten)]
    server: ServerArg,
    /// Maximum messages to show (0 = all)
    #[arg(long, default_value_t = 0)]
    limit: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Say(args) => say(args).await,
        Command::Hear(args) => hear(args).await,
        Command::Log(args) => log(args).await,
        Command::Status(args) => relay_status(args).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn default_name(explicit: Option<String>, flag: &str) -> Result<String> {
    explicit
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("USER").ok().filter(|s| !s.is_empty()))
        .or_else(|| std::env::var("USERNAME").ok().filter(|s| !s.is_empty()))
        .with_context(|| format!("--{flag} is required (or $USER must be set)"))
}

fn client_for(server: &ServerArg) -> Result<RelayClient> {
    let url = discover::resolve_server_url(server.server.as_deref())?;
    Ok(RelayClient::new(&url))
}

async fn say(args: SayArgs) -> Result<ExitCode> {
    let from = default_name(args.from, "from")?;
    let client = client_for(&args.server)?;

    let message = if args.message.is_empty() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("read stdin")?;
        buf
    } else {
        args.message.join(" ")
    };

    let message = message.trim();
    if message.is_empty() {
        bail!("no message provided");
    }

    client.post_message(&from, message).await?;
    Ok(ExitCode::SUCCESS)
}

async fn hear(args: HearArgs) -> Result<ExitCode> {
    let name = default_name(args.for_name, "for")?;
    let client = client_for(&args.server)?;

    if args.stream {
        return hear_stream(&client).await;
    }

    let cwd = std::env::current_dir()?;
    let relay_dir = discover::find_relay_dir(&cwd)?;
    let path = watermark::watermark_path(&relay_dir, &name);
    let last_id = watermark::read_last_id(&path).context("read lastid")?;

    let messages = client.fetch_messages(&name, last_id, args.all).await?;

    let shown = watermark::limit_messages(&messages, args.limit);
    output::write_messages(&mut io::stdout().lock(), shown)?;

    // Advance past everything fetched, including messages hidden by --limit.
    if let Some(highest) = watermark::highest_id(&messages) {
        watermark::write_last_id(&path, highest).context("write lastid")?;
    }

    Ok(ExitCode::SUCCESS)
}

async fn hear_stream(client: &RelayClient) -> Result<ExitCode> {
    let follow = client.stream_with_reconnect(
        |msg| {
            let mut out = io::stdout().lock();
            let _ = output::write_message(&mut out, &msg);
            let _ = out.flush();
        },
        |delay, e| eprintln!("connection lost, retrying in {delay:?}: {e}"),
    );

    tokio::select! {
        _ = follow => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    Ok(ExitCode::SUCCESS)
}

async fn log(args: LogArgs) -> Result<ExitCode> {
    let client = client_for(&args.server)?;
    let messages = client.fetch_log(args.limit).await?;
    output::write_log(&mut io::stdout().lock(), &messages)?;
    Ok(ExitCode::SUCCESS)
}

async fn relay_status(args: ServerArg) -> Result<ExitCode> {
    let cwd = std::env::current_dir()?;
    let status = status::check(args.server.as_deref(), &cwd).await;
    println!("{status}");

    Ok(if status.is_up() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
