use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use assist_client::audio::{OutputTarget, SinkOpener};
use assist_client::auth::{completer_for, ClientSecrets, OAuthClient, OAuthTokenProvider, TokenCache};
use assist_client::{AppConfig, AssistantClient, CallReport, GrpcTransport, StreamingSession};

/// Assist - text queries to the Google Assistant, spoken answers back
#[derive(Parser)]
#[command(name = "assist", version, about)]
struct Cli {
    /// Path to the OAuth client secrets file
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    creds: Option<PathBuf>,

    /// Path to the cached access token [default: ~/oauthTokenCache]
    #[arg(long)]
    cache: Option<String>,

    /// Language code of the conversation
    #[arg(long)]
    lang: Option<String>,

    /// Delete the cached token before starting
    #[arg(long)]
    logout: bool,

    /// Paste the authorization code instead of using a local redirect (e.g. over SSH)
    #[arg(long)]
    remote: bool,

    /// Configuration file (defaults, then this file, then ASSIST_* env vars)
    #[arg(long)]
    config: Option<String>,

    /// Session timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write response audio to a WAV file instead of the output device
    #[arg(long)]
    wav_out: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    debug: bool,

    /// Read queries line by line from stdin, keeping the conversation going
    #[arg(long)]
    repl: bool,

    /// What to ask
    query: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let Some(creds) = cli.creds.clone() else {
        eprintln!("you need to provide a path to your credentials (--creds) or set GOOGLE_APPLICATION_CREDENTIALS");
        return ExitCode::FAILURE;
    };

    match run(cli, creds).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, creds: PathBuf) -> Result<()> {
    let mut app = AppConfig::load(cli.config.as_deref())?;
    if let Some(lang) = &cli.lang {
        app.assistant.language_code = lang.clone();
    }
    if let Some(secs) = cli.timeout {
        app.assistant.timeout_secs = secs;
    }

    let cache = match &cli.cache {
        Some(path) => TokenCache::expanded(path),
        None => TokenCache::default_location(),
    };
    if cli.logout {
        println!("Deleting potential oauth cache");
        if cache.remove()? {
            info!("Removed {}", cache.path().display());
        }
    }

    let secrets = ClientSecrets::load(&creds)?;
    let completer = completer_for(cli.remote);
    let oauth = OAuthClient::new(&secrets.installed, completer.redirect_uri())?;
    let provider = Arc::new(OAuthTokenProvider::new(oauth, cache));
    provider
        .bootstrap(completer.as_ref())
        .await
        .context("Failed to obtain credentials")?;
    println!("Launching the Google Assistant");

    let output: Arc<dyn SinkOpener> = match cli.wav_out {
        Some(path) => Arc::new(OutputTarget::Wav(path)),
        None => Arc::new(OutputTarget::Device),
    };
    let session = StreamingSession::new(Arc::new(GrpcTransport::new(&app.assistant.endpoint)), output)
        .with_channels(app.audio.channels)
        .with_frame_size(app.audio.frame_size);

    let mut client = AssistantClient::new(app.session_config(), provider, session)
        .with_timeout(app.timeout());

    let cancel = client.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the session");
            cancel.cancel();
        }
    });

    if cli.repl {
        return repl(&mut client).await;
    }

    let Some(query) = cli.query else {
        bail!("nothing to ask: pass a query or use --repl");
    };
    let report = client.call(&query).await?;
    print_report(&report);
    Ok(())
}

/// One query per line; `reset` starts a new conversation, `quit` leaves
async fn repl(client: &mut AssistantClient) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type a query, `reset` for a new conversation or `quit` to leave");

    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        match query {
            "" => continue,
            "quit" | "exit" => break,
            "reset" => {
                client.reset_conversation();
                continue;
            }
            _ => {}
        }

        match client.call(query).await {
            Ok(report) => print_report(&report),
            Err(e) if client.cancellation_token().is_cancelled() => {
                eprintln!("{e}");
                break;
            }
            Err(e) => eprintln!("{e}"),
        }
    }

    Ok(())
}

fn print_report(report: &CallReport) {
    if let Some(text) = &report.display_text {
        println!("{text}");
    }
    if report.follow_on {
        println!("(the assistant is waiting for a follow-up)");
    }
    info!(
        "Played {} frames in {:.1}s",
        report.stats.frames_written, report.stats.duration_secs
    );
}
