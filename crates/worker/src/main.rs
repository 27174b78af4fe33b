use anyhow::Context;
use bazaar_core::domain::market::AnalysisSnapshot;
use bazaar_core::llm::error::ErrorKind;
use bazaar_core::llm::gemini::GeminiClient;
use bazaar_core::llm::request::AnalysisRequest;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "bazaar_worker")]
struct Args {
    /// Print the request descriptor that would be sent, without calling out.
    #[arg(long)]
    dry_run: bool,

    /// Accept replies with empty prices or strategies.
    #[arg(long)]
    allow_empty: bool,

    /// Also print the raw Gemini envelope (or the raw payload on a parse failure).
    #[arg(long)]
    raw: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = bazaar_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if args.allow_empty {
        settings.require_non_empty = Some(false);
    }

    if args.dry_run {
        let request = AnalysisRequest::build(&settings.prompt_profile());
        tracing::info!(dry_run = true, "market analysis fetch (dry-run)");
        println!(
            "{}",
            serde_json::to_string_pretty(&request).context("failed to serialize request")?
        );
        return Ok(());
    }

    let outcome = match GeminiClient::from_settings(&settings) {
        Ok(client) => client.fetch_analysis_with_raw().await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok((result, raw_json)) => {
            let snapshot = AnalysisSnapshot::new(result, chrono::Utc::now());
            tracing::info!(
                fetch_id = %snapshot.fetch_id,
                prices = snapshot.result.prices.len(),
                strategies = snapshot.result.strategies.len(),
                sources = snapshot.result.sources.len(),
                "fetched market analysis"
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&snapshot).context("failed to serialize snapshot")?
            );
            if args.raw {
                println!("{}", serde_json::to_string_pretty(&raw_json)?);
            }
            Ok(())
        }
        Err(err) => {
            if args.raw {
                if let Some(raw) = err.raw_output() {
                    eprintln!("{raw}");
                }
            }
            let kind = err.kind();
            let message = err.user_message();
            let err = anyhow::Error::new(err);
            if kind != ErrorKind::RateLimited {
                sentry_anyhow::capture_anyhow(&err);
            }
            tracing::error!(?kind, error = %err, "market analysis fetch failed");
            Err(err.context(message))
        }
    }
}

fn init_sentry(settings: &bazaar_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
