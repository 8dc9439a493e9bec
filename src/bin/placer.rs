use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "placer", version, about)]
struct Cli {
    /// `;`-separated `reddit_session` cookie values, one per account.
    #[arg(env = "REDDIT_SESSION", hide_env_values = true)]
    sessions: Option<String>,

    /// Spread the first attempts over this many seconds.
    #[arg(long, value_name = "SECS")]
    stagger: Option<u64>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    dump_config: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = placer::PlacerConfig::default();
    if let Some(secs) = cli.stagger {
        config.timings.stagger_window = std::time::Duration::from_secs(secs);
    }
    config.validate()?;

    if cli.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let sessions = cli
        .sessions
        .as_deref()
        .map(placer::parse_sessions)
        .unwrap_or_default();
    if sessions.is_empty() {
        anyhow::bail!(
            "no reddit_session cookie given; pass it as the first argument or set REDDIT_SESSION (separate several accounts with ';')"
        );
    }

    tracing::info!("placer v{}", env!("CARGO_PKG_VERSION"));
    for warning in config.account_warnings(sessions.len()) {
        tracing::warn!("{warning}");
    }

    run(&config, sessions)
}

fn run(config: &placer::PlacerConfig, sessions: Vec<placer::SessionCookie>) -> anyhow::Result<()> {
    let channel = placer::RealtimeChannel::spawn(config.channel_config())
        .context("start coordination channel")?;

    let images: Arc<dyn placer::ImageFetcher> = Arc::new(
        placer::HttpImageFetcher::new(&config.user_agent).context("build image fetcher")?,
    );
    let locator = placer::GqlTileLocator::new(
        config.endpoints.subscription_url.as_str(),
        config.endpoints.origin.as_str(),
        config.user_agent.as_str(),
        config.team_owner.as_str(),
    )
    .with_read_timeout(config.tile_timeout);
    let live = placer::LiveCanvasSource::new(Box::new(locator), Arc::clone(&images), config.layout);
    let api = placer::HttpPlacementApi::new(
        config.endpoints.placement_url.as_str(),
        config.client_headers(),
        &config.user_agent,
    )
    .context("build placement client")?;
    let client = placer::PlacementClient::new(live, Box::new(api), Box::new(channel.handle.clone()));

    let tokens = placer::RedditTokenSource::new(config.endpoints.token_url.as_str(), &config.user_agent)
        .context("build token source")?;
    let orders = placer::OrderLoader::new(images, config.endpoints.map_base_url.as_str(), config.layout);
    let ctx = placer::PlacerContext::new(sessions, channel.events);

    let mut scheduler = placer::Scheduler::new(
        ctx,
        Box::new(tokens),
        orders,
        client,
        config.retry.clone(),
        config.timings.clone(),
        placer::SystemClock,
    );
    scheduler.run()?;
    Ok(())
}
