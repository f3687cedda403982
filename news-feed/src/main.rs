use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use news_feed::{
    ClientConfig, Dashboard, FeedOutcome, FeedRenderer, Fetcher, ProgressRenderer, TextRenderer,
};
use std::io;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "newsnow", version, about = "Browse scraped channel feeds and their AI summaries")]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "NEWSNOW_API_URL")]
    api_url: Option<String>,

    /// Messages per page
    #[arg(long, env = "NEWSNOW_WINDOW_SIZE")]
    window: Option<usize>,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List channels in display order
    Channels,
    /// Load a channel's recent messages
    Fetch {
        /// Channel id or part of its name
        channel: String,
        /// Lookback window: 6, 12, 24, 48 or 72 hours
        #[arg(long)]
        hours: Option<u32>,
        /// Fetch in one request instead of streaming
        #[arg(long)]
        batch: bool,
        /// Extra pages to show after the first
        #[arg(long, default_value_t = 0)]
        pages: usize,
        /// Summarize the visible messages afterwards
        #[arg(long)]
        summarize: bool,
    },
    /// Load a channel and print only its summary
    Summarize {
        channel: String,
        #[arg(long)]
        hours: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    info!("Using backend at {}", config.api_url);
    let fetcher = Fetcher::new(config.clone()).context("failed to build API client")?;
    let mut dashboard = Dashboard::new(fetcher, &config);

    dashboard.load_channels().await.context("failed to load channels")?;

    match cli.command {
        Command::Channels => {
            for channel in dashboard.channels() {
                println!("{:<24} {}", channel.id, channel.name);
            }
        }
        Command::Fetch { channel, hours, batch, pages, summarize } => {
            dashboard.select_channel(&channel)?;
            let outcome = load(&mut dashboard, hours, batch).await?;

            let mut output = TextRenderer::new(io::stdout().lock());
            if outcome == FeedOutcome::Empty {
                output.notice(news_feed::session::EMPTY_NOTICE)?;
                return Ok(());
            }

            let aggregator = dashboard.session().aggregator();
            output.render(aggregator.visible(), aggregator.total())?;
            for _ in 0..pages {
                if dashboard.load_more(&mut output) == 0 {
                    break;
                }
            }

            if summarize {
                let summary = dashboard.summarize().await.context("failed to generate summary")?;
                output.summary(&summary.text)?;
            }
        }
        Command::Summarize { channel, hours } => {
            dashboard.select_channel(&channel)?;
            if load(&mut dashboard, hours, false).await? == FeedOutcome::Empty {
                println!("{}", news_feed::session::EMPTY_NOTICE);
                return Ok(());
            }
            let summary = dashboard.summarize().await.context("failed to generate summary")?;
            TextRenderer::new(io::stdout().lock()).summary(&summary.text)?;
        }
    }

    Ok(())
}

/// Environment defaults first, then flags (which clap also fills from the environment).
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("invalid environment configuration")?;
    if let Some(api_url) = &cli.api_url {
        config.api_url = api_url.clone();
    }
    if let Some(window) = cli.window {
        config.window_size = window;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn load(dashboard: &mut Dashboard<Fetcher>, hours: Option<u32>, batch: bool) -> Result<FeedOutcome> {
    let mut progress = ProgressRenderer::new(io::stderr());
    let outcome = if batch {
        dashboard.load_news_batch(hours, &mut progress).await?
    } else {
        dashboard.load_news(hours, &mut progress).await?
    };
    eprintln!();

    if let FeedOutcome::Failed { error, total } = &outcome {
        error!("Loading stopped early: {}", error);
        if *total == 0 {
            anyhow::bail!("no messages loaded: {}", error);
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() -> Result<()> {
        std::env::set_var("NEWSNOW_API_URL", "http://env-host:9000");
        std::env::set_var("NEWSNOW_WINDOW_SIZE", "25");

        let cli = Cli::try_parse_from(["newsnow", "channels"])?;
        assert_eq!(cli.api_url.as_deref(), Some("http://env-host:9000"));
        let config = build_config(&cli)?;
        assert_eq!(config.api_url, "http://env-host:9000");
        assert_eq!(config.window_size, 25);

        let cli = Cli::try_parse_from(["newsnow", "--api-url", "http://flag-host", "--window", "5", "channels"])?;
        let config = build_config(&cli)?;
        assert_eq!(config.api_url, "http://flag-host");
        assert_eq!(config.window_size, 5);

        let cli = Cli::try_parse_from(["newsnow", "--window", "0", "channels"])?;
        assert!(build_config(&cli).is_err());

        std::env::remove_var("NEWSNOW_API_URL");
        std::env::remove_var("NEWSNOW_WINDOW_SIZE");
        Ok(())
    }
}
