use anyhow::{Context, Result, bail};
use mirrorplay::Config;
use mirrorplay::models::{ContentId, ProviderName};
use mirrorplay::player::{DebugInfo, PlaybackState, SessionSettings};
use mirrorplay::resolver::{HttpStreamResolver, StreamResolver, classify};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mirrorplay=debug")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(content_id) = args.next() else {
        bail!("usage: mirrorplay <content-id> [provider]");
    };
    let only_provider = args.next().map(ProviderName::new);

    let config = Config::load().context("Failed to load configuration")?;
    let settings = SessionSettings::from_config(&config)?;
    let resolver = HttpStreamResolver::new(&config.resolver)?;

    info!("Probing {} against {}", content_id, resolver.base_url());

    match resolver.health().await {
        Ok(health) if health.is_healthy() => info!("Resolver service is healthy"),
        Ok(health) => warn!("Resolver service reports status '{}'", health.status),
        Err(e) => warn!("Health check failed: {:#}", e),
    }

    let providers: Vec<ProviderName> = match only_provider {
        Some(provider) => vec![provider],
        None => settings.providers.clone(),
    };

    let content_id = ContentId::new(content_id);
    let mut playable = 0;

    for provider in &providers {
        let line = match resolver.resolve(&content_id, provider).await {
            Ok(descriptor) => {
                playable += 1;
                DebugInfo {
                    provider: Some(provider.clone()),
                    url: Some(DebugInfo::truncate_url(&descriptor.url)),
                    backend: Some(classify(&descriptor)),
                    state: PlaybackState::Attaching,
                    retry_count: 0,
                    generation: 0,
                }
                .to_string()
            }
            Err(e) => format!("Provider: {} | failed: {}", provider, e),
        };
        println!("{}", line);
    }

    info!("{}/{} providers returned a stream", playable, providers.len());
    Ok(())
}
