use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use visitor_log::api;
use visitor_log::config::{Config, GeoProvider};
use visitor_log::visitor::VisitorService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    let service = VisitorService::from_config(&config)?;

    if !config.visitor.enabled {
        info!("Visitor logging is disabled");
    } else if !config.visitor.enrichment {
        info!("Visitor logging enabled without geolocation");
    } else {
        match config.geo.provider {
            GeoProvider::IpApi => info!("Geolocation via {}", config.geo.api_url),
            GeoProvider::MaxMind => info!(
                "Geolocation via MaxMind databases (city: {:?}, asn: {:?})",
                config.geo.city_db_path, config.geo.asn_db_path
            ),
        }
        if config.geo.cache_ttl_secs > 0 {
            info!(
                "Caching geolocation results for {}s ({} entries max)",
                config.geo.cache_ttl_secs, config.geo.cache_max_entries
            );
        }
    }

    if let Some(ref forward) = config.forward {
        info!("Forwarding visitor records to {}", forward.endpoint);
    }

    if let Some(ref static_dir) = config.site.static_dir {
        info!("Serving site from directory: {}", static_dir);
    } else {
        info!("Serving embedded site");
    }

    let router = api::create_router(service, &config.visitor, &config.site);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Site listening on http://{}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
