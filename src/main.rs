//! tessera server binary: wires configuration into the service and runs the
//! HTTP listener until interrupted.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tessera::{
    config::Config,
    iiif::FeatureSet,
    resolve::{create_s3_client, ResolverChain, S3Fetcher, S3Resolver},
    server::{create_router, RouterConfig},
    service::{ImageService, Maximums},
};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    init_logging(&config);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let features = match load_features(&config) {
        Ok(features) => features,
        Err(e) => {
            error!("Capabilities error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting tessera");
    info!("  tile path: {}", config.tile_path.display());
    info!("  IIIF base: {}", config.iiif_url);
    info!(
        "  caches: {} info entries, {} tile entries",
        config.info_cache_len, config.tile_cache_len
    );

    let resolvers = build_resolver_chain(&config).await;

    let maximums = Maximums {
        area: config.image_max_area,
        width: config.image_max_width,
        height: config.image_max_height,
    };

    let service = Arc::new(ImageService::new(
        resolvers,
        features,
        config.info_cache_len,
        config.tile_cache_len,
        maximums,
    ));

    let router_config = RouterConfig::from_iiif_url(&config.iiif_url);
    let router = create_router(service.clone(), router_config);

    let listener = match tokio::net::TcpListener::bind(&config.address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.address, e);
            std::process::exit(1);
        }
    };
    info!("Listening on http://{}", config.address);

    let serve = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = serve.await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Draining complete, tearing down resolvers");
    service.teardown().await;
    info!("Stopped");
}

/// Initialize the tracing subsystem from the configured log level,
/// overridable with RUST_LOG.
fn init_logging(config: &Config) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// The advertised feature set: a capabilities file if configured, otherwise
/// everything the pipeline can do.
fn load_features(config: &Config) -> Result<FeatureSet, String> {
    match &config.capabilities_file {
        Some(path) => {
            info!("Loading capabilities from {}", path.display());
            FeatureSet::from_toml_file(path).map_err(|e| e.to_string())
        }
        None => Ok(FeatureSet::native()),
    }
}

/// Build the resolver chain from the configured plugin list. Unknown
/// identifiers are skipped with a warning; the filesystem fallback under the
/// tile path is always last.
async fn build_resolver_chain(config: &Config) -> ResolverChain {
    let mut chain = ResolverChain::new(config.tile_path.clone());

    for plugin in &config.plugins {
        match plugin.trim() {
            "" => {}
            "s3-images" => {
                if !config.s3_enabled() {
                    info!("s3-images resolver not enabled: set --s3-bucket to activate");
                    continue;
                }
                let client =
                    create_s3_client(config.s3_endpoint.as_deref(), config.s3_zone.clone()).await;
                let bucket = config.s3_bucket.clone().unwrap_or_default();
                info!(
                    "s3-images resolver enabled: bucket {:?}, cache {}",
                    bucket,
                    config.s3_cache.display()
                );
                let fetcher = Arc::new(S3Fetcher::new(client, bucket));
                chain.push(Arc::new(S3Resolver::new(config.s3_cache.clone(), fetcher)));
            }
            other => warn!("Unknown plugin {:?} ignored", other),
        }
    }

    chain
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}
