//! Process entry point: loads configuration, wires the Upstream Client,
//! Response Cache, and Request Coordinator together, and serves the SCIM
//! HTTP surface.

use std::process::ExitCode;
use std::sync::Arc;

use scim_upgrade_proxy::cache::ResponseCache;
use scim_upgrade_proxy::config::ProxyConfig;
use scim_upgrade_proxy::coordinator::RequestCoordinator;
use scim_upgrade_proxy::upstream::UpstreamClient;

fn main() -> ExitCode {
    env_logger::init();

    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            log::error!("configuration error: {error}");
            return ExitCode::from(78);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.proxy_workers)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            log::error!("failed to build tokio runtime: {error}");
            return ExitCode::from(1);
        }
    };

    runtime.block_on(run(config))
}

async fn run(config: ProxyConfig) -> ExitCode {
    let upstream = match UpstreamClient::new(
        &config.upstream_base_url,
        config.upstream_timeout,
        config.upstream_supports_patch,
    ) {
        Ok(upstream) => upstream,
        Err(error) => {
            log::error!("failed to build upstream client: {error}");
            return ExitCode::from(78);
        }
    };

    let cache = ResponseCache::new(config.cache_ttl, config.cache_max_size);
    let coordinator = Arc::new(RequestCoordinator::new(
        Arc::new(upstream),
        cache,
        config.max_filter_complexity,
        config.filter_fetch_multiplier,
        config.max_filter_fetch_size,
    ));

    let router = scim_upgrade_proxy::http::build(coordinator);
    let address = format!("{}:{}", config.proxy_host, config.proxy_port);

    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(error) => {
            log::error!("failed to bind {address}: {error}");
            return ExitCode::from(1);
        }
    };

    log::info!("listening on {address}, upstream {}", config.upstream_base_url);

    if let Err(error) = axum::serve(listener, router).await {
        log::error!("server error: {error}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
