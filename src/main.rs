use http::{HeaderValue, Method, header};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use venue_ops::{
    config::Config,
    infrastructure::{
        cache::{RedisCache, SecondaryCache, init_global_cache},
        database::pool::create_pool,
        health::{DatabaseClient, HealthChecker, ServiceInfo, default_dependencies},
        logging::StructuredLogger,
        monitoring::{MetricsCollector, process_start, spawn_system_sampler},
    },
    presentation::http::{response::ResponseOptimizer, routes::create_router, state::AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Uses RUST_LOG if set, otherwise sensible defaults
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            tracing_subscriber::EnvFilter::try_new("info,venue_ops=debug,tower_http=debug")
        })
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    process_start();

    let config = Config::from_env()?;

    let metrics = MetricsCollector::init_global(config.metrics());
    spawn_system_sampler(metrics.clone());

    let db = create_pool(&config.database_url, config.database_max_connections)?;

    let secondary: Option<Arc<dyn SecondaryCache>> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            tracing::info!("Secondary cache tier enabled");
            Some(Arc::new(RedisCache::new(client, config.service_name.clone())))
        }
        None => None,
    };
    let cache = init_global_cache(config.cache(), secondary);

    let logger = Arc::new(StructuredLogger::new(config.logger()));

    let database: Arc<dyn DatabaseClient> = Arc::new(db);
    let health = HealthChecker::new(
        metrics.clone(),
        ServiceInfo {
            version: config.app_version.clone(),
            environment: config.environment.clone(),
        },
    )
    .with_dependencies(default_dependencies(&config, database));

    let state = AppState::new(
        metrics,
        Arc::new(health),
        cache,
        logger.clone(),
        ResponseOptimizer::new(config.optimizer()),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::ACCEPT_ENCODING])
        .max_age(Duration::from_secs(3600));

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("{} listening on {}", config.service_name, addr);
    logger
        .info(format!("Service started on {}", addr), None)
        .await;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, initiating graceful shutdown");
        }
    }
}
