use clap::Parser;
use std::io::Read;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use search_profiler::config::{CommandLineArgs, Config, LoggingConfig};
use search_profiler::{AppState, analyze_profile, build_router};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli_args = CommandLineArgs::parse();
    let config = Config::load(&cli_args)?;

    // One-shot mode keeps stdout for the JSON result
    let one_shot = cli_args.analyze.is_some();
    let _log_guard = init_logging(&config.logging, one_shot);

    if let Some(source) = &cli_args.analyze {
        return run_analyze(source, &config);
    }

    tracing::info!("Search Profiler starting up");
    tracing::info!("Configuration loaded successfully");

    let app_state = Arc::new(AppState::from_config(&config));
    tracing::info!(
        "Analysis cache {} (capacity {}, ttl {}s)",
        if app_state.analysis_cache.is_enabled() { "enabled" } else { "disabled" },
        config.cache.capacity,
        config.cache.ttl_secs
    );

    let app = build_router(app_state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API documentation available at http://{}/api-docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize tracing; the returned guard must live as long as the process logs to file
fn init_logging(logging: &LoggingConfig, to_stderr: bool) -> Option<WorkerGuard> {
    let log_filter = tracing_subscriber::EnvFilter::new(&logging.level);

    let console = if to_stderr {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    let registry = tracing_subscriber::registry().with(log_filter).with(console);

    let Some(log_file) = &logging.file else {
        registry.init();
        return None;
    };

    let log_path = std::path::Path::new(log_file);
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
    let file_name = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("search-profiler.log");
    // Rolling appender adds the date suffix
    let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

    let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    registry
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    Some(guard)
}

/// Analyze one profile from a file or stdin and print the result as pretty JSON
fn run_analyze(source: &str, config: &Config) -> Result<(), anyhow::Error> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", source, e))?
    };

    let analysis = analyze_profile(&text, &config.to_analysis_options())?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
