use anyhow::Result;
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use study_engine::{
    EngineConfig, GenerationKind, GenerationOptions, JsonFileStorage, ProviderFactory,
    ProviderGateway, QuotaManager, ServiceMode, Storage, StudyEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let _guard = setup_logging()?;

    let config = EngineConfig::from_env()?;
    config.validate()?;

    let args: Vec<String> = env::args().collect();
    let Some(input_path) = args.get(1) else {
        eprintln!("Usage: study-engine <text-file>");
        std::process::exit(2);
    };
    let text = tokio::fs::read_to_string(input_path).await?;

    info!("Starting study engine...");

    let storage = Arc::new(JsonFileStorage::new(&config.storage.data_dir).await?);
    let quota = QuotaManager::load_or_init(
        storage.clone() as Arc<dyn Storage>,
        config.quota.daily,
        config.quota.monthly,
    )
    .await?;

    let provider = if config.provider.api_key.is_empty()
        || config.provider.api_key == "your-api-key"
    {
        info!("No provider API key configured, content generation runs offline");
        None
    } else {
        let provider = ProviderFactory::create_provider(
            config.provider.provider,
            config.provider.api_key.clone(),
            config.provider.base_url.clone(),
            config.provider.model.clone(),
        );
        info!(
            provider = provider.provider_name(),
            model = provider.model_name(),
            "Initialized LLM provider"
        );
        Some(provider)
    };
    let provider_configured = provider.is_some();

    let gateway = ProviderGateway::new(quota, provider);
    let mut engine = StudyEngine::new(gateway, storage.clone() as Arc<dyn Storage>);

    // Without a key there is no point letting calls reach the provider path
    if !provider_configured
        && matches!(engine.mode(), ServiceMode::Free | ServiceMode::Custom)
    {
        engine.set_mode(ServiceMode::Offline).await?;
    }

    let options = GenerationOptions::default();

    let flashcards = engine
        .generate_items(GenerationKind::Flashcards, &text, Some(input_path), &options)
        .await?;
    println!("{}", serde_json::to_string_pretty(&flashcards)?);

    let quiz = engine
        .generate_items(GenerationKind::Quiz, &text, Some(input_path), &options)
        .await?;
    println!("{}", serde_json::to_string_pretty(&quiz)?);

    let remaining = engine.remaining_quota();
    info!(
        daily_remaining = remaining.daily,
        monthly_remaining = remaining.monthly,
        "Generation finished"
    );

    Ok(())
}

fn setup_logging() -> Result<Option<WorkerGuard>> {
    use std::fs;
    use tracing_subscriber::fmt;

    let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());
    let file_enabled = env::var("LOG_FILE_ENABLED")
        .unwrap_or_else(|_| "true".to_string())
        .parse::<bool>()
        .unwrap_or(true);
    let console_enabled = env::var("LOG_CONSOLE_ENABLED")
        .unwrap_or_else(|_| "true".to_string())
        .parse::<bool>()
        .unwrap_or(true);

    // Configure log level from environment variable
    let default_log_level = "info,study_engine=debug";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_level));

    let console_layer = console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
    });

    let (file_layer, guard) = if file_enabled {
        fs::create_dir_all(&log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create logs directory: {}", e);
        });

        // Daily-rotated file output, no ANSI colors
        let file_appender = tracing_appender::rolling::daily(&log_directory, "study-engine.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if file_enabled {
        info!(
            directory = %log_directory,
            "Logging initialized - writing to study-engine.log with daily rotation"
        );
    }

    Ok(guard)
}
