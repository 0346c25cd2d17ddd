use std::process::ExitCode;

use tracing::{error, info};

use stowage::file::FileStorage;
use stowage::web::WebServer;
use stowage::{Config, Database, ItemKind, ItemRepository, ItemService};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = stowage::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        stowage::logging::init_console_only(&config.logging.level);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> stowage::Result<()> {
    config.validate()?;

    info!("Stowage - quota-bounded file store");
    info!(
        max_storage_bytes = config.storage.max_storage_bytes,
        "Storage ceiling configured"
    );

    let db = Database::open(&config.database.path).await?;
    {
        let repo = ItemRepository::new(db.pool());
        info!(
            files = repo.count_by_kind(ItemKind::File).await?,
            folders = repo.count_by_kind(ItemKind::Folder).await?,
            "Item store opened"
        );
    }

    let storage = FileStorage::from_config(&config.storage)?;
    storage.sweep_staging()?;
    storage.cleanup_empty_dirs()?;

    let items = ItemService::new(db, storage, config.storage.max_storage_bytes);
    let server = WebServer::new(&config.server, items)?;

    info!("Server configured on {}", server.addr());
    server.run().await?;
    Ok(())
}
