use anyhow::{Context, Result};
use clap::Parser;

use feature_registry::cli::{commands, Cli};
use feature_registry::{init_telemetry, FeatureStore, RegistryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    RegistryConfig::load_env_file()?;
    let mut config = RegistryConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.metadata_path {
        config.storage.metadata_path = path;
    }
    init_telemetry(&config.observability)?;

    let store = FeatureStore::open_file(&config.storage.metadata_path, config.store_options()).await?;

    match commands::execute(cli.command, &store).await {
        Ok(output) => {
            let rendered =
                serde_json::to_string_pretty(&output).context("Failed to render command output")?;
            println!("{rendered}");
            Ok(())
        }
        Err(e) => {
            let body = serde_json::to_string_pretty(&commands::error_body(&e))
                .context("Failed to render error body")?;
            eprintln!("{body}");
            // client errors exit 2, storage failures exit 1
            let code = if e.status_code() >= 500 { 1 } else { 2 };
            std::process::exit(code);
        }
    }
}
