//! Main application entry point
//!
//! Loads a dataset specification, applies the query given on the command
//! line and prints the resolved result set as JSON.

use std::sync::Arc;
use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qv_data::{AnyDatabase, Database, ResultSet, SpecADatabase};
use qv_render::ImageRenderer;
use qv_views::Browser;

mod cli;
mod config;
mod loader;

use cli::{CliArgs, USAGE};
use config::AppConfig;
use loader::FileImageLoader;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }
    let spec_path = args
        .spec
        .clone()
        .with_context(|| format!("Missing specification path\n\n{}", USAGE))?;

    let config = match &args.config {
        Some(path) => AppConfig::load(path).await?,
        None => AppConfig::default(),
    };

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let database = AnyDatabase::from(
        SpecADatabase::open(&spec_path)
            .await
            .with_context(|| format!("Failed to open dataset {}", spec_path.display()))?,
    );
    info!("Opened {} dataset {}", database.format_name(), spec_path.display());

    let result = if args.render {
        render(database, &args, &config).await?
    } else {
        let query_set = database.query_set()?;
        args.apply(&query_set)?;
        let result = database.resolve(&query_set)?;
        println!("{}", result.to_json()?);
        Some(result)
    };

    if args.check_files {
        if let Some(result) = &result {
            report_missing(result).await;
        }
    }
    Ok(())
}

/// Draw every resource of the query through a browser and report the surfaces
async fn render(database: AnyDatabase, args: &CliArgs, config: &AppConfig) -> Result<Option<ResultSet>> {
    let renderer = ImageRenderer::on_current_runtime(FileImageLoader)?;
    let runtime = renderer.runtime().clone();
    let browser = Browser::new(Arc::new(database), Arc::new(renderer), runtime, config.browser)?;

    args.apply(browser.query_set())?;
    browser.refresh()?;
    browser.progress().finished().await;

    match browser.matrix_view() {
        Some(view) => {
            for cell in view.cells() {
                let (width, height) = cell.viewport.target().size();
                println!(
                    "{} {} {}x{}",
                    cell.viewport.caption().unwrap_or_default(),
                    cell.resource().address,
                    width,
                    height
                );
            }
        }
        None => {
            let (width, height) = browser.viewport().target().size();
            if let Some(descriptor) = browser.last_result().as_ref().and_then(ResultSet::single) {
                println!("{} {}x{}", descriptor.address, width, height);
            }
        }
    }
    Ok(browser.last_result())
}

/// Addresses of `result` that do not exist on disk
async fn missing_addresses(result: &ResultSet) -> Vec<String> {
    let mut missing = Vec::new();
    for descriptor in result.descriptors() {
        if tokio::fs::metadata(&descriptor.address).await.is_err() {
            missing.push(descriptor.address.clone());
        }
    }
    missing
}

async fn report_missing(result: &ResultSet) {
    let missing = missing_addresses(result).await;
    for address in &missing {
        warn!("Missing resource {}", address);
    }
    info!("{} of {} resources missing", missing.len(), result.descriptors().len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use serde_json::json;

    async fn dataset(dir: &std::path::Path) -> AnyDatabase {
        let document = json!({
            "arguments": {
                "theta": { "label": "Theta", "type": "range", "values": [0, 30], "default": 0 },
                "phi": { "label": "Phi", "type": "range", "values": [0], "default": 0 }
            },
            "metadata": {},
            "name_pattern": "t{theta}_p{phi}.jpg"
        });
        let path = dir.join("info.json");
        tokio::fs::write(&path, document.to_string()).await.unwrap();
        RgbImage::from_pixel(6, 4, Rgb([0, 0, 255])).save(dir.join("t0_p0.jpg")).unwrap();
        SpecADatabase::open(&path).await.unwrap().into()
    }

    #[tokio::test]
    async fn test_render_then_check_files() {
        let dir = tempfile::tempdir().unwrap();
        let database = dataset(dir.path()).await;
        let args = CliArgs::parse(
            ["x", "--matrix", "theta", "phi", "--select", "theta=0,30", "--render", "--check-files"]
                .into_iter()
                .map(String::from),
        )
        .unwrap();
        assert!(args.render && args.check_files);

        let result = render(database, &args, &AppConfig::default()).await.unwrap().unwrap();
        assert_eq!(result.descriptors().len(), 2);

        let missing = missing_addresses(&result).await;
        assert_eq!(missing.len(), 1);
        assert!(missing[0].ends_with("t30_p0.jpg"));
    }
}
