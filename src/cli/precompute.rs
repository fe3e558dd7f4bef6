//! CLI `precompute` command: embed every record of a dataset file in place.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use indicatif::ProgressBar;

use sbert_service::config::SbertConfig;
use sbert_service::embedding::LazyModel;
use sbert_service::precompute::{precompute_file, PrecomputeOptions};

pub async fn precompute(config: &SbertConfig, file: PathBuf, missing_only: bool) -> Result<()> {
    // Loaded on demand, so a dataset with nothing to embed never touches the model files.
    let model = Arc::new(LazyModel::from_config(config.embedding.clone()));

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Computing embeddings for {}", file.display()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let options = PrecomputeOptions { missing_only };
    let target = file.clone();
    let result =
        tokio::task::spawn_blocking(move || precompute_file(&target, &model, options)).await;
    spinner.finish_and_clear();
    let report = result??;

    println!(
        "Embeddings saved to {} ({} embedded, {} skipped, {} total)",
        file.display(),
        report.embedded,
        report.skipped,
        report.total
    );
    if let Some(dims) = report.dimensions {
        println!("Each embedding has {dims} dimensions");
    }
    Ok(())
}
