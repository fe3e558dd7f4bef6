use std::path::Path;

use anyhow::Result;

use sbert_service::precompute::embedding_stats_file;

/// Display embedding coverage of a dataset file in the terminal.
pub fn stats(file: &Path, json: bool) -> Result<()> {
    let stats = embedding_stats_file(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Embedding Statistics");
    println!("{}", "=".repeat(40));
    println!("  Dataset:             {}", file.display());
    println!("  Total records:       {}", stats.total);
    println!("  With embedding:      {}", stats.with_embedding);
    println!("  Without embedding:   {}", stats.without_embedding);
    println!("  Completion:          {}%", stats.completion_percentage);
    Ok(())
}
