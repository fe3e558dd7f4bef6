//! CLI `client` commands: query a running service over HTTP.

use anyhow::Result;

use sbert_service::client::SbertClient;

pub async fn health(client: &SbertClient) -> Result<()> {
    if client.health().await? {
        println!("{} is up", client.base_url());
        Ok(())
    } else {
        anyhow::bail!("{} is not healthy", client.base_url())
    }
}

pub async fn embedding(client: &SbertClient, text: &str) -> Result<()> {
    let embedding = client.embedding(text).await?;
    println!("{}", serde_json::to_string(&embedding)?);
    eprintln!("{} dimensions", embedding.len());
    Ok(())
}

pub async fn similarity(client: &SbertClient, text1: &str, text2: &str) -> Result<()> {
    let similarity = client.similarity(text1, text2).await?;
    println!("{similarity:.6}");
    Ok(())
}
