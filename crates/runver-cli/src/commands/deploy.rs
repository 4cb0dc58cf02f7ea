use std::path::PathBuf;

/// Deploy `version` from the current directory and print its URL.
pub async fn deploy(version: &str) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");

    let outcome = super::deploy_pipeline::run(&project_dir, version).await?;

    for file in &outcome.files {
        tracing::debug!(path = %file.display(), "generated");
    }

    println!();
    println!("Deployed {}: {}", outcome.version, outcome.url);

    Ok(())
}
