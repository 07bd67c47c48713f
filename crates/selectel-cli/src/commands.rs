//! Subcommand handlers

use crate::Command;
use anyhow::{bail, Context, Result};
use selectel_client::{ClientRegistry, StatusCode};
use tracing::info;

/// Run one subcommand against the client registered for `storage`
pub async fn execute(registry: &ClientRegistry, storage: &str, command: Command) -> Result<()> {
    let client = match command {
        Command::Types => {
            for storage_type in registry.storage_types() {
                println!("{}", storage_type);
            }
            return Ok(());
        }
        _ => registry.get(storage)?,
    };

    match command {
        Command::Types => {}
        Command::Ls => {
            for file in client.list_files().await? {
                println!("{}", file);
            }
        }
        Command::Upload { local, remote } => {
            let status = client
                .upload_file(&local, &remote)
                .await
                .with_context(|| format!("failed to upload {}", local.display()))?;
            ensure_success(status, "upload")?;
            info!("Uploaded {} -> {}", local.display(), client.public_url(&remote));
        }
        Command::Download { url, local } => {
            let complete = client.download_file(&url, &local).await?;
            if !complete {
                bail!("download of {} is incomplete", url);
            }
            info!("Downloaded {} -> {}", url, local.display());
        }
        Command::Rm { path } => {
            let status = client.delete_file(&path).await?;
            if status == StatusCode::NOT_FOUND {
                info!("{} is already absent", path);
            } else {
                ensure_success(status, "delete")?;
            }
        }
        Command::Link { origin, link } => {
            let status = client.make_link(&origin, &link).await?;
            ensure_success(status, "link")?;
        }
        Command::Url { path } => println!("{}", client.public_url(&path)),
    }
    Ok(())
}

fn ensure_success(status: StatusCode, operation: &str) -> Result<()> {
    if !status.is_success() {
        bail!("{} failed: storage responded {}", operation, status);
    }
    Ok(())
}
