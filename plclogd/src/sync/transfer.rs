use std::io;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use plclog_core::{DataLogClient, DataLogError};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{0}")]
    Remote(#[from] DataLogError),
    #[error("request failed: {0}")]
    Body(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Fetches `remote_path` and stores the body at `target`.
///
/// Bytes land in a `.partial` sibling first and are renamed into place once the
/// whole body is on disk, so a failed transfer never leaves `target` behind.
pub async fn download_to_path(
    client: &DataLogClient,
    remote_path: &str,
    target: &Path,
) -> Result<u64, TransferError> {
    let response = client.fetch_file(remote_path).await?;
    let partial = partial_path(target);
    match write_stream(response, &partial).await {
        Ok(written) => {
            tokio::fs::rename(&partial, target).await?;
            Ok(written)
        }
        Err(err) => {
            let _ = tokio::fs::remove_file(&partial).await;
            Err(err)
        }
    }
}

async fn write_stream(response: reqwest::Response, partial: &Path) -> Result<u64, TransferError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}
