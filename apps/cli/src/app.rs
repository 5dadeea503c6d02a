//! Subcommand implementations.

use std::sync::Arc;

use anyhow::Context;
use boxreg_protocol::{ContentHash, UploadScope};
use boxreg_registry::RegistryClient;
use boxreg_transfer::{BoxSource, HashComputer, LocalBoxFile};
use boxreg_upload::{UploadError, UploadOrchestrator, UploadRequest};
use indicatif::HumanBytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::progress;
use crate::{HashArgs, UploadArgs};

/// Uploads one box until it succeeds, fails or Ctrl-C cancels it.
pub async fn upload(args: UploadArgs, config: Config) -> anyhow::Result<()> {
    let scope = UploadScope::from_tag(&args.box_tag, args.version, args.provider)?;
    let expected = args
        .expect_checksum
        .as_deref()
        .map(ContentHash::parse)
        .transpose()?;

    let source = Arc::new(
        LocalBoxFile::open(&args.file)
            .await
            .with_context(|| format!("opening {}", args.file.display()))?,
    );
    let client = RegistryClient::new(
        &config.api_root,
        config.token.as_deref(),
        config.request_timeout(),
    )?;

    info!(
        %scope,
        file = %source.path().display(),
        api_root = client.api_root(),
        "uploading box"
    );

    let mut options = config.upload_options();
    if let Some(chunk_size) = args.chunk_size {
        options.chunk_size = chunk_size;
    }

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let orchestrator = Arc::new(UploadOrchestrator::new(
        Arc::new(client),
        Arc::new(events_tx),
        options,
    ));
    let renderer = tokio::spawn(progress::render_upload(events_rx, source.len()));

    let mut request = UploadRequest::new(scope.clone(), source.clone());
    if let Some(expected) = expected {
        request = request.expect_checksum(expected);
    }

    let mut task = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.upload(request).await }
    });

    let result = tokio::select! {
        joined = &mut task => joined?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, cancelling upload");
            orchestrator.cancel();
            task.await?
        }
    };

    // The sink lives as long as the orchestrator; dropping it ends the renderer.
    drop(orchestrator);
    renderer.await?;

    match result {
        Ok(outcome) => {
            println!(
                "{} {} uploaded: {} sent in {} chunk(s), resumed from {}{}",
                scope,
                outcome.checksum,
                HumanBytes(outcome.bytes_sent),
                outcome.chunks_sent,
                HumanBytes(outcome.resumed_from),
                if outcome.session_created {
                    ", new session"
                } else {
                    ""
                },
            );
            Ok(())
        }
        Err(UploadError::Cancelled) => anyhow::bail!("upload cancelled"),
        Err(e) => Err(e).context("upload failed"),
    }
}

/// Hashes a file the way an upload would.
pub async fn hash(args: HashArgs, config: Config) -> anyhow::Result<()> {
    let source = LocalBoxFile::open(&args.file)
        .await
        .with_context(|| format!("opening {}", args.file.display()))?;
    let computer = HashComputer::new(args.checksum_type)
        .with_window_size(args.window.unwrap_or(config.hash_window));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let bar = progress::byte_bar(source.len(), "Computing file hash...");
    let checksum = computer
        .compute_with_progress(&source, &cancel, |done| bar.set_position(done))
        .await;
    bar.finish_and_clear();

    println!("{}  {}", checksum?, source.path().display());
    Ok(())
}
