use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{load_settings, ClientSettings, TranslateOutcome, WorkflowController};
use tracing_subscriber::EnvFilter;

mod render;
mod shell;

#[derive(Parser, Debug)]
#[command(name = "translator", about = "Translate images through a local translation service")]
struct Args {
    /// Settings file (defaults to ./translator.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    service_url: Option<String>,
    /// Directory the translated image is saved into.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select one image, translate it, and save the result.
    Translate { image: PathBuf },
    /// Interactive session.
    Shell,
}

fn resolve_settings(args: &Args) -> Result<ClientSettings> {
    let mut settings = load_settings(args.config.as_deref()).context("failed to load settings")?;
    if let Some(url) = &args.service_url {
        settings.service_url = url.clone();
    }
    if let Some(dir) = &args.output_dir {
        settings.export_dir = Some(dir.clone());
    }
    Ok(settings)
}

async fn translate_once(
    controller: &WorkflowController,
    settings: &ClientSettings,
    image: &Path,
) -> Result<()> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("could not read '{}'", image.display()))?;
    let file_name = image.file_name().and_then(|name| name.to_str());
    controller
        .select_image_file(file_name, bytes)
        .with_context(|| format!("'{}' is not a usable image", image.display()))?;

    match controller.translate().await {
        TranslateOutcome::Translated => {}
        TranslateOutcome::Failed(message) => bail!(message),
        other => bail!("translation did not complete: {other:?}"),
    }

    let Some(result) = controller.snapshot().translated else {
        bail!("translation finished without a result");
    };
    let target = settings
        .resolved_export_dir()
        .join(&settings.export_file_name);
    controller.download();
    confirm_export(&target, result.handle.bytes()).await?;
    println!("saved {}", target.display());
    Ok(())
}

/// The exporter only logs write failures, so check the file on disk before
/// telling the user it was saved.
async fn confirm_export(target: &Path, expected: &[u8]) -> Result<()> {
    match tokio::fs::read(target).await {
        Ok(written) if written == expected => Ok(()),
        Ok(_) => bail!(
            "'{}' does not hold the translated image; see the log for the export error",
            target.display()
        ),
        Err(err) => bail!("could not save '{}': {err}", target.display()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let settings = resolve_settings(&args)?;
    let controller = WorkflowController::from_settings(&settings)
        .context("failed to set up translation client")?;

    match &args.command {
        Command::Translate { image } => translate_once(&controller, &settings, image).await,
        Command::Shell => shell::run(controller).await,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env, fs,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let dir = env::temp_dir().join(format!("translator-cli-{label}-{suffix}"));
        fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    #[tokio::test]
    async fn export_is_confirmed_only_when_bytes_landed() {
        let dir = temp_dir("confirm");
        let target = dir.join("translated-image.png");

        assert!(confirm_export(&target, b"png").await.is_err());

        fs::write(&target, b"older result").expect("write");
        assert!(confirm_export(&target, b"png").await.is_err());

        fs::write(&target, b"png").expect("write");
        confirm_export(&target, b"png").await.expect("confirmed");

        let _ = fs::remove_dir_all(dir);
    }
}
