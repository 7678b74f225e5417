//! CLI handler for offline mixing: no devices, just files in and a WAV out.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::audio::{TrackSource, WavOptions};
use crate::cli::args::MixCliArgs;
use crate::config::Config;
use crate::studio::{render_encoded, MixParameters, RenderedMix};

pub async fn handle_mix_command(args: MixCliArgs) -> Result<()> {
    let config = Config::load()?;
    let params = mix_parameters(&args, config.studio.mix_parameters());
    let format = if args.pcm16 {
        WavOptions::pcm16()
    } else {
        WavOptions::float32()
    };

    let pb = create_spinner();
    pb.set_message("Fetching backing track...");

    let backing = TrackSource::parse(&args.backing);
    let backing_bytes = backing.fetch(&reqwest::Client::new()).await?;
    let backing_extension = backing.extension();

    let voice_bytes = tokio::fs::read(&args.voice)
        .await
        .with_context(|| format!("Failed to read voice take {:?}", args.voice))?;
    let voice_extension = extension_of(&args.voice);

    pb.set_message("Rendering...");
    let mix = tokio::task::spawn_blocking(move || {
        render_encoded(
            backing_bytes,
            backing_extension.as_deref(),
            voice_bytes,
            voice_extension.as_deref(),
            params,
            format,
        )
    })
    .await
    .context("Render task failed")??;

    if let Some(parent) = args.output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create output directory")?;
    }
    tokio::fs::write(&args.output, &mix.bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", args.output))?;

    pb.finish_with_message("Complete");
    print_summary(&args.output, &mix, params, format);

    Ok(())
}

fn mix_parameters(args: &MixCliArgs, defaults: MixParameters) -> MixParameters {
    let mut params = defaults;
    if let Some(volume) = args.backing_volume {
        params.set_backing_volume(volume);
    }
    if let Some(volume) = args.voice_volume {
        params.set_voice_volume(volume);
    }
    params
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_summary(output: &Path, mix: &RenderedMix, params: MixParameters, format: WavOptions) {
    println!("Mix written to {}", output.display());
    println!(
        "Length: {:.2}s ({} frames, stereo, 44100 Hz, {})",
        mix.duration.as_secs_f64(),
        mix.frames,
        if format.float32 { "32-bit float" } else { "16-bit PCM" }
    );
    println!(
        "Volumes: backing {:.2}, voice {:.2}",
        params.backing_volume(),
        params.voice_volume()
    );
    println!("Size: {} bytes", mix.bytes.len());
}
