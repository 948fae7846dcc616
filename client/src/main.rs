//! F5-TTS Client
//!
//! CLI client for the F5-TTS voice cloning server.

use clap::Parser;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shared::ErrorResponse;

/// F5-TTS Voice Cloning Client
#[derive(Parser, Debug)]
#[command(name = "f5tts-client")]
#[command(author, version, about = "CLI client for the F5-TTS voice cloning server")]
struct Args {
    /// Text to synthesize
    #[arg(short, long)]
    text: String,

    /// Path to the reference audio clip to clone
    #[arg(short, long)]
    reference_audio: PathBuf,

    /// Transcription of the reference audio (auto-transcribed if omitted)
    #[arg(long)]
    reference_text: Option<String>,

    /// Output file path (e.g., output.wav)
    #[arg(short, long, default_value = "generated_audio.wav")]
    output: PathBuf,

    /// Server URL
    #[arg(long, default_value = "http://localhost:8080")]
    server: String,

    /// Enable verbose output
    #[arg(short = 'V', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::new(level))
        .init();

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()?;

    let clip = tokio::fs::read(&args.reference_audio).await?;
    let filename = args
        .reference_audio
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reference.wav".to_string());

    let mut form = Form::new()
        .part(
            "reference_audio",
            Part::bytes(clip).file_name(filename).mime_str("audio/wav")?,
        )
        .text("text", args.text.clone());
    if let Some(reference_text) = args.reference_text {
        form = form.text("reference_text", reference_text);
    }

    info!(
        text_len = args.text.len(),
        reference = %args.reference_audio.display(),
        "Sending synthesis request"
    );

    let start = Instant::now();
    let url = format!("{}/synthesize", args.server);

    let response = client.post(&url).multipart(form).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await?;
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        error!(status = %status, error = %message, "Server returned error");
        anyhow::bail!("Server error: {} - {}", status, message);
    }

    let audio_data = response.bytes().await?;
    let elapsed = start.elapsed();

    info!(
        elapsed_ms = elapsed.as_millis(),
        bytes = audio_data.len(),
        "Received audio"
    );

    tokio::fs::write(&args.output, &audio_data).await?;
    println!(
        "✓ Synthesized {} chars in {:.2}s -> {}",
        args.text.len(),
        elapsed.as_secs_f32(),
        args.output.display()
    );

    Ok(())
}
