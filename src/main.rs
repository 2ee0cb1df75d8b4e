// main.rs — headless runner for the grammar, translate and speak actions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use textlens_lib::{
    AssistClient, AssistError, CancellationToken, ProviderConfig, ProviderPreset,
    SpeechProviderPreset,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "textlens",
    version,
    about = "Grammar check, translation and speech from the terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Three rewrites of TEXT: clean up, better flow, concise
    Grammar {
        /// glm, gemini or custom (default: TEXTLENS_PRESET, else glm)
        #[arg(long)]
        preset: Option<ProviderPreset>,
        text: String,
    },
    /// Translate TEXT into --target
    Translate {
        #[arg(long)]
        preset: Option<ProviderPreset>,
        #[arg(long, default_value = "en")]
        target: String,
        text: String,
    },
    /// Synthesize TEXT and write the audio to --out
    Speak {
        /// ark, openspeech or custom (default: TEXTLENS_SPEECH_PRESET, else ark)
        #[arg(long)]
        preset: Option<SpeechProviderPreset>,
        #[arg(long, default_value = "speech.mp3")]
        out: PathBuf,
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let client = AssistClient::from_env();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling request");
            on_interrupt.cancel();
        }
    });

    match run(&client, cli.command, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(AssistError::Cancelled) => ExitCode::from(130),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    client: &AssistClient,
    command: Commands,
    cancel: &CancellationToken,
) -> Result<(), AssistError> {
    match command {
        Commands::Grammar { preset, text } => {
            let preset = resolve(preset, "TEXTLENS_PRESET", ProviderPreset::GlmDirect)?;
            let config = ProviderConfig::from_env("TEXTLENS");
            let result = client.grammar_check(&text, preset, &config, cancel).await?;
            print_json(&result)
        }
        Commands::Translate {
            preset,
            target,
            text,
        } => {
            let preset = resolve(preset, "TEXTLENS_PRESET", ProviderPreset::GlmDirect)?;
            let config = ProviderConfig::from_env("TEXTLENS");
            let result = client
                .translate(&text, preset, &config, &target, cancel)
                .await?;
            print_json(&result)
        }
        Commands::Speak { preset, out, text } => {
            let preset = resolve(
                preset,
                "TEXTLENS_SPEECH_PRESET",
                SpeechProviderPreset::DoubaoArk,
            )?;
            let config = ProviderConfig::from_env("TEXTLENS_SPEECH");
            let audio = client.synthesize_speech(&text, preset, &config, cancel).await?;
            tokio::fs::write(&out, &audio).await.map_err(|e| {
                AssistError::InvalidConfig(format!("Cannot write {}: {}", out.display(), e))
            })?;
            println!("Wrote {} bytes to {}", audio.len(), out.display());
            Ok(())
        }
    }
}

/// Flag, then environment variable, then `default`
fn resolve<P>(flag: Option<P>, env_key: &str, default: P) -> Result<P, AssistError>
where
    P: std::str::FromStr<Err = AssistError>,
{
    if let Some(preset) = flag {
        return Ok(preset);
    }
    match std::env::var(env_key) {
        Ok(raw) if !raw.trim().is_empty() => raw.parse(),
        _ => Ok(default),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AssistError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| AssistError::InvalidConfig(format!("Cannot render result: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}
