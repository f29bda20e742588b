use anyhow::{Context, Result};
use clap::Parser;
use kiko_core::chat::GroqChatClient;
use kiko_core::prompts::PromptBook;
use kiko_core::speech::SpeechCapture;
use kiko_core::transcriber::AzureSpeechClient;
use kiko_core::CompanionController;
use kiko_service::config::Config;
use kiko_service::mic_adapter::MicrophoneAdapter;
use kiko_service::{prompt_loader, repl};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::fmt::time::ChronoLocal;

/// Talk to a virtual pet from the terminal.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Name the pet up front instead of being asked
    #[arg(long)]
    name: Option<String>,

    /// Enable voice input through /listen
    #[arg(long)]
    voice: bool,

    /// Input device to record from. Defaults to the system's default input
    #[arg(long, value_name = "DEVICE")]
    input_device: Option<String>,

    /// Print the available input devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    // Logs go to stderr, the conversation to stdout.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Configuration loaded. Starting companion v{}...", config.app_version);

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    if args.list_devices {
        println!("Input devices:");
        println!("{}", kiko_native_utils::device::get_available_inputs()?);
        return Ok(());
    }

    // --- 4. Load Prompts ---
    let overrides = prompt_loader::load_prompts(&config.prompts_dir)
        .context("Failed to load prompt overrides")?;
    tracing::info!("Loaded {} prompt overrides.", overrides.len());
    let prompts = PromptBook::with_overrides(&overrides);

    // --- 5. Initialize API Clients ---
    if config.groq_api_key.is_none() {
        tracing::warn!("GROQ_API_KEY is not set; actions will fail until it is");
    }
    let mut chat = GroqChatClient::new(config.groq_api_key.take(), config.chat_model.clone());
    if let Some(api_url) = &config.api_url {
        chat = chat.with_base_url(api_url.as_str());
    }
    tracing::info!("Chat endpoint: {} ({})", chat.endpoint(), chat.model());

    let mut controller = CompanionController::new(Arc::new(chat), prompts);

    if args.voice {
        let transcriber = AzureSpeechClient::new(
            config.azure_speech_api_key.take(),
            config.azure_speech_region.take(),
            config.speech_language.clone(),
        );
        let recorder = MicrophoneAdapter::new(args.input_device.clone());
        controller = controller.with_speech(SpeechCapture::new(
            Arc::new(recorder),
            Arc::new(transcriber),
        ));
        tracing::info!("Voice input enabled");
    }

    // --- 6. Run the session ---
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    tokio::select! {
        result = repl::run(&controller, args.name.as_deref(), stdin, &mut stdout) => {
            result.context("Terminal session failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }
    tracing::info!("Shutting down...");
    Ok(())
}
