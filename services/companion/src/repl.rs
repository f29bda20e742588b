//! Terminal front-end: reads commands line by line and renders the session.

use anyhow::Result;
use kiko_core::mood::MOOD_MAX;
use kiko_core::{Action, CompanionController, CompanionError, SessionState};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const METER_WIDTH: usize = 20;

pub const HELP: &str = "\
Commands:
  /feed /play /sleep /clean   care for your pet, optionally with your own words
  /love [text]                show some love
  /listen                     start recording, /listen again to stop and send
  /mood                       show the mood meters
  /memory                     show what your pet remembers
  /help                       show this help
  /quit                       leave
Anything else is sent as a message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Care(Action, Option<String>),
    Say(String),
    Listen,
    ShowMood,
    ShowMemory,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplCommand::Say(line.to_string());
    };

    let (word, rest) = match command.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (command, ""),
    };
    match word.to_lowercase().as_str() {
        "feed" | "play" | "sleep" | "clean" | "love" => match word.parse::<Action>() {
            Ok(action) => {
                ReplCommand::Care(action, Some(rest.to_string()).filter(|r| !r.is_empty()))
            }
            Err(_) => ReplCommand::Unknown(word.to_string()),
        },
        "listen" => ReplCommand::Listen,
        "mood" => ReplCommand::ShowMood,
        "memory" => ReplCommand::ShowMemory,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(word.to_string()),
    }
}

fn render_meter(label: &str, value: u8) -> String {
    let filled = value as usize * METER_WIDTH / MOOD_MAX as usize;
    format!(
        "{:<9} [{}{}] {:>3}",
        label,
        "#".repeat(filled),
        "-".repeat(METER_WIDTH - filled),
        value
    )
}

pub fn render_mood(state: &SessionState) -> String {
    format!(
        "{}\n{}",
        render_meter("Happiness", state.happiness()),
        render_meter("Love", state.love())
    )
}

pub fn render_memory(state: &SessionState) -> String {
    if state.memory.is_empty() {
        return format!("{} doesn't remember anything yet.", state.companion_name);
    }
    state
        .memory
        .entries()
        .into_iter()
        .map(|(key, value)| format!("  your {key} is {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turns an error the user can act on into a short line for the terminal.
pub fn describe_error(err: &CompanionError, name: &str) -> String {
    match err {
        CompanionError::PermissionDenied => {
            "Microphone access was denied, or no input device was found.".to_string()
        }
        CompanionError::ConfigurationMissing(what) => {
            format!("{what} is not set. Add it to your environment or .env file.")
        }
        CompanionError::NoRecognizableSpeech => format!("{name} couldn't make out what you said."),
        CompanionError::NotRecording => "Not listening right now. Use /listen to start.".to_string(),
        CompanionError::AlreadyRecording => "Already listening.".to_string(),
        CompanionError::Busy => format!("{name} is still thinking."),
        CompanionError::Unnamed => "Give your pet a name first.".to_string(),
        CompanionError::EmptyMessage => "Say something first.".to_string(),
        CompanionError::SpeechDisabled => {
            "Voice input is off. Start with --voice to use /listen.".to_string()
        }
        CompanionError::Endpoint(_) | CompanionError::Audio(_) => err.to_string(),
    }
}

async fn read_line<R>(input: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Asks for a name until one is accepted. Returns `false` if input ran out first.
async fn name_companion<R, W>(
    controller: &CompanionController,
    initial_name: Option<&str>,
    input: &mut R,
    out: &mut W,
) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    if let Some(name) = initial_name {
        if !controller.set_name(name).await {
            tracing::warn!("Ignoring blank --name");
        }
    }

    while controller.snapshot().await.is_naming() {
        write!(out, "What's your new pet's name? ")?;
        out.flush()?;
        let Some(line) = read_line(input).await? else {
            return Ok(false);
        };
        controller.set_name(&line).await;
    }
    Ok(true)
}

async fn report<W: Write>(
    controller: &CompanionController,
    outcome: std::result::Result<(), CompanionError>,
    out: &mut W,
) -> Result<()> {
    let state = controller.snapshot().await;
    match outcome {
        Ok(()) => {
            writeln!(out, "{}: {}", state.companion_name, state.last_response_text)?;
            writeln!(out, "{}", render_mood(&state))?;
        }
        Err(CompanionError::Busy) if state.is_recording => {
            writeln!(out, "Still listening. Type /listen to finish first.")?
        }
        Err(e) => writeln!(out, "{}", describe_error(&e, &state.companion_name))?,
    }
    Ok(())
}

async fn thinking<W: Write>(controller: &CompanionController, out: &mut W) -> Result<()> {
    let name = controller.snapshot().await.companion_name;
    writeln!(out, "{}", controller.prompts().thinking(&name))?;
    out.flush()?;
    Ok(())
}

/// Runs the session until `/quit` or end of input.
pub async fn run<R, W>(
    controller: &CompanionController,
    initial_name: Option<&str>,
    mut input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    if !name_companion(controller, initial_name, &mut input, out).await? {
        return Ok(());
    }

    let state = controller.snapshot().await;
    writeln!(out, "{}: {}", state.companion_name, state.last_response_text)?;
    writeln!(out, "{}", render_mood(&state))?;
    writeln!(out, "Type /help for commands.")?;

    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = read_line(&mut input).await? else {
            break;
        };

        match parse_line(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Care(action, text) => {
                thinking(controller, out).await?;
                let outcome = controller.perform_action(action, text.as_deref()).await;
                report(controller, outcome, out).await?;
            }
            ReplCommand::Say(text) => {
                controller.set_input(&text).await;
                thinking(controller, out).await?;
                let outcome = controller.send().await;
                report(controller, outcome, out).await?;
            }
            ReplCommand::Listen => {
                if controller.snapshot().await.is_recording {
                    writeln!(out, "Processing speech...")?;
                    out.flush()?;
                    match controller.stop_listening().await {
                        Ok(transcript) => {
                            writeln!(out, "You said: {transcript}")?;
                            report(controller, Ok(()), out).await?;
                        }
                        Err(e) => report(controller, Err(e), out).await?,
                    }
                } else {
                    match controller.start_listening().await {
                        Ok(()) => writeln!(out, "Listening... type /listen again to stop.")?,
                        Err(e) => report(controller, Err(e), out).await?,
                    }
                }
            }
            ReplCommand::ShowMood => {
                writeln!(out, "{}", render_mood(&controller.snapshot().await))?;
            }
            ReplCommand::ShowMemory => {
                writeln!(out, "{}", render_memory(&controller.snapshot().await))?;
            }
            ReplCommand::Help => writeln!(out, "{HELP}")?,
            ReplCommand::Quit => break,
            ReplCommand::Unknown(word) => {
                writeln!(out, "Unknown command /{word}. Type /help for commands.")?;
            }
        }
    }

    if controller.cancel_listening().await {
        writeln!(out, "Stopped listening.")?;
    }
    let state = controller.snapshot().await;
    writeln!(out, "Bye from {}!", state.companion_name)?;
    Ok(())
}
