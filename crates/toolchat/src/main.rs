//! A terminal chat client demonstrating `toolchat` as a library.

#[macro_use]
extern crate tracing;

use std::env;
use std::fmt::Display;
use std::io::Write as _;
use std::str::FromStr;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;
use toolchat::SessionBuilder;
use toolchat::core::{TranscriptSource, TurnOutcome};
use toolchat_ollama_model::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, OllamaConfigBuilder, OllamaProvider,
};

const BAR_CHAR: &str = "▎";
const INTRODUCTION: &str = "How can I help you?";
const EXIT_COMMAND: &str = "/bye";

const DEFAULT_SEED: i64 = 256;
const DEFAULT_TEMPERATURE: f64 = 0.0;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let base_url = env::var("OLLAMA_HOST")
        .map(|host| normalize_host(&host))
        .unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
    let model =
        env::var("TOOLCHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
    let seed = env_or("TOOLCHAT_SEED", DEFAULT_SEED);
    let temperature = env_or("TOOLCHAT_TEMPERATURE", DEFAULT_TEMPERATURE);
    let stream = env::var("TOOLCHAT_STREAM")
        .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let config = OllamaConfigBuilder::new()
        .with_base_url(base_url)
        .with_model(model)
        .with_option("seed", seed)
        .with_option("temperature", temperature)
        .with_stream(stream)
        .build();
    info!("using model `{}` at {}", config.model(), config.base_url());
    let model_provider = OllamaProvider::new(config);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let mut session = SessionBuilder::with_model_provider(model_provider)
        .with_system_prompt(
            include_str!("./system_prompt.md")
                .replace("{{HOST_OS}}", host_os()),
        )
        .with_introduction(INTRODUCTION)
        .on_transcript(move |transcript, source| {
            event_tx.send((transcript.to_owned(), source)).ok();
        })
        .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    print_transcript(INTRODUCTION, TranscriptSource::Assistant);

    // One reader for the whole session, so piped lines it has buffered
    // are not lost between turns.
    let mut stdin = io::BufReader::new(io::stdin());
    loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let line = line.trim();
        if line == EXIT_COMMAND {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let turn = session.send_message(line);
        tokio::pin!(turn);
        let mut progress_bar: Option<ProgressBar> = None;

        let result = loop {
            // Create a new progress bar if it has been finished.
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("🤔 Thinking...");
                    progress_bar
                })
                .inc(1);

            select! {
                result = &mut turn => break result,
                Some((transcript, source)) = event_rx.recv() => {
                    // Finish the progress bar before printing anything else.
                    if let Some(progress_bar) = progress_bar.take() {
                        progress_bar.finish_and_clear();
                    }
                    print_transcript(&transcript, source);
                }
                _ = sleep(Duration::from_millis(100)) => {}
            }
        };

        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        // The turn may finish before its last transcript is picked up.
        while let Ok((transcript, source)) = event_rx.try_recv() {
            print_transcript(&transcript, source);
        }

        match result {
            Ok(TurnOutcome::Answered(_)) => {}
            Ok(TurnOutcome::Fallback(_)) => {
                warn!("turn ended without an answer from the model");
            }
            Err(err) => {
                eprintln!("{}❌ {}", BAR_CHAR.bright_red(), err.bright_red());
            }
        }
    }
}

fn print_transcript(transcript: &str, source: TranscriptSource) {
    match source {
        TranscriptSource::Assistant => {
            println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                transcript.bright_white()
            );
        }
        TranscriptSource::ToolCall => {
            println!(
                "{}🔧 Running {}",
                BAR_CHAR.bright_yellow(),
                transcript.dimmed()
            );
        }
        TranscriptSource::Fallback => {
            println!("{}🤖 {}", BAR_CHAR.bright_magenta(), transcript.italic());
        }
    }
}

async fn read_line<R>(reader: &mut R) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();

    match reader.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

/// Reads a value from the environment, keeping `default` when it is unset
/// or does not parse.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Ok(value) = env::var(name) else {
        return default;
    };
    match value.trim().parse() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("{name} is invalid ({err}), using {default}");
            default
        }
    }
}

/// Accepts `OLLAMA_HOST` values with or without a scheme.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    if host.contains("://") {
        host.to_owned()
    } else {
        format!("http://{host}")
    }
}

#[inline]
fn host_os() -> &'static str {
    let os = std::env::consts::OS;
    match os {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        _ => "some other OS",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_line_keeps_buffered_lines() {
        let mut input = io::BufReader::new(&b"first\nsecond\n/bye\n"[..]);

        assert_eq!(read_line(&mut input).await.as_deref(), Some("first\n"));
        assert_eq!(read_line(&mut input).await.as_deref(), Some("second\n"));
        assert_eq!(read_line(&mut input).await.as_deref(), Some("/bye\n"));
        assert_eq!(read_line(&mut input).await, None);
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("0.0.0.0:11434"), "http://0.0.0.0:11434");
        assert_eq!(
            normalize_host(" https://ollama.local "),
            "https://ollama.local"
        );
    }
}
