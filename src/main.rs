use std::sync::Arc;

use anyhow::Context;
use jeanne::audio::{AudioSink, LogSink, PlaybackQueue};
use jeanne::kernel::driver::{ConversationDriver, DriverEvent};
use jeanne::kernel::message::Speaker;
use jeanne::services::api::ApiClient;
use jeanne::ClientConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config = ClientConfig::from_env()?;
    let origin = config.origin()?;
    tracing::info!(%origin, "Jeanne client booting...");

    let api = Arc::new(ApiClient::new(origin.clone()));
    let queue = Arc::new(PlaybackQueue::from_config(open_sink(), origin, &config));
    let (driver, mut events) = ConversationDriver::new(api, queue, &config);

    if driver.open_session().await.is_none() {
        println!("Backend unreachable; nothing will work until it is restarted.");
    }

    let max_turns = config.max_turns;
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            render(&event, max_turns);
        }
    });

    println!("Commands: 'start', 'stop', 'info', 'quit'. Anything else is said to Jeanne.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "start" => {
                let driver = driver.clone();
                tokio::spawn(async move { driver.start().await });
            }
            "stop" => driver.stop().await,
            "info" => match driver.session_info().await {
                Ok(Some(info)) => println!(
                    "[SESSION] {} turn {} active={} scam={:?} stage={:?}",
                    info.session_id, info.turn_count, info.active, info.scam_type, info.current_stage
                ),
                Ok(None) => println!("[SESSION] none"),
                Err(e) => println!("[SESSION] unavailable: {e}"),
            },
            _ if driver.pending_intervention().is_some() => match line.parse::<usize>() {
                Ok(n) if n >= 1 => {
                    if let Err(e) = driver.resolve_intervention(n - 1) {
                        println!("[INTERVENTION] {e}");
                    }
                }
                _ => println!("[INTERVENTION] answer with the number of a choice"),
            },
            text => {
                let driver = driver.clone();
                let text = text.to_string();
                tokio::spawn(async move { driver.send_manual(&text).await });
            }
        }
    }

    driver.stop().await;
    driver.close_session().await;
    Ok(())
}

#[cfg(feature = "speaker")]
fn open_sink() -> Arc<dyn AudioSink> {
    match jeanne::audio::SpeakerSink::open() {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            tracing::warn!(error = %e, "no audio device, falling back to log output");
            Arc::new(LogSink)
        }
    }
}

#[cfg(not(feature = "speaker"))]
fn open_sink() -> Arc<dyn AudioSink> {
    Arc::new(LogSink)
}

fn render(event: &DriverEvent, max_turns: u32) {
    match event {
        DriverEvent::LogReset => println!("--------------------------------"),
        DriverEvent::MessageAppended(message) => {
            let who = match message.speaker {
                Speaker::Scammer => "Arnaqueur",
                Speaker::Persona => "Jeanne",
            };
            println!("[{who}] {}", message.text);
        }
        DriverEvent::TurnNumber(turn) if *turn > 0 => println!("[TOUR {turn} / {max_turns}]"),
        DriverEvent::InterventionRequested(request) => {
            println!("[INTERVENTION] {}", request.message);
            for (index, choice) in request.choices.iter().enumerate() {
                println!("  {}. {choice}", index + 1);
            }
        }
        DriverEvent::Director(info) => {
            tracing::debug!(scam = %info.scam_type, stage = %info.stage, "director");
        }
        DriverEvent::RunFinished(outcome) => println!("[FIN] {outcome:?}"),
        _ => {}
    }
}
