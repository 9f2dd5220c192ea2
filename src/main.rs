use anyhow::Result;
use sana::config::ClientConfig;
use sana::session::SessionController;
use sana::transport::AgentTransport;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "audio-io")]
fn audio_parts() -> (sana::audio::CpalSource, Arc<dyn sana::audio::AudioOutput>) {
    (sana::audio::CpalSource::new(), Arc::new(sana::audio::RodioOutput))
}

#[cfg(not(feature = "audio-io"))]
fn audio_parts() -> (NullSource, Arc<dyn sana::audio::AudioOutput>) {
    (NullSource, Arc::new(NullOutput))
}

#[cfg(not(feature = "audio-io"))]
struct NullSource;

#[cfg(not(feature = "audio-io"))]
impl sana::audio::AudioSource for NullSource {
    fn start(&mut self, _chunk_tx: crossbeam_channel::Sender<Vec<f32>>) -> sana::Result<u32> {
        Err(sana::SanaError::Device(
            "Built without audio support".to_string(),
        ))
    }

    fn stop(&mut self) {}
}

#[cfg(not(feature = "audio-io"))]
struct NullOutput;

#[cfg(not(feature = "audio-io"))]
impl sana::audio::AudioOutput for NullOutput {
    fn open(&self, _bytes: Vec<u8>) -> sana::Result<Box<dyn sana::audio::AudioSink>> {
        Err(sana::SanaError::Device(
            "Built without audio support".to_string(),
        ))
    }
}

fn mime_for(path: &str) -> &'static str {
    match path.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sana=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sana assistant client");

    let mut config = ClientConfig::new(
        std::env::var("SANA_URL").unwrap_or_else(|_| "http://localhost:4000".to_string()),
    );
    if let Ok(token) = std::env::var("SANA_TOKEN") {
        config = config.with_token(token);
    }

    let backend = Arc::new(AgentTransport::new(&config));
    let (source, output) = audio_parts();
    let mut session = SessionController::new(backend, source, output, config);

    session.bootstrap().await;
    const COMMANDS: &str =
        "/rec /foto <arquivo> /refeicao /outra /narrar /pausar /repetir /sair";
    if let Some(name) = session.display.agent_name() {
        println!("Conversando com {name}. Comandos: {COMMANDS}");
    } else {
        println!("Comandos: {COMMANDS}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
            ("/sair", _) => break,
            ("/rec", _) => {
                if session.turn_state() == sana::session::TurnState::Recording {
                    let _ = session.press_end().await;
                } else {
                    let _ = session.press_start().await;
                }
            }
            ("/foto", path) if !path.is_empty() => {
                match tokio::fs::read(path).await {
                    Ok(data) => {
                        let _ = session.submit_image(data, mime_for(path)).await;
                    }
                    Err(e) => eprintln!("Não foi possível ler {path}: {e}"),
                }
            }
            ("/refeicao", _) => {
                let _ = session.complete_meal().await;
            }
            ("/outra", _) => {
                let _ = session.generate_new_recipe().await;
                if let Some(recipe) = &session.display.recipe {
                    println!("Receita: {}", recipe.name);
                }
            }
            ("/narrar", _) => {
                let _ = session.narrate_recipe().await;
            }
            ("/pausar", _) => session.playback().toggle_playback(),
            ("/repetir", _) => session.playback().replay(),
            _ if !line.is_empty() => {
                let _ = session.submit_text(line).await;
                if let Some(recipe) = &session.display.recipe {
                    println!("Receita: {}", recipe.name);
                }
            }
            _ => {}
        }
    }

    session.playback().stop();
    info!("Session ended");
    Ok(())
}
