//! Integration tests over the session state machine, driven through the
//! public API with an in-memory backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use sana::audio::{AudioOutput, AudioSink, AudioSource};
use sana::config::ClientConfig;
use sana::dispatch::EffectSink;
use sana::protocol::{
    FunctionName, FunctionOutcome, FunctionResult, HealthHistory, Medication, Recipe,
    ResponseEnvelope, Turn, TurnKind, UserProfile,
};
use sana::session::{SessionController, TurnState};
use sana::transport::AgentBackend;
use sana::{Result, SanaError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct ScriptedBackend {
    envelopes: Mutex<VecDeque<Result<ResponseEnvelope>>>,
    sent: Mutex<Vec<Turn>>,
    spoken: Mutex<Vec<String>>,
    history_fetches: AtomicUsize,
}

impl ScriptedBackend {
    fn queue(&self, envelope: ResponseEnvelope) {
        self.envelopes.lock().push_back(Ok(envelope));
    }

    fn queue_error(&self, error: SanaError) {
        self.envelopes.lock().push_back(Err(error));
    }
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn send_turn(&self, turn: &Turn) -> Result<ResponseEnvelope> {
        self.sent.lock().push(turn.clone());
        self.envelopes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ResponseEnvelope::default()))
    }

    async fn synthesize_speech(&self, text: &str, _voice: &str) -> Result<Vec<u8>> {
        self.spoken.lock().push(text.to_string());
        Ok(vec![0u8; 32])
    }

    async fn fetch_profile(&self) -> Result<UserProfile> {
        Ok(UserProfile::default())
    }

    async fn fetch_medications(&self) -> Result<Vec<Medication>> {
        Ok(Vec::new())
    }

    async fn fetch_health_history(&self, _limit: u32) -> Result<HealthHistory> {
        self.history_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(HealthHistory::default())
    }
}

struct NullSink;

impl AudioSink for NullSink {
    fn pause(&self) {}
    fn resume(&self) {}
    fn restart(&self) {}
    fn stop(&self) {}
    fn is_finished(&self) -> bool {
        false
    }
    fn is_paused(&self) -> bool {
        false
    }
}

struct NullOutput;

impl AudioOutput for NullOutput {
    fn open(&self, _bytes: Vec<u8>) -> Result<Box<dyn AudioSink>> {
        Ok(Box::new(NullSink))
    }
}

struct ToneSource;

impl AudioSource for ToneSource {
    fn start(&mut self, chunk_tx: crossbeam_channel::Sender<Vec<f32>>) -> Result<u32> {
        let tone: Vec<f32> = (0..320)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 16000.0).sin() * 0.4)
            .collect();
        chunk_tx.try_send(tone).unwrap();
        Ok(16000)
    }

    fn stop(&mut self) {}
}

fn session(backend: Arc<ScriptedBackend>) -> SessionController<ScriptedBackend, ToneSource> {
    SessionController::new(backend, ToneSource, Arc::new(NullOutput), ClientConfig::default())
}

fn recipe(name: &str) -> Recipe {
    Recipe {
        name: name.to_string(),
        image_url: None,
        ingredients: vec!["aveia".to_string()],
        prep_time_min: Some(10),
        servings: Some(2),
        calories_per_serving: None,
        carbs_per_serving: None,
        protein_per_serving: None,
        glycemic_index: None,
        prep_instructions: Some("Misture.".to_string()),
    }
}

#[tokio::test]
async fn test_voice_turn_end_to_end() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.queue(ResponseEnvelope {
        reply_text: Some("Aqui está sua receita".to_string()),
        executed_functions: vec![FunctionResult {
            name: FunctionName::GenerateRecipe,
            result: FunctionOutcome {
                success: true,
                recipe: Some(recipe("Panqueca de aveia")),
                ..Default::default()
            },
        }],
        ..Default::default()
    });

    let mut session = session(Arc::clone(&backend));
    session.display.show_dashboard(HealthHistory::default());

    session.press_start().await.unwrap();
    assert_eq!(session.turn_state(), TurnState::Recording);

    session.press_end().await.unwrap();
    assert_eq!(session.turn_state(), TurnState::Idle);

    // Exactly one audio turn reached the backend, carrying a WAV clip
    let sent = backend.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    match &sent[0].kind {
        TurnKind::Audio { data, file_name } => {
            assert_eq!(file_name, "audio.wav");
            assert_eq!(&data[0..4], b"RIFF");
        }
        other => panic!("expected audio turn, got {other:?}"),
    }

    // The recipe populated and pushed the dashboard away
    assert_eq!(
        session.display.recipe.as_ref().unwrap().name,
        "Panqueca de aveia"
    );
    assert!(!session.display.dashboard_visible);

    // The reply text went through speech synthesis
    assert_eq!(backend.spoken.lock().as_slice(), ["Aqui está sua receita"]);
}

#[tokio::test]
async fn test_repeated_failures_never_leave_sending() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.queue_error(SanaError::Network("down".to_string()));
    backend.queue_error(SanaError::Backend("500".to_string()));
    backend.queue_error(SanaError::Auth("expired".to_string()));

    let mut session = session(Arc::clone(&backend));
    for message in ["um", "dois", "três"] {
        session.submit_text(message).await.unwrap();
        assert_eq!(session.turn_state(), TurnState::Idle);
    }

    // Every failure produced a spoken apology utterance
    assert_eq!(backend.spoken.lock().len(), 3);
}

#[tokio::test]
async fn test_meal_completion_without_function_results_still_refreshes() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.queue(ResponseEnvelope::default());

    let mut session = session(Arc::clone(&backend));
    session.display.replace_recipe(recipe("Almoço"));
    assert!(!session.display.dashboard_visible);

    session.complete_meal().await.unwrap();

    assert!(session.display.recipe.is_none());
    assert!(session.display.dashboard_visible);
    assert_eq!(backend.history_fetches.load(Ordering::SeqCst), 1);

    let sent = backend.sent.lock().clone();
    assert_eq!(sent[0].interaction_type, "meal_completed");
}

#[tokio::test]
async fn test_submissions_while_recording_are_ignored() {
    let backend = Arc::new(ScriptedBackend::default());
    let mut session = session(Arc::clone(&backend));

    session.press_start().await.unwrap();
    session.submit_text("deveria ser ignorado").await.unwrap();
    session.complete_meal().await.unwrap();
    assert!(backend.sent.lock().is_empty());
    assert_eq!(session.turn_state(), TurnState::Recording);

    session.press_end().await.unwrap();
    assert_eq!(backend.sent.lock().len(), 1);
}

#[tokio::test]
async fn test_image_turn_end_to_end() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.queue(ResponseEnvelope {
        reply_text: Some("Sugestão enviada".to_string()),
        recipe: Some(recipe("Omelete de legumes")),
        ..Default::default()
    });

    let mut session = session(Arc::clone(&backend));
    session.submit_image(vec![0u8; 2048], "image/webp").await.unwrap();

    let sent = backend.sent.lock().clone();
    assert_eq!(sent[0].interaction_type, "receita");
    assert_eq!(
        session.display.recipe.as_ref().unwrap().name,
        "Omelete de legumes"
    );
}
