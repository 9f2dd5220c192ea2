//! Session controller
//!
//! Composes the transport, capture, playback and dispatch pieces into one
//! conversation loop. Turns are serialized through [`TurnState`]: a submission
//! is only accepted while Idle, Sending always returns to Idle, and every
//! failure surfaces as a spoken utterance instead of a crash or a stuck state.

use crate::audio::capture::{AudioSource, CaptureController};
use crate::audio::playback::{
    AudioOutput, FallbackSynthesizer, PlaybackController, SpeechProvider,
};
use crate::config::ClientConfig;
use crate::dispatch::{apply_results, EffectSink};
use crate::protocol::{
    ResponseEnvelope, Turn, INTERACTION_GENERAL, INTERACTION_MEAL_COMPLETED,
};
use crate::session::state::{DisplayState, TurnState};
use crate::session::{
    MAX_IMAGE_BYTES, MSG_FILE_TOO_LARGE, MSG_IMAGE_PROMPT, MSG_MEAL_COMPLETED, MSG_NEW_RECIPE,
    MSG_NEW_RECIPE_ERROR, MSG_UNSUPPORTED_FILE_TYPE, SUPPORTED_IMAGE_MIME,
};
use crate::transport::AgentBackend;
use crate::{Result, SanaError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Adapts the backend text-to-speech endpoint to the playback seam
struct BackendSpeech<B> {
    backend: Arc<B>,
    voice: String,
}

#[async_trait]
impl<B: AgentBackend> SpeechProvider for BackendSpeech<B> {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.backend.synthesize_speech(text, &self.voice).await
    }
}

/// The conversation loop: one controller per signed-in user session
pub struct SessionController<B, S> {
    backend: Arc<B>,
    config: ClientConfig,
    capture: CaptureController<S>,
    playback: PlaybackController,
    state: TurnState,
    pub display: DisplayState,
}

impl<B, S> SessionController<B, S>
where
    B: AgentBackend + 'static,
    S: AudioSource,
{
    pub fn new(
        backend: Arc<B>,
        source: S,
        output: Arc<dyn AudioOutput>,
        config: ClientConfig,
    ) -> Self {
        let provider = Arc::new(BackendSpeech {
            backend: Arc::clone(&backend),
            voice: config.tts_voice.clone(),
        });
        let playback = PlaybackController::new(provider, output)
            .with_voice(config.fallback_voice.clone())
            .with_waveform(config.waveform_interval_ms, config.waveform_bars);

        Self {
            backend,
            config,
            capture: CaptureController::new(source),
            playback,
            state: TurnState::Idle,
            display: DisplayState::default(),
        }
    }

    /// Install the on-device fallback synthesizer
    pub fn with_fallback(mut self, fallback: Box<dyn FallbackSynthesizer>) -> Self {
        self.playback = self.playback.with_fallback(fallback);
        self
    }

    pub fn turn_state(&self) -> TurnState {
        self.state
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    /// Load profile, medications and health history. Each fetch is independent;
    /// one failing leaves the others applied.
    pub async fn bootstrap(&mut self) {
        match self.backend.fetch_profile().await {
            Ok(profile) => self.display.profile = Some(profile),
            Err(e) => warn!(error = %e, "profile fetch failed"),
        }

        match self.backend.fetch_medications().await {
            Ok(medications) => self.display.medications = medications,
            Err(e) => warn!(error = %e, "medication fetch failed"),
        }

        match self.backend.fetch_health_history(self.config.history_limit).await {
            Ok(history) => self.display.health = history,
            Err(e) => warn!(error = %e, "health history fetch failed"),
        }

        info!(
            agent = self.display.agent_name().unwrap_or("unset"),
            medications = self.display.medications.len(),
            samples = self.display.health.samples.len(),
            "session bootstrapped"
        );
    }

    /// Send a plain text message as a general conversation turn
    pub async fn submit_text(&mut self, message: &str) -> Result<()> {
        if message.trim().is_empty() {
            return Ok(());
        }
        if self.state != TurnState::Idle {
            debug!(state = ?self.state, "text submission ignored");
            return Ok(());
        }

        self.run_turn(Turn::text(message, INTERACTION_GENERAL)).await
    }

    /// Send an ingredient photo as a recipe turn. The file is validated
    /// client-side before any network traffic; violations are spoken.
    pub async fn submit_image(&mut self, data: Vec<u8>, mime: &str) -> Result<()> {
        if self.state != TurnState::Idle {
            debug!(state = ?self.state, "image submission ignored");
            return Ok(());
        }

        if !SUPPORTED_IMAGE_MIME.contains(&mime) {
            let err = SanaError::Validation(MSG_UNSUPPORTED_FILE_TYPE.to_string());
            self.playback.speak(&err.user_message()).await?;
            return Err(err);
        }
        if data.len() > MAX_IMAGE_BYTES {
            let err = SanaError::Validation(MSG_FILE_TOO_LARGE.to_string());
            self.playback.speak(&err.user_message()).await?;
            return Err(err);
        }

        self.run_turn(Turn::image(data, mime, MSG_IMAGE_PROMPT)).await
    }

    /// Begin a press-and-hold recording. Ignored unless Idle; a device
    /// acquisition failure is spoken and leaves the session Idle.
    pub async fn press_start(&mut self) -> Result<()> {
        if self.state != TurnState::Idle {
            debug!(state = ?self.state, "mic press ignored");
            return Ok(());
        }

        if let Err(e) = self.capture.start_capture() {
            self.playback.speak(&e.user_message()).await?;
            return Err(e);
        }
        self.state = TurnState::Recording;
        Ok(())
    }

    /// End the recording and send the captured clip as an audio turn.
    /// A release without a matching press, or an empty recording, is a no-op.
    pub async fn press_end(&mut self) -> Result<()> {
        if self.state != TurnState::Recording {
            debug!(state = ?self.state, "mic release ignored");
            return Ok(());
        }
        self.state = TurnState::Idle;

        let clip = match self.capture.stop_capture() {
            Ok(clip) => clip,
            Err(e) => {
                self.playback.speak(&e.user_message()).await?;
                return Err(e);
            }
        };

        match clip {
            Some(clip) => self.run_turn(Turn::audio(clip)).await,
            None => Ok(()),
        }
    }

    /// Abandon an in-progress recording without sending anything
    pub fn cancel_recording(&mut self) {
        if self.state == TurnState::Recording {
            self.capture.cancel_capture();
            self.state = TurnState::Idle;
        }
    }

    /// Notify the backend the current meal is done. On success the recipe is
    /// cleared, health history is refetched and the dashboard is shown;
    /// function results on this turn are intentionally not dispatched. A
    /// failed turn only speaks the apology and leaves the display untouched.
    pub async fn complete_meal(&mut self) -> Result<()> {
        if self.state != TurnState::Idle {
            debug!(state = ?self.state, "meal completion ignored");
            return Ok(());
        }

        self.state = TurnState::Sending;
        let outcome = self
            .backend
            .send_turn(&Turn::text(MSG_MEAL_COMPLETED, INTERACTION_MEAL_COMPLETED))
            .await;
        self.state = TurnState::Idle;

        let envelope = match outcome {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "meal completion turn failed");
                return self.playback.speak(&e.user_message()).await;
            }
        };

        self.display.recipe = None;
        match self.backend.fetch_health_history(self.config.history_limit).await {
            Ok(history) => self.display.health = history,
            Err(e) => warn!(error = %e, "health refresh failed after meal completion"),
        }
        self.display.dashboard_visible = true;

        if let Some(text) = envelope.reply_text {
            self.playback.speak(&text).await?;
        }
        Ok(())
    }

    /// Ask the agent for another recipe with the fixed request message. The
    /// envelope goes through the usual dispatch; a failed turn speaks its own
    /// apology.
    pub async fn generate_new_recipe(&mut self) -> Result<()> {
        if self.state != TurnState::Idle {
            debug!(state = ?self.state, "new recipe request ignored");
            return Ok(());
        }

        self.state = TurnState::Sending;
        let outcome = self
            .backend
            .send_turn(&Turn::text(MSG_NEW_RECIPE, INTERACTION_GENERAL))
            .await;
        self.state = TurnState::Idle;

        match outcome {
            Ok(envelope) => self.apply_envelope(envelope).await,
            Err(e) => {
                warn!(error = %e, "new recipe turn failed");
                self.playback.speak(MSG_NEW_RECIPE_ERROR).await
            }
        }
    }

    /// Read the current recipe aloud: name, ingredients, preparation.
    /// No-op without a recipe on display.
    pub async fn narrate_recipe(&mut self) -> Result<()> {
        let Some(narration) = self.display.recipe.as_ref().map(|r| r.narration()) else {
            debug!("narration requested without a recipe");
            return Ok(());
        };
        self.playback.speak(&narration).await
    }

    /// Refetch profile, medications and health history after a backend-side
    /// write. Same failure tolerance as bootstrap.
    pub async fn reload_all(&mut self) {
        debug!("reloading session data");
        self.bootstrap().await;
    }

    async fn run_turn(&mut self, turn: Turn) -> Result<()> {
        info!(turn = %turn.id, interaction = %turn.interaction_type, "turn dispatched");
        self.state = TurnState::Sending;
        let outcome = self.backend.send_turn(&turn).await;
        self.state = TurnState::Idle;

        match outcome {
            Ok(envelope) => self.apply_envelope(envelope).await,
            Err(e) => {
                warn!(error = %e, "turn failed");
                self.playback.speak(&e.user_message()).await
            }
        }
    }

    async fn apply_envelope(&mut self, envelope: ResponseEnvelope) -> Result<()> {
        apply_results(&envelope.executed_functions, &mut self.display);

        // Legacy direct recipe field wins over anything the functions applied
        if let Some(recipe) = envelope.recipe {
            self.display.replace_recipe(recipe);
        }

        if self.display.take_reload_request() {
            self.reload_all().await;
        }

        if let Some(text) = envelope.reply_text {
            self.playback.speak(&text).await?;
        }
        Ok(())
    }
}
