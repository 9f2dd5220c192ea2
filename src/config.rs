//! Client configuration
//!
//! Centralized configuration for the transport, audio subsystem and session.

/// Voice parameters for the on-device fallback synthesizer
#[derive(Clone, Debug)]
pub struct FallbackVoice {
    /// BCP-47 locale tag
    pub locale: String,

    /// Speech rate (1.0 = normal)
    pub rate: f32,

    /// Pitch multiplier (1.0 = normal)
    pub pitch: f32,
}

impl Default for FallbackVoice {
    fn default() -> Self {
        // Slightly slow, slightly raised voice for readability
        Self {
            locale: "pt-BR".to_string(),
            rate: 0.9,
            pitch: 1.1,
        }
    }
}

/// Configuration for the complete client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the agent backend, without a trailing slash
    pub base_url: String,

    /// Bearer token for authenticated endpoints; the header is omitted when absent
    pub bearer_token: Option<String>,

    /// Voice requested from the backend text-to-speech endpoint
    pub tts_voice: String,

    /// Fallback synthesizer voice parameters
    pub fallback_voice: FallbackVoice,

    /// Number of health samples fetched for the dashboard
    pub history_limit: u32,

    /// Interval between waveform indicator updates, in milliseconds
    pub waveform_interval_ms: u64,

    /// Number of bars in the waveform indicator
    pub waveform_bars: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            bearer_token: None,
            tts_voice: "nova".to_string(),
            fallback_voice: FallbackVoice::default(),
            history_limit: 7,
            waveform_interval_ms: 100,
            waveform_bars: 20,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration for the given backend
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the backend text-to-speech voice
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.tts_voice = voice.into();
        self
    }

    /// Set the dashboard history window
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }
}
