//! Text-to-speech playback
//!
//! Turns response text into audible speech through the backend synthesis
//! endpoint, with an on-device fallback synthesizer, and drives the waveform
//! indicator while audio is playing. At most one [`AudioSession`] is live at a
//! time; its underlying resource is released exactly once on every exit path:
//! normal completion, error, explicit stop, or a superseding `speak()` call.

use crate::config::FallbackVoice;
use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source of synthesized speech bytes (the backend text-to-speech endpoint)
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Handle to one playing audio resource. Implementations must halt playback
/// and free the device when dropped or stopped.
pub trait AudioSink: Send {
    fn pause(&self);
    fn resume(&self);

    /// Reset the playback position to the start and resume
    fn restart(&self);

    /// Halt playback and release the underlying resource
    fn stop(&self);

    fn is_finished(&self) -> bool;
    fn is_paused(&self) -> bool;
}

/// Opens synthesized audio bytes into a playing sink
pub trait AudioOutput: Send + Sync {
    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn AudioSink>>;
}

/// On-device single-shot synthesizer used when the backend path fails.
/// Blocks until the utterance has been spoken.
pub trait FallbackSynthesizer: Send {
    fn speak_blocking(&mut self, text: &str, voice: &FallbackVoice) -> Result<()>;
}

/// Playback lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Synthesizing,
    Playing,
    Paused,
}

/// The live resource and playback state for one utterance
pub struct AudioSession {
    sink: Option<Box<dyn AudioSink>>,
}

impl AudioSession {
    fn new(sink: Box<dyn AudioSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Stop playback and free the resource. Idempotent: the handle is taken
    /// on first release.
    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            debug!("audio session released");
        }
    }

    fn pause(&self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&self) {
        if let Some(sink) = &self.sink {
            sink.resume();
        }
    }

    fn restart(&self) {
        if let Some(sink) = &self.sink {
            sink.restart();
        }
    }

    fn is_finished(&self) -> bool {
        self.sink.as_ref().map(|s| s.is_finished()).unwrap_or(true)
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.release();
    }
}

struct PlaybackShared {
    session: Option<AudioSession>,
    state: PlaybackState,
    fallback_active: bool,
    player_visible: bool,
    waveform: Vec<f32>,
}

impl PlaybackShared {
    fn reset(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release();
        }
        self.state = PlaybackState::Idle;
        self.fallback_active = false;
        self.player_visible = false;
        self.waveform.clear();
    }
}

/// Turn-taking playback controller: Idle → Synthesizing → Playing → Idle,
/// with a Synthesizing → Idle failure path through the fallback synthesizer.
pub struct PlaybackController {
    provider: Arc<dyn SpeechProvider>,
    output: Arc<dyn AudioOutput>,
    fallback: Option<Arc<Mutex<Box<dyn FallbackSynthesizer>>>>,
    voice: FallbackVoice,
    shared: Arc<Mutex<PlaybackShared>>,
    /// Bumped by every speak()/stop(); stale sampler tasks observe the bump
    /// and exit.
    generation: Arc<AtomicU64>,
    waveform_interval: Duration,
    waveform_bars: usize,
}

impl PlaybackController {
    pub fn new(provider: Arc<dyn SpeechProvider>, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            provider,
            output,
            fallback: None,
            voice: FallbackVoice::default(),
            shared: Arc::new(Mutex::new(PlaybackShared {
                session: None,
                state: PlaybackState::Idle,
                fallback_active: false,
                player_visible: false,
                waveform: Vec::new(),
            })),
            generation: Arc::new(AtomicU64::new(0)),
            waveform_interval: Duration::from_millis(100),
            waveform_bars: 20,
        }
    }

    /// Install the on-device fallback synthesizer
    pub fn with_fallback(mut self, fallback: Box<dyn FallbackSynthesizer>) -> Self {
        self.fallback = Some(Arc::new(Mutex::new(fallback)));
        self
    }

    /// Set the fallback voice parameters
    pub fn with_voice(mut self, voice: FallbackVoice) -> Self {
        self.voice = voice;
        self
    }

    /// Set the waveform indicator cadence and bar count
    pub fn with_waveform(mut self, interval_ms: u64, bars: usize) -> Self {
        self.waveform_interval = Duration::from_millis(interval_ms);
        self.waveform_bars = bars;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state
    }

    pub fn is_player_visible(&self) -> bool {
        self.shared.lock().player_visible
    }

    /// Current waveform indicator amplitudes (empty unless playing)
    pub fn waveform(&self) -> Vec<f32> {
        self.shared.lock().waveform.clone()
    }

    /// Speak the given text. Any live session is stopped and released before
    /// the new one starts; errors fall back to the on-device synthesizer and
    /// never propagate past it.
    pub async fn speak(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut shared = self.shared.lock();
            if let Some(mut old) = shared.session.take() {
                old.release();
            }
            shared.state = PlaybackState::Synthesizing;
            shared.fallback_active = false;
            shared.player_visible = true;
            shared.waveform.clear();
        }

        let opened = match self.provider.synthesize(text).await {
            Ok(bytes) => {
                if self.superseded(generation) {
                    return Ok(());
                }
                self.output.open(bytes)
            }
            Err(e) => Err(e),
        };

        if self.superseded(generation) {
            if let Ok(sink) = opened {
                // A newer utterance took over while we were synthesizing
                sink.stop();
            }
            return Ok(());
        }

        match opened {
            Ok(sink) => {
                {
                    let mut shared = self.shared.lock();
                    shared.session = Some(AudioSession::new(sink));
                    shared.state = PlaybackState::Playing;
                }
                info!("playback started");
                self.spawn_sampler(generation);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "speech synthesis failed, using fallback");
                self.speak_fallback(text, generation).await
            }
        }
    }

    /// Pause if playing, resume if paused. No-op without a primary session or
    /// while the fallback path is active.
    pub fn toggle_playback(&self) {
        let mut shared = self.shared.lock();
        if shared.fallback_active || shared.session.is_none() {
            return;
        }

        match shared.state {
            PlaybackState::Playing => {
                if let Some(session) = &shared.session {
                    session.pause();
                }
                shared.state = PlaybackState::Paused;
                shared.waveform.clear();
                debug!("playback paused");
            }
            PlaybackState::Paused => {
                if let Some(session) = &shared.session {
                    session.resume();
                }
                shared.state = PlaybackState::Playing;
                debug!("playback resumed");
            }
            _ => {}
        }
    }

    /// Reset the playback position to the start and resume. Primary sessions
    /// only; the fallback path cannot be replayed.
    pub fn replay(&self) {
        let mut shared = self.shared.lock();
        if shared.fallback_active {
            return;
        }
        if let Some(session) = &shared.session {
            session.restart();
            shared.state = PlaybackState::Playing;
            debug!("playback restarted");
        }
    }

    /// Stop playback and release the live session, if any
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.lock().reset();
    }

    fn superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    async fn speak_fallback(&self, text: &str, generation: u64) -> Result<()> {
        let Some(fallback) = self.fallback.clone() else {
            debug!("no fallback synthesizer configured");
            self.shared.lock().reset();
            return Ok(());
        };

        {
            let mut shared = self.shared.lock();
            shared.state = PlaybackState::Playing;
            shared.fallback_active = true;
        }
        self.spawn_sampler(generation);

        let text = text.to_string();
        let voice = self.voice.clone();
        let spoken = tokio::task::spawn_blocking(move || fallback.lock().speak_blocking(&text, &voice))
            .await
            .unwrap_or_else(|e| Err(crate::SanaError::Synthesis(format!("Fallback panicked: {e}"))));

        if let Err(e) = spoken {
            // Fallback failure forces Idle with no further escalation
            warn!(error = %e, "fallback synthesizer failed");
        }

        if !self.superseded(generation) {
            self.shared.lock().reset();
        }
        Ok(())
    }

    /// Periodic waveform sampler; also watches the primary sink for
    /// completion. Exits the instant playback stops, errors or is superseded.
    fn spawn_sampler(&self, generation: u64) {
        let shared = Arc::clone(&self.shared);
        let current = Arc::clone(&self.generation);
        let interval = self.waveform_interval;
        let bars = self.waveform_bars;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if current.load(Ordering::SeqCst) != generation {
                    break;
                }

                let mut guard = shared.lock();
                match guard.state {
                    PlaybackState::Playing => {
                        let finished = guard
                            .session
                            .as_ref()
                            .map(|s| s.is_finished())
                            .unwrap_or(false);
                        if finished {
                            guard.reset();
                            debug!("playback complete");
                            break;
                        }

                        let mut rng = rand::thread_rng();
                        guard.waveform = (0..bars).map(|_| rng.gen::<f32>()).collect();
                    }
                    PlaybackState::Paused => {
                        // Sampling is suspended; resume picks it back up
                    }
                    PlaybackState::Idle | PlaybackState::Synthesizing => break,
                }
            }
        });
    }
}

/// Playback output backed by rodio. Each opened sink runs a dedicated worker
/// thread owning the output stream, controlled over a channel; dropping the
/// handle or sending stop releases the device.
#[cfg(feature = "audio-io")]
pub struct RodioOutput;

#[cfg(feature = "audio-io")]
enum SinkCommand {
    Pause,
    Resume,
    Restart,
    Stop,
}

#[cfg(feature = "audio-io")]
struct RodioSink {
    command_tx: crossbeam_channel::Sender<SinkCommand>,
    finished: Arc<std::sync::atomic::AtomicBool>,
    paused: Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(feature = "audio-io")]
impl AudioSink for RodioSink {
    fn pause(&self) {
        let _ = self.command_tx.send(SinkCommand::Pause);
    }

    fn resume(&self) {
        let _ = self.command_tx.send(SinkCommand::Resume);
    }

    fn restart(&self) {
        let _ = self.command_tx.send(SinkCommand::Restart);
    }

    fn stop(&self) {
        let _ = self.command_tx.send(SinkCommand::Stop);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

#[cfg(feature = "audio-io")]
impl AudioOutput for RodioOutput {
    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn AudioSink>> {
        use crate::SanaError;
        use std::sync::atomic::AtomicBool;

        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let finished = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));

        let worker_finished = Arc::clone(&finished);
        let worker_paused = Arc::clone(&paused);

        // The output stream is not Send, so one worker thread owns it for the
        // lifetime of the sink.
        std::thread::spawn(move || {
            let started: Result<(rodio::OutputStream, rodio::Sink)> = (|| {
                let (stream, handle) = rodio::OutputStream::try_default()
                    .map_err(|e| SanaError::Device(format!("No output device: {e}")))?;
                let sink = rodio::Sink::try_new(&handle)
                    .map_err(|e| SanaError::Device(format!("Failed to open sink: {e}")))?;
                let source = rodio::Decoder::new(std::io::Cursor::new(bytes))
                    .map_err(|e| SanaError::Synthesis(format!("Failed to decode audio: {e}")))?;
                sink.append(source);
                sink.play();
                Ok((stream, sink))
            })();

            let (_stream, sink) = match started {
                Ok(parts) => {
                    let _ = ready_tx.send(Ok(()));
                    parts
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            loop {
                match command_rx.recv_timeout(Duration::from_millis(50)) {
                    Ok(SinkCommand::Pause) => {
                        sink.pause();
                        worker_paused.store(true, Ordering::SeqCst);
                    }
                    Ok(SinkCommand::Resume) => {
                        sink.play();
                        worker_paused.store(false, Ordering::SeqCst);
                    }
                    Ok(SinkCommand::Restart) => {
                        if sink.try_seek(Duration::ZERO).is_ok() {
                            sink.play();
                            worker_paused.store(false, Ordering::SeqCst);
                        }
                    }
                    Ok(SinkCommand::Stop) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                        sink.stop();
                        break;
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                }

                if sink.empty() {
                    worker_finished.store(true, Ordering::SeqCst);
                    break;
                }
            }
            // Dropping the stream and sink here frees the device handle
        });

        ready_rx
            .recv()
            .map_err(|_| SanaError::Device("Playback worker exited".to_string()))??;

        Ok(Box::new(RodioSink {
            command_tx,
            finished,
            paused,
        }))
    }
}

/// On-device VITS fallback using sherpa. Single-shot: synthesize the whole
/// utterance, then play it to completion.
#[cfg(all(feature = "local-tts", feature = "audio-io"))]
pub struct SherpaFallback {
    tts: sherpa_rs::tts::VitsTts,
    speaker_id: i32,
}

#[cfg(all(feature = "local-tts", feature = "audio-io"))]
impl SherpaFallback {
    pub fn new(model_path: impl Into<String>, tokens_path: impl Into<String>) -> Self {
        let config = sherpa_rs::tts::VitsTtsConfig {
            model: model_path.into(),
            tokens: tokens_path.into(),
            ..Default::default()
        };
        Self {
            tts: sherpa_rs::tts::VitsTts::new(config),
            speaker_id: 0,
        }
    }
}

#[cfg(all(feature = "local-tts", feature = "audio-io"))]
impl FallbackSynthesizer for SherpaFallback {
    fn speak_blocking(&mut self, text: &str, voice: &FallbackVoice) -> Result<()> {
        use crate::SanaError;

        let audio = self
            .tts
            .create(text, self.speaker_id, voice.rate)
            .map_err(|e| SanaError::Synthesis(format!("Fallback synthesis failed: {e}")))?;

        let (_stream, handle) = rodio::OutputStream::try_default()
            .map_err(|e| SanaError::Device(format!("No output device: {e}")))?;
        let sink = rodio::Sink::try_new(&handle)
            .map_err(|e| SanaError::Device(format!("Failed to open sink: {e}")))?;

        // Raising the nominal sample rate raises the perceived pitch
        let sample_rate = (audio.sample_rate as f32 * voice.pitch) as u32;
        sink.append(rodio::buffer::SamplesBuffer::new(1, sample_rate, audio.samples));
        sink.sleep_until_end();
        Ok(())
    }
}
