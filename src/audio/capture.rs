//! Press-and-hold voice capture
//!
//! A [`CaptureController`] drives one [`RecordingSession`] at a time: chunks
//! stream in from the device source between start and stop, and stopping
//! finalizes them into a single WAV clip for the transport.

use crate::{Result, SanaError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

/// Device seam for the capture controller. Implementations deliver mono f32
/// chunks into the provided channel until stopped.
pub trait AudioSource {
    /// Acquire the input device and begin delivering chunks. Returns the
    /// device sample rate.
    fn start(&mut self, chunk_tx: Sender<Vec<f32>>) -> Result<u32>;

    /// Release the input device
    fn stop(&mut self);
}

/// Accumulated state of one in-progress recording
pub struct RecordingSession {
    chunks: Vec<Vec<f32>>,
    chunk_rx: Receiver<Vec<f32>>,
    sample_rate: u32,
}

impl RecordingSession {
    fn new(chunk_rx: Receiver<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            chunks: Vec::new(),
            chunk_rx,
            sample_rate,
        }
    }

    /// Pull every chunk the source has delivered so far
    fn drain(&mut self) {
        while let Ok(chunk) = self.chunk_rx.try_recv() {
            self.chunks.push(chunk);
        }
    }

    fn sample_count(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Concatenate the chunks and encode the clip
    fn into_clip(mut self) -> Result<Option<Vec<u8>>> {
        self.drain();
        if self.chunks.is_empty() {
            return Ok(None);
        }

        let mut samples = Vec::with_capacity(self.sample_count());
        for chunk in &self.chunks {
            samples.extend_from_slice(chunk);
        }

        let clip = super::encode_wav_clip(&samples, self.sample_rate)?;
        Ok(Some(clip))
    }
}

/// Recording lifecycle over an audio source: Idle → Capturing → Idle
pub struct CaptureController<S> {
    source: S,
    session: Option<RecordingSession>,
}

impl<S: AudioSource> CaptureController<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            session: None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    /// Acquire the device and begin accumulating chunks. Starting while
    /// already capturing is rejected; acquisition failures leave the
    /// controller Idle.
    pub fn start_capture(&mut self) -> Result<()> {
        if self.session.is_some() {
            warn!("start_capture rejected: already capturing");
            return Err(SanaError::Device("Already capturing".to_string()));
        }

        // Unbounded: chunks accumulate for the whole press, however long,
        // and are only drained when the recording ends
        let (chunk_tx, chunk_rx) = unbounded();
        let sample_rate = self.source.start(chunk_tx)?;
        self.session = Some(RecordingSession::new(chunk_rx, sample_rate));

        info!(sample_rate, "capture started");
        Ok(())
    }

    /// Release the device and finalize the clip. Returns None when nothing
    /// was captured or when called while Idle.
    pub fn stop_capture(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(session) = self.session.take() else {
            debug!("stop_capture while idle is a no-op");
            return Ok(None);
        };

        self.source.stop();
        let clip = session.into_clip()?;
        match &clip {
            Some(bytes) => info!(bytes = bytes.len(), "capture finalized"),
            None => debug!("capture finalized with no audio"),
        }
        Ok(clip)
    }

    /// Abandon the current recording without producing a clip
    pub fn cancel_capture(&mut self) {
        if self.session.take().is_some() {
            self.source.stop();
            debug!("capture cancelled");
        }
    }
}

/// Microphone source backed by cpal, downmixing to mono
#[cfg(feature = "audio-io")]
pub struct CpalSource {
    stream: Option<cpal::Stream>,
}

#[cfg(feature = "audio-io")]
impl CpalSource {
    pub fn new() -> Self {
        Self { stream: None }
    }
}

#[cfg(feature = "audio-io")]
impl Default for CpalSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "audio-io")]
impl AudioSource for CpalSource {
    fn start(&mut self, chunk_tx: Sender<Vec<f32>>) -> Result<u32> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
        use tracing::error;

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| SanaError::Device("No input device available".to_string()))?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config: cpal::StreamConfig = device
            .default_input_config()
            .map_err(|e| SanaError::Device(format!("Failed to get input config: {e}")))?
            .into();

        let sample_rate = config.sample_rate.0;
        let channels = config.channels as usize;

        let err_fn = |err| {
            error!("Audio input stream error: {}", err);
        };

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Average all channels to create mono
                    let samples = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };

                    if let Err(e) = chunk_tx.try_send(samples) {
                        debug!("Failed to send audio chunk: {}", e);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| SanaError::Device(format!("Failed to build input stream: {e}")))?;

        stream
            .play()
            .map_err(|e| SanaError::Device(format!("Failed to start input stream: {e}")))?;

        self.stream = Some(stream);
        Ok(sample_rate)
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!("input stream released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source that emits a fixed set of chunks when started
    struct FakeSource {
        chunks: Vec<Vec<f32>>,
        fail: bool,
        started: usize,
        stopped: usize,
    }

    impl FakeSource {
        fn with_chunks(chunks: Vec<Vec<f32>>) -> Self {
            Self {
                chunks,
                fail: false,
                started: 0,
                stopped: 0,
            }
        }

        fn failing() -> Self {
            Self {
                chunks: Vec::new(),
                fail: true,
                started: 0,
                stopped: 0,
            }
        }
    }

    impl AudioSource for FakeSource {
        fn start(&mut self, chunk_tx: Sender<Vec<f32>>) -> Result<u32> {
            if self.fail {
                return Err(SanaError::Device("permission denied".to_string()));
            }
            self.started += 1;
            for chunk in &self.chunks {
                chunk_tx.try_send(chunk.clone()).unwrap();
            }
            Ok(16000)
        }

        fn stop(&mut self) {
            self.stopped += 1;
        }
    }

    #[test]
    fn test_capture_roundtrip_produces_wav_clip() {
        let source = FakeSource::with_chunks(vec![vec![0.1; 160], vec![-0.1; 160]]);
        let mut controller = CaptureController::new(source);

        controller.start_capture().unwrap();
        assert!(controller.is_capturing());

        let clip = controller.stop_capture().unwrap().expect("clip expected");
        assert!(!controller.is_capturing());
        assert_eq!(&clip[0..4], b"RIFF");
        assert_eq!(clip.len(), 44 + 320 * 2);
    }

    #[test]
    fn test_long_capture_keeps_every_chunk() {
        let chunks: Vec<Vec<f32>> = (0..2000).map(|_| vec![0.2; 10]).collect();
        let mut controller = CaptureController::new(FakeSource::with_chunks(chunks));

        controller.start_capture().unwrap();
        let clip = controller.stop_capture().unwrap().expect("clip expected");
        assert_eq!(clip.len(), 44 + 2000 * 10 * 2);
    }

    #[test]
    fn test_double_start_is_rejected() {
        let source = FakeSource::with_chunks(vec![]);
        let mut controller = CaptureController::new(source);

        controller.start_capture().unwrap();
        let err = controller.start_capture().unwrap_err();
        assert!(matches!(err, SanaError::Device(_)));
        assert!(controller.is_capturing(), "first session must survive");
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let source = FakeSource::with_chunks(vec![]);
        let mut controller = CaptureController::new(source);
        assert!(controller.stop_capture().unwrap().is_none());
        assert_eq!(controller.source.stopped, 0);
    }

    #[test]
    fn test_device_failure_stays_idle() {
        let mut controller = CaptureController::new(FakeSource::failing());
        let err = controller.start_capture().unwrap_err();
        assert!(matches!(err, SanaError::Device(_)));
        assert!(!controller.is_capturing());
    }

    #[test]
    fn test_empty_capture_yields_no_clip() {
        let source = FakeSource::with_chunks(vec![]);
        let mut controller = CaptureController::new(source);
        controller.start_capture().unwrap();
        assert!(controller.stop_capture().unwrap().is_none());
        assert_eq!(controller.source.stopped, 1);
    }

    #[test]
    fn test_cancel_discards_session() {
        let source = FakeSource::with_chunks(vec![vec![0.5; 16]]);
        let mut controller = CaptureController::new(source);
        controller.start_capture().unwrap();
        controller.cancel_capture();
        assert!(!controller.is_capturing());
        assert_eq!(controller.source.stopped, 1);
    }
}
