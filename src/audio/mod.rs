//! Audio subsystem: press-and-hold capture and text-to-speech playback

pub mod capture;
pub mod playback;

pub use capture::{AudioSource, CaptureController, RecordingSession};
pub use playback::{AudioOutput, AudioSink, PlaybackController, PlaybackState, SpeechProvider};

#[cfg(feature = "audio-io")]
pub use capture::CpalSource;
#[cfg(feature = "audio-io")]
pub use playback::RodioOutput;

use crate::{Result, SanaError};
use std::io::Cursor;

/// Encode mono f32 samples as a 16-bit PCM WAV clip
pub fn encode_wav_clip(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| SanaError::Device(format!("Failed to create WAV writer: {e}")))?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| SanaError::Device(format!("Failed to write WAV sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| SanaError::Device(format!("Failed to finalize WAV clip: {e}")))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wav_clip_header() {
        let samples: Vec<f32> = (0..160)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 16000.0).sin() * 0.5)
            .collect();

        let clip = encode_wav_clip(&samples, 16000).unwrap();
        assert_eq!(&clip[0..4], b"RIFF");
        assert_eq!(&clip[8..12], b"WAVE");
        // 44-byte header plus two bytes per sample
        assert_eq!(clip.len(), 44 + samples.len() * 2);
    }

    #[test]
    fn test_encode_wav_clip_clamps_out_of_range_samples() {
        let clip = encode_wav_clip(&[2.0, -2.0], 16000).unwrap();
        let reader = hound::WavReader::new(Cursor::new(clip)).unwrap();
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded[0], i16::MAX);
        assert_eq!(decoded[1], -i16::MAX);
    }
}
