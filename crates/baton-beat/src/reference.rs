//! Reference tempo of the accompaniment track.
//!
//! Live playback rate is the ratio of the performer's beat tempo to the
//! track's own BPM, estimated once per track with stratum-dsp.

use std::path::{Path, PathBuf};

use baton_core::{Error, Result};
use serde::{Deserialize, Serialize};
use stratum_dsp::analyze_audio;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// BPM analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Lower bound of the folding range
    pub min_bpm: f64,
    /// Upper bound of the folding range
    pub max_bpm: f64,
    /// Shortest audio accepted for analysis, in seconds
    pub min_duration_secs: f64,
    /// Decoding stops after this many seconds
    pub max_duration_secs: f64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            min_bpm: 60.0,
            max_bpm: 180.0,
            min_duration_secs: 1.0,
            max_duration_secs: 120.0,
        }
    }
}

/// Validated reference BPM (finite and strictly positive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ReferenceTempo {
    bpm: f64,
}

impl ReferenceTempo {
    pub fn new(bpm: f64) -> Result<Self> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(Error::ReferenceTempo(format!(
                "reference BPM must be finite and positive, got {}",
                bpm
            )));
        }
        Ok(Self { bpm })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Decode the track and estimate its BPM
    pub fn from_audio_file<P: AsRef<Path>>(path: P, config: &ReferenceConfig) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Analyzing reference track");

        let (samples, sample_rate) = decode_to_mono(path, config.max_duration_secs)?;
        let duration = samples.len() as f64 / sample_rate as f64;
        if duration < config.min_duration_secs {
            return Err(Error::ReferenceTempo(format!(
                "{} is too short for analysis ({:.2}s)",
                path.display(),
                duration
            )));
        }

        let result = analyze_audio(&samples, sample_rate, stratum_dsp::AnalysisConfig::default())
            .map_err(|e| Error::ReferenceTempo(format!("BPM analysis failed: {:?}", e)))?;
        drop(samples);

        let bpm = fold_bpm(result.bpm as f64, config.min_bpm, config.max_bpm);
        let tempo = Self::new(bpm)?;

        tracing::info!(
            path = %path.display(),
            detected = result.bpm,
            bpm = tempo.bpm,
            "Reference tempo ready"
        );
        Ok(tempo)
    }

    /// Same as [`ReferenceTempo::from_audio_file`], on the blocking pool
    pub async fn from_audio_file_async(path: PathBuf, config: ReferenceConfig) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::from_audio_file(&path, &config))
            .await
            .map_err(|e| Error::ReferenceTempo(format!("analysis task failed: {}", e)))?
    }
}

impl TryFrom<f64> for ReferenceTempo {
    type Error = Error;

    fn try_from(bpm: f64) -> Result<Self> {
        Self::new(bpm)
    }
}

impl From<ReferenceTempo> for f64 {
    fn from(tempo: ReferenceTempo) -> f64 {
        tempo.bpm
    }
}

/// Double or halve into `[min_bpm, max_bpm]` where that is possible
pub fn fold_bpm(mut bpm: f64, min_bpm: f64, max_bpm: f64) -> f64 {
    if min_bpm > 0.0 && max_bpm > 0.0 && bpm > 0.0 && bpm.is_finite() {
        while bpm < min_bpm && bpm * 2.0 <= max_bpm {
            bpm *= 2.0;
        }
        while bpm > max_bpm && bpm / 2.0 >= min_bpm {
            bpm /= 2.0;
        }
    }
    bpm
}

fn decode_to_mono(path: &Path, max_duration_secs: f64) -> Result<(Vec<f32>, u32)> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::AudioDecode(format!("cannot open {}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::AudioDecode(format!("unsupported format {}: {}", path.display(), e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::AudioDecode("no audio track found".into()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::AudioDecode("no sample rate in audio track".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::AudioDecode(format!("cannot create decoder: {}", e)))?;

    let max_samples = (sample_rate as f64 * max_duration_secs.max(0.0)) as usize;
    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stopped reading packets");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping undecodable packet");
                continue;
            }
        };

        let signal_spec = *decoded.spec();
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, signal_spec);
        buf.copy_interleaved_ref(decoded);

        let channels = signal_spec.channels.count().max(1);
        for frame in buf.samples().chunks(channels) {
            mono.push(frame.iter().sum::<f32>() / channels as f32);
        }

        if mono.len() >= max_samples {
            break;
        }
    }

    Ok((mono, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation() {
        assert!(ReferenceTempo::new(120.0).is_ok());
        assert!(ReferenceTempo::new(0.0).is_err());
        assert!(ReferenceTempo::new(-90.0).is_err());
        assert!(ReferenceTempo::new(f64::NAN).is_err());
        assert!(serde_json::from_str::<ReferenceTempo>("0.0").is_err());
        assert_eq!(serde_json::from_str::<ReferenceTempo>("96.5").unwrap().bpm(), 96.5);
    }

    #[test]
    fn test_fold_bpm() {
        assert_eq!(fold_bpm(45.0, 60.0, 180.0), 90.0);
        assert_eq!(fold_bpm(400.0, 60.0, 180.0), 100.0);
        assert_eq!(fold_bpm(120.0, 60.0, 180.0), 120.0);
        // No power of two fits: left alone
        assert_eq!(fold_bpm(50.0, 110.0, 120.0), 50.0);
    }

    #[test]
    fn test_missing_file_errors() {
        let result = ReferenceTempo::from_audio_file(
            "/nonexistent/track.mp3",
            &ReferenceConfig::default(),
        );
        assert!(matches!(result, Err(Error::AudioDecode(_))));
    }

    #[test]
    fn test_garbage_file_errors() {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(b"definitely not audio").unwrap();
        file.flush().unwrap();

        let result = ReferenceTempo::from_audio_file(file.path(), &ReferenceConfig::default());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_async_missing_file() {
        let result = ReferenceTempo::from_audio_file_async(
            PathBuf::from("/nonexistent/track.wav"),
            ReferenceConfig::default(),
        )
        .await;
        assert!(result.is_err());
    }
}
