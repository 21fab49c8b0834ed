use crate::config::Config;
use crate::models::QualityReport;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::warn;

/// Inspects a downloaded audio file and reports whether it is usable as a
/// meditation. A bad file is a normal, reportable outcome - `check` never
/// errors, it returns a failing report with reasons.
pub struct QualityChecker {
    min_duration_secs: f64,
    max_duration_secs: f64,
    min_bitrate_kbps: u32,
    min_sample_rate_hz: u32,
    silence_floor_dbfs: f64,
}

struct AudioStats {
    duration_secs: f64,
    sample_rate_hz: u32,
    volume_dbfs: f64,
}

impl QualityChecker {
    pub fn new(config: &Config) -> Self {
        Self {
            min_duration_secs: config.min_duration_secs,
            max_duration_secs: config.max_duration_secs,
            min_bitrate_kbps: config.min_bitrate_kbps,
            min_sample_rate_hz: config.min_sample_rate_hz,
            silence_floor_dbfs: config.silence_floor_dbfs,
        }
    }

    pub async fn check(&self, path: &Path) -> QualityReport {
        let file_size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(_) => return QualityReport::failed("File does not exist"),
        };

        if file_size < 1024 {
            return QualityReport::failed(format!("File too small: {} bytes", file_size));
        }

        let owned = path.to_path_buf();
        let stats = match tokio::task::spawn_blocking(move || decode_stats(&owned)).await {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => return QualityReport::failed(format!("Failed to analyze audio: {}", e)),
            Err(e) => return QualityReport::failed(format!("Audio analysis panicked: {}", e)),
        };

        let bitrate_kbps = if stats.duration_secs > 0.0 {
            ((file_size as f64 * 8.0) / (stats.duration_secs * 1000.0)) as u32
        } else {
            0
        };

        let mut reasons = Vec::new();

        let duration_minutes = stats.duration_secs / 60.0;
        if stats.duration_secs < self.min_duration_secs
            || stats.duration_secs > self.max_duration_secs
        {
            reasons.push(format!(
                "Duration ({:.2} min) outside acceptable range ({:.0}-{:.0} min)",
                duration_minutes,
                self.min_duration_secs / 60.0,
                self.max_duration_secs / 60.0
            ));
        }

        if bitrate_kbps < self.min_bitrate_kbps {
            reasons.push(format!(
                "Bitrate too low: {} kbps (min: {} kbps)",
                bitrate_kbps, self.min_bitrate_kbps
            ));
        }

        if stats.sample_rate_hz < self.min_sample_rate_hz {
            reasons.push(format!(
                "Sample rate too low: {} Hz (min: {} Hz)",
                stats.sample_rate_hz, self.min_sample_rate_hz
            ));
        }

        if stats.volume_dbfs < self.silence_floor_dbfs {
            reasons.push(format!(
                "Audio is silent or too quiet: {:.2} dBFS",
                stats.volume_dbfs
            ));
        }

        let passed = reasons.is_empty();
        tracing::info!(
            passed,
            duration_secs = stats.duration_secs,
            bitrate_kbps,
            sample_rate_hz = stats.sample_rate_hz,
            "Audio quality check finished"
        );

        QualityReport {
            passed,
            duration_secs: stats.duration_secs,
            bitrate_kbps,
            sample_rate_hz: stats.sample_rate_hz,
            volume_dbfs: stats.volume_dbfs,
            reasons,
        }
    }
}

/// Decode the full stream, accumulating duration and signal level.
fn decode_stats(path: &Path) -> Result<AudioStats, String> {
    let file = std::fs::File::open(path).map_err(|e| format!("failed to open file: {}", e))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| format!("failed to probe audio format: {}", e))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| "no audio track found".to_string())?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| format!("failed to create decoder: {}", e))?;

    let track_id = track.id;
    let mut sample_rate: u32 = track.codec_params.sample_rate.unwrap_or(0);
    let mut frames: u64 = 0;
    let mut sample_count: u64 = 0;
    let mut sum_squares: f64 = 0.0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Error decoding packet: {}", e);
                continue;
            }
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        let channel_samples = sample_buf.samples();
        let n_channels = spec.channels.count().max(1);

        frames += (channel_samples.len() / n_channels) as u64;
        sample_count += channel_samples.len() as u64;
        for sample in channel_samples {
            sum_squares += (*sample as f64) * (*sample as f64);
        }
    }

    if sample_count == 0 || sample_rate == 0 {
        return Err("no decodable audio content".to_string());
    }

    // RMS level relative to full scale.
    let rms = (sum_squares / sample_count as f64).sqrt();
    let volume_dbfs = if rms > 0.0 {
        20.0 * rms.log10()
    } else {
        f64::NEG_INFINITY
    };

    Ok(AudioStats {
        duration_secs: frames as f64 / sample_rate as f64,
        sample_rate_hz: sample_rate,
        volume_dbfs,
    })
}
