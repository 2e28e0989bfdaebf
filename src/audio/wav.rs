use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::audio::pcm;
#[cfg(test)]
use crate::constants::SAMPLE_RATE;
use crate::error::EarprintError;

/// Read a WAV file and deliver mono f32 PCM at `SAMPLE_RATE`.
///
/// Accepts mono or stereo, 16-bit integer or 32-bit float samples, at any
/// rate that is an integer multiple of 11025 Hz. Stereo is averaged to
/// mono (with the cancellation fallback), then block-decimated down to the
/// target rate.
pub fn read_wav_mono<P: AsRef<Path>>(path: P) -> Result<Vec<f32>, EarprintError> {
    let reader = WavReader::open(path)
        .map_err(|e| EarprintError::Decode(format!("WAV open error: {}", e)))?;

    let spec = reader.spec();
    let factor = pcm::decimation_factor(spec.sample_rate)?;

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|s| s.map_err(|e| EarprintError::Decode(format!("WAV sample error: {}", e))))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| {
                s.map(|v| v as f32 / 32768.0)
                    .map_err(|e| EarprintError::Decode(format!("WAV sample error: {}", e)))
            })
            .collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(EarprintError::InvalidParams(format!(
                "unsupported sample format {:?} at {} bits",
                format, bits
            )))
        }
    };

    let mono = match spec.channels {
        1 => interleaved,
        2 => {
            let left: Vec<f32> = interleaved.iter().step_by(2).copied().collect();
            let right: Vec<f32> = interleaved.iter().skip(1).step_by(2).copied().collect();
            pcm::mix_to_mono(&left, &right)
        }
        n => {
            return Err(EarprintError::InvalidParams(format!(
                "unsupported channel count {}",
                n
            )))
        }
    };

    Ok(pcm::decimate(&mono, factor))
}

/// Write mono f32 PCM to a WAV file (32-bit float samples).
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), EarprintError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)
        .map_err(|e| EarprintError::Decode(format!("WAV write error: {}", e)))?;

    for &s in samples {
        writer
            .write_sample(s)
            .map_err(|e| EarprintError::Decode(format!("WAV sample write error: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| EarprintError::Decode(format!("WAV finalize error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn roundtrip_at_target_rate() {
        let path = "/tmp/earprint_wav_roundtrip.wav";
        let samples: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.01).sin()).collect();

        write_wav(path, &samples, SAMPLE_RATE).unwrap();
        let read = read_wav_mono(path).unwrap();

        assert_eq!(read.len(), samples.len());
        for (a, b) in samples.iter().zip(read.iter()) {
            assert!((a - b).abs() < 1e-6);
        }

        fs::remove_file(path).ok();
    }

    #[test]
    fn unsupported_rate_is_rejected() {
        let path = "/tmp/earprint_wav_bad_rate.wav";
        let samples = vec![0.1f32; 1000];
        write_wav(path, &samples, 48000).unwrap();

        assert!(matches!(
            read_wav_mono(path),
            Err(EarprintError::InvalidParams(_))
        ));

        fs::remove_file(path).ok();
    }

    #[test]
    fn higher_rate_is_decimated() {
        let path = "/tmp/earprint_wav_decimate.wav";
        let samples = vec![0.5f32; 44100];
        write_wav(path, &samples, 4 * SAMPLE_RATE).unwrap();

        let read = read_wav_mono(path).unwrap();
        assert_eq!(read.len(), samples.len() / 4);
        assert!((read[0] - 0.5).abs() < 1e-6);

        fs::remove_file(path).ok();
    }

    #[test]
    fn stereo_int16_is_mixed_down() {
        let path = "/tmp/earprint_wav_stereo.wav";
        let spec = WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..500 {
            writer.write_sample(8192i16).unwrap(); // left: 0.25
            writer.write_sample(-4096i16).unwrap(); // right: -0.125
        }
        writer.finalize().unwrap();

        let read = read_wav_mono(path).unwrap();
        assert_eq!(read.len(), 500);
        assert!((read[0] - 0.0625).abs() < 1e-4);

        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        assert!(matches!(
            read_wav_mono("/tmp/earprint_definitely_absent.wav"),
            Err(EarprintError::Decode(_))
        ));
    }
}
