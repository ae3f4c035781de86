//! CPU-side input preparation: image bytes to a CLIP tensor, WAV files to
//! mono 48 kHz samples. Both are blocking and are run through
//! `spawn_blocking` by the generator.

use std::path::Path;

use image::imageops::FilterType;

use crate::error::EmbedError;
use crate::extractor::ExtractorInput;

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

pub const CLIP_IMAGE_SIZE: u32 = 224;
pub const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
pub const CLIP_STD: [f32; 3] = [0.26862954, 0.261_302_6, 0.275_777_1];

/// Decode an encoded image and lay it out as a normalized `[3, 224, 224]`
/// CHW tensor.
pub fn image_tensor(bytes: &[u8]) -> Result<ExtractorInput, EmbedError> {
    let img = image::load_from_memory(bytes).map_err(|e| EmbedError::Decode(e.to_string()))?;
    let rgb = img
        .resize_exact(CLIP_IMAGE_SIZE, CLIP_IMAGE_SIZE, FilterType::Triangle)
        .to_rgb8();

    let side = CLIP_IMAGE_SIZE as usize;
    let plane = side * side;
    let mut pixels = vec![0f32; 3 * plane];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * side + x as usize;
        for c in 0..3 {
            pixels[c * plane + offset] = (pixel[c] as f32 / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }

    Ok(ExtractorInput::Image {
        pixels,
        shape: [3, side, side],
    })
}

/// Read a keyframe from disk and build its tensor.
pub fn image_file_tensor(path: &Path) -> Result<ExtractorInput, EmbedError> {
    let bytes = std::fs::read(path)
        .map_err(|e| EmbedError::Decode(format!("{}: {e}", path.display())))?;
    image_tensor(&bytes)
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

/// Sample rate the audio encoder expects.
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Decode a WAV file to mono `f32` samples at [`AUDIO_SAMPLE_RATE`].
pub fn audio_samples(path: &Path) -> Result<ExtractorInput, EmbedError> {
    let decode = |e: hound::Error| EmbedError::Decode(format!("{}: {e}", path.display()));

    let mut reader = hound::WavReader::open(path).map_err(decode)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .map_err(decode)?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(decode)?,
    };

    let mono = downmix(&interleaved, spec.channels.max(1) as usize);
    if mono.is_empty() {
        return Err(EmbedError::Decode(format!("{}: no samples", path.display())));
    }

    Ok(ExtractorInput::Audio {
        samples: resample_linear(&mono, spec.sample_rate, AUDIO_SAMPLE_RATE),
        sample_rate: AUDIO_SAMPLE_RATE,
    })
}

/// Average interleaved channels into one.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler.
pub fn resample_linear(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || samples.len() < 2 || from == 0 {
        return samples.to_vec();
    }
    let ratio = from as f64 / to as f64;
    let out_len = ((samples.len() as f64) / ratio).round().max(1.0) as usize;
    let last = samples.len() - 1;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let lo = (pos.floor() as usize).min(last);
            let hi = (lo + 1).min(last);
            let frac = (pos - lo as f64) as f32;
            samples[lo] + (samples[hi] - samples[lo]) * frac
        })
        .collect()
}
