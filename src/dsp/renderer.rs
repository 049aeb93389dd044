//! WAV renderer: renders a mix offline to a WAV byte buffer.

use crate::catalog::Catalog;
use crate::config::MixerConfig;
use crate::error::MixerError;

use super::engine::MixerState;

const BLOCK_FRAMES: usize = 512;
const CHANNELS: u16 = 2;
/// 16-bit stereo.
const BYTES_PER_FRAME: u32 = 4;
/// The RIFF chunk size field holds `36 + data size`.
const MAX_DATA_BYTES: u32 = u32::MAX - 36;

/// Render `mix` (sound id → volume) for `seconds` as 16-bit stereo PCM WAV.
/// Silent entries are skipped. The same seed always yields the same bytes.
///
/// Durations that are not finite, or whose PCM data would not fit the 32-bit
/// RIFF size fields, fail with [`MixerError::RenderTooLong`].
pub fn render_mix_wav(
    catalog: &Catalog,
    mix: &[(String, f64)],
    seconds: f64,
    sample_rate: u32,
    seed: u64,
) -> Result<Vec<u8>, MixerError> {
    let too_long = || MixerError::RenderTooLong { seconds };
    if !seconds.is_finite() {
        return Err(too_long());
    }
    let frames = (seconds.max(0.0) * f64::from(sample_rate)).round();
    if frames > f64::from(MAX_DATA_BYTES / BYTES_PER_FRAME) {
        return Err(too_long());
    }
    let data_size = (frames as u32)
        .checked_mul(BYTES_PER_FRAME)
        .ok_or_else(too_long)?;
    let frames = frames as usize;

    let config = MixerConfig {
        sample_rate: f64::from(sample_rate),
        ..Default::default()
    };
    let mut state = MixerState::with_seed(catalog.clone(), config, seed);
    state.ensure_context()?;
    for (id, volume) in mix.iter().filter(|(_, v)| *v > 0.0) {
        state.start(id, *volume)?;
    }

    let mut pcm = Vec::with_capacity(frames * usize::from(CHANNELS));
    let mut left = [0.0_f32; BLOCK_FRAMES];
    let mut right = [0.0_f32; BLOCK_FRAMES];
    let mut done = 0;
    while done < frames {
        let n = (frames - done).min(BLOCK_FRAMES);
        state.process(&mut left[..n], &mut right[..n]);
        for (l, r) in left[..n].iter().zip(&right[..n]) {
            pcm.push(to_i16(*l));
            pcm.push(to_i16(*r));
        }
        done += n;
    }
    state.close();
    log::debug!("Rendered {frames} frames of {} sounds", mix.len());

    Ok(encode_wav(&pcm, data_size, sample_rate, CHANNELS))
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer. `data_size` is
/// the byte length of `samples`, already checked against the RIFF limit.
fn encode_wav(samples: &[i16], data_size: u32, sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate
        .saturating_mul(u32::from(channels))
        .saturating_mul(u32::from(bits_per_sample / 8));
    let block_align = channels * (bits_per_sample / 8);

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
