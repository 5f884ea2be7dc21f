use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use rayon::prelude::*;

use crate::audio::instruction::{AudioInstruction, AudioInstructions};
use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate of mixdown output.
pub const MIX_SAMPLE_RATE: u32 = 48_000;
/// Channel count of mixdown output (interleaved stereo).
pub const MIX_CHANNELS: u16 = 2;

/// Decoded source audio.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// 1 (mono) or 2 (interleaved stereo).
    pub channels: u16,
    /// Interleaved `f32` samples.
    pub interleaved: Arc<Vec<f32>>,
}

impl AudioPcm {
    /// Number of sample frames.
    pub fn frames(&self) -> usize {
        self.interleaved.len() / usize::from(self.channels.max(1))
    }
}

/// Audio decode collaborator used by mixdown.
pub trait AudioDecoder: Sync {
    /// Decode the whole of `source`.
    fn decode(&self, source: &str) -> ReelResult<AudioPcm>;
}

/// Result of mixing an audio timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedAudio {
    /// Output sample rate.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Interleaved samples clamped to `[-1, 1]`.
    pub interleaved: Vec<f32>,
}

impl MixedAudio {
    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        let frames = self.interleaved.len() / usize::from(self.channels.max(1));
        frames as f64 / f64::from(self.sample_rate)
    }

    /// Stream the samples to `out` as raw little-endian `f32`, the layout ffmpeg reads as `f32le`.
    pub fn write_f32le(&self, out: &mut impl Write) -> std::io::Result<()> {
        let mut chunk = Vec::<u8>::with_capacity(4096 * 4);
        for block in self.interleaved.chunks(4096) {
            chunk.clear();
            for &sample in block {
                chunk.extend_from_slice(&sample.to_le_bytes());
            }
            out.write_all(&chunk)?;
        }
        out.flush()
    }
}

/// Mix `instructions` into `total_secs` of 48 kHz stereo.
///
/// Every referenced source is decoded up front, in parallel; any decode failure fails the whole
/// mixdown.
#[tracing::instrument(skip(instructions, decoder), fields(sources = instructions.len()))]
pub fn mix_instructions(
    instructions: &AudioInstructions,
    decoder: &dyn AudioDecoder,
    total_secs: f64,
) -> ReelResult<MixedAudio> {
    mix_at(instructions, decoder, total_secs, MIX_SAMPLE_RATE)
}

pub(crate) fn mix_at(
    instructions: &AudioInstructions,
    decoder: &dyn AudioDecoder,
    total_secs: f64,
    sample_rate: u32,
) -> ReelResult<MixedAudio> {
    let sources: Vec<&String> = instructions.keys().collect();
    let decoded = sources
        .par_iter()
        .map(|&source| {
            let pcm = decoder.decode(source)?;
            if pcm.channels == 0 || pcm.channels > 2 || pcm.sample_rate == 0 {
                return Err(ReelError::resource(format!(
                    "audio source '{source}' has unsupported layout ({} ch @ {} Hz)",
                    pcm.channels, pcm.sample_rate
                )));
            }
            Ok((source.as_str(), pcm))
        })
        .collect::<ReelResult<Vec<_>>>()?;
    let decoded: HashMap<&str, AudioPcm> = decoded.into_iter().collect();

    let frames = (total_secs.max(0.0) * f64::from(sample_rate)).round() as usize;
    let channels = MIX_CHANNELS;
    let mut out = vec![0.0f32; frames * usize::from(channels)];

    for (source, list) in instructions {
        let Some(pcm) = decoded.get(source.as_str()) else {
            continue;
        };
        for ins in list {
            mix_instruction(&mut out, sample_rate, pcm, ins);
        }
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    Ok(MixedAudio {
        sample_rate,
        channels,
        interleaved: out,
    })
}

fn mix_instruction(out: &mut [f32], sample_rate: u32, pcm: &AudioPcm, ins: &AudioInstruction) {
    let sr = f64::from(sample_rate);
    let out_frames = out.len() / usize::from(MIX_CHANNELS);
    let src = pcm.interleaved.as_ref();
    let src_frames = pcm.frames();
    if src_frames == 0 {
        return;
    }
    let src_sr = f64::from(pcm.sample_rate);
    let track_len = src_frames as f64 / src_sr;
    let (loop_start, loop_end) = ins.loop_region(track_len);

    let start = (ins.start_time * sr).round().max(0.0) as usize;
    let stop = ins
        .stop_time
        .map(|t| (t * sr).round().max(0.0) as usize)
        .unwrap_or(out_frames)
        .min(out_frames);

    let mut src_sec = ins.offset.max(0.0);
    let mut played = 0.0f64;
    for dst in start..stop {
        if let Some(limit) = ins.duration
            && played >= limit
        {
            break;
        }
        if ins.looping && loop_end > loop_start && src_sec >= loop_end {
            src_sec = loop_start + (src_sec - loop_start) % (loop_end - loop_start);
        }

        let src_pos = src_sec * src_sr;
        if !src_pos.is_finite() {
            break;
        }
        let src_frame0 = src_pos.floor() as usize;
        if src_frame0 >= src_frames {
            break;
        }
        let src_frame1 = (src_frame0 + 1).min(src_frames - 1);
        let frac = (src_pos - src_frame0 as f64) as f32;

        let (l, r) = if pcm.channels == 1 {
            let v0 = src[src_frame0];
            let v1 = src[src_frame1];
            let v = v0 + ((v1 - v0) * frac);
            (v, v)
        } else {
            let i0 = src_frame0 * 2;
            let i1 = src_frame1 * 2;
            (
                src[i0] + ((src[i1] - src[i0]) * frac),
                src[i0 + 1] + ((src[i1 + 1] - src[i0 + 1]) * frac),
            )
        };

        let t = dst as f64 / sr;
        let gain = ins.volume_at(t) as f32;
        let dst_idx = dst * usize::from(MIX_CHANNELS);
        out[dst_idx] += l * gain;
        out[dst_idx + 1] += r * gain;

        let step = ins.speed_at(t) / sr;
        src_sec += step;
        played += step;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
