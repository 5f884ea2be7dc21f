use std::collections::BTreeMap;

use crate::audio::envelope::ChangeMap;
use crate::audio::ledger::Sound;

/// Declarative playback instruction for one sound, replayable at mixdown time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioInstruction {
    /// Video time (seconds) at which playback starts.
    pub start_time: f64,
    /// Video time at which playback stops, `None` to play out.
    pub stop_time: Option<f64>,
    /// Position in the source (seconds) playback starts from.
    pub offset: f64,
    /// Source time to play for, `None` for the whole source.
    pub duration: Option<f64>,
    /// Volume before the first volume change.
    pub starting_volume: f64,
    /// Volume changes keyed by video time.
    pub volume_changes: ChangeMap,
    /// Whether playback loops.
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Loop region start in source seconds.
    pub loop_start: f64,
    /// Loop region end in source seconds; `<= loop_start` loops the whole source.
    pub loop_end: f64,
    /// Playback rate before the first speed change.
    pub starting_speed: f64,
    /// Playback-rate changes keyed by video time.
    pub speed_changes: ChangeMap,
}

impl AudioInstruction {
    /// Volume in effect at video time `t`.
    pub fn volume_at(&self, t: f64) -> f64 {
        self.volume_changes.value_at(self.starting_volume, t)
    }

    /// Playback rate in effect at video time `t`.
    pub fn speed_at(&self, t: f64) -> f64 {
        self.speed_changes.value_at(self.starting_speed, t)
    }

    /// Loop region `[start, end)` within a source of `track_len` seconds.
    pub fn loop_region(&self, track_len: f64) -> (f64, f64) {
        if self.loop_end > self.loop_start {
            (self.loop_start, self.loop_end.min(track_len))
        } else {
            (0.0, track_len)
        }
    }
}

/// Compiled audio timeline: instructions grouped by source, in play order per source.
pub type AudioInstructions = BTreeMap<String, Vec<AudioInstruction>>;

pub(crate) fn compile<'a>(sounds: impl IntoIterator<Item = &'a Sound>) -> AudioInstructions {
    let mut out = AudioInstructions::new();
    for sound in sounds {
        out.entry(sound.source().to_owned())
            .or_default()
            .push(sound.to_instruction());
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/audio/instruction.rs"]
mod tests;
