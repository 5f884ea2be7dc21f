use std::ops::Deref;

use crate::audio::envelope::ChangeMap;
use crate::audio::instruction::{AudioInstruction, AudioInstructions, compile};

/// Handle to a sound recorded in the current session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SoundId(pub(crate) usize);

/// Options accepted by `SessionCtx::play_sound`.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundOptions {
    /// Seconds after the current clock to start; the start is clamped to `>= 0`.
    pub delay: f64,
    /// Source position to start from, in seconds.
    pub offset: f64,
    /// Source time to play for; `None` plays to the end.
    pub duration: Option<f64>,
    /// Starting volume, clamped to `>= 0`.
    pub volume: f64,
    /// Loop the source.
    pub looping: bool,
    /// Loop region start.
    pub loop_start: f64,
    /// Loop region end; `<= loop_start` loops the whole source.
    pub loop_end: f64,
    /// Starting playback rate, clamped to `>= 0`.
    pub speed: f64,
}

impl Default for SoundOptions {
    fn default() -> Self {
        Self {
            delay: 0.0,
            offset: 0.0,
            duration: None,
            volume: 1.0,
            looping: false,
            loop_start: 0.0,
            loop_end: 0.0,
            speed: 1.0,
        }
    }
}

/// One recorded `play_sound` call.
#[derive(Clone, Debug, PartialEq)]
pub struct Sound {
    source: String,
    start_time: f64,
    stop_time: Option<f64>,
    offset: f64,
    duration: Option<f64>,
    starting_volume: f64,
    volume_changes: ChangeMap,
    looping: bool,
    loop_start: f64,
    loop_end: f64,
    starting_speed: f64,
    speed_changes: ChangeMap,
}

impl Sound {
    fn new(clock: f64, source: String, opts: SoundOptions) -> Self {
        Self {
            source,
            start_time: (clock + opts.delay).max(0.0),
            stop_time: None,
            offset: opts.offset,
            duration: opts.duration,
            starting_volume: opts.volume.max(0.0),
            volume_changes: ChangeMap::new(),
            looping: opts.looping,
            loop_start: opts.loop_start,
            loop_end: opts.loop_end,
            starting_speed: opts.speed.max(0.0),
            speed_changes: ChangeMap::new(),
        }
    }

    /// Source identifier the sound plays.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Video time playback starts at.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Video time playback stops at, if stopped.
    pub fn stop_time(&self) -> Option<f64> {
        self.stop_time
    }

    /// Source start position.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Source time limit.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Whether the sound loops.
    pub fn looping(&self) -> bool {
        self.looping
    }

    /// Loop region start.
    pub fn loop_start(&self) -> f64 {
        self.loop_start
    }

    /// Loop region end.
    pub fn loop_end(&self) -> f64 {
        self.loop_end
    }

    /// Volume at video time `t`.
    pub fn volume_at(&self, t: f64) -> f64 {
        self.volume_changes.value_at(self.starting_volume, t)
    }

    /// Playback rate at video time `t`.
    pub fn speed_at(&self, t: f64) -> f64 {
        self.speed_changes.value_at(self.starting_speed, t)
    }

    pub(crate) fn to_instruction(&self) -> AudioInstruction {
        AudioInstruction {
            start_time: self.start_time,
            stop_time: self.stop_time,
            offset: self.offset,
            duration: self.duration,
            starting_volume: self.starting_volume,
            volume_changes: self.volume_changes.clone(),
            looping: self.looping,
            loop_start: self.loop_start,
            loop_end: self.loop_end,
            starting_speed: self.starting_speed,
            speed_changes: self.speed_changes.clone(),
        }
    }
}

/// Sounds emitted during one chunk, in emission order.
#[derive(Clone, Debug, Default)]
pub struct SoundLedger {
    sounds: Vec<Sound>,
}

impl SoundLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn play(&mut self, clock: f64, source: impl Into<String>, opts: SoundOptions) -> SoundId {
        self.sounds.push(Sound::new(clock, source.into(), opts));
        SoundId(self.sounds.len() - 1)
    }

    /// Look up a recorded sound.
    pub fn get(&self, id: SoundId) -> Option<&Sound> {
        self.sounds.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: SoundId, clock: f64) -> Option<SoundMut<'_>> {
        self.sounds
            .get_mut(id.0)
            .map(|sound| SoundMut { sound, clock })
    }

    /// Recorded sounds in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &Sound> {
        self.sounds.iter()
    }

    /// Number of recorded sounds.
    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    /// `true` when nothing was played.
    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// Group every recorded sound into instructions by source.
    pub fn compile(&self) -> AudioInstructions {
        compile(&self.sounds)
    }
}

/// Mutable view of a sound at the current session clock.
pub struct SoundMut<'a> {
    sound: &'a mut Sound,
    clock: f64,
}

impl SoundMut<'_> {
    /// Stop at the current clock. Later calls keep the first stop time.
    pub fn stop(&mut self) {
        self.sound.stop_time.get_or_insert(self.clock);
    }

    /// Change the volume from the current clock on. Negative values clamp to 0.
    pub fn set_volume(&mut self, volume: f64) {
        self.sound.volume_changes.set(self.clock, volume.max(0.0));
    }

    /// Change the playback rate from the current clock on. Negative values clamp to 0.
    pub fn set_speed(&mut self, speed: f64) {
        self.sound.speed_changes.set(self.clock, speed.max(0.0));
    }

    /// Volume at the current clock.
    pub fn volume(&self) -> f64 {
        self.sound.volume_at(self.clock)
    }

    /// Playback rate at the current clock.
    pub fn speed(&self) -> f64 {
        self.sound.speed_at(self.clock)
    }
}

impl Deref for SoundMut<'_> {
    type Target = Sound;

    fn deref(&self) -> &Sound {
        self.sound
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/ledger.rs"]
mod tests;
