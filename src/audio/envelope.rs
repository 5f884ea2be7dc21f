use tracing::warn;

/// Piecewise-constant envelope: timestamped values layered over a starting value.
///
/// Keys keep the order they were first written in. Writing an existing key replaces its value in
/// place. Lookups scan in that order and stop at the first key later than the queried time, so an
/// envelope written out of chronological order hides the keys after the first later one.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ChangeMap(Vec<(f64, f64)>);

impl ChangeMap {
    /// Empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` at `time`.
    pub fn set(&mut self, time: f64, value: f64) {
        if let Some(slot) = self.0.iter_mut().find(|(t, _)| *t == time) {
            slot.1 = value;
            return;
        }
        if let Some(&(last, _)) = self.0.last()
            && time < last
        {
            warn!(time, last, "envelope change written before an existing later key");
        }
        self.0.push((time, value));
    }

    /// Value in effect at `time` given the envelope's `starting` value.
    pub fn value_at(&self, starting: f64, time: f64) -> f64 {
        let mut value = starting;
        for &(t, v) in &self.0 {
            if time < t {
                break;
            }
            value = v;
        }
        value
    }

    /// `(time, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.0.iter().copied()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when no change was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/envelope.rs"]
mod tests;
