use std::collections::HashMap;

use crate::foundation::core::Fps;
use crate::protocol::message::{ClipRequest, ClipResponse};
use crate::render::frame::FrameRGBA;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ClipKey {
    source: String,
    fps: Fps,
    start: Option<u64>,
    end: Option<u64>,
}

impl From<&ClipRequest> for ClipKey {
    fn from(r: &ClipRequest) -> Self {
        Self {
            source: r.source.clone(),
            fps: r.fps,
            start: r.start.map(f64::to_bits),
            end: r.end.map(f64::to_bits),
        }
    }
}

/// Outstanding clip requests of a render unit, keyed by the full request signature.
#[derive(Debug, Default)]
pub(crate) struct ClipTable {
    pending: HashMap<ClipKey, usize>,
}

impl ClipTable {
    pub(crate) fn insert(&mut self, request: &ClipRequest) {
        *self.pending.entry(ClipKey::from(request)).or_default() += 1;
    }

    /// Resolve one pending request matching `response`; `None` when nothing matches.
    pub(crate) fn resolve(&mut self, response: ClipResponse) -> Option<Vec<FrameRGBA>> {
        self.take(&response.request).then_some(response.frames)
    }

    /// Drop one pending request equal to `request`, returning whether one existed.
    pub(crate) fn take(&mut self, request: &ClipRequest) -> bool {
        let key = ClipKey::from(request);
        let Some(count) = self.pending.get_mut(&key) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.pending.remove(&key);
        }
        true
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.values().sum()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/clip_table.rs"]
mod tests;
