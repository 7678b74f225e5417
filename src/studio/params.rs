//! Mix gains chosen by the user.

use serde::Serialize;
use std::ops::RangeInclusive;

/// Backing track volume while recording and whenever no preview is playing.
/// Independent of [`MixParameters`].
pub const MONITORING_VOLUME: f32 = 1.0;

pub const BACKING_VOLUME_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Above 1.0 amplifies the voice.
pub const VOICE_VOLUME_RANGE: RangeInclusive<f32> = 0.0..=2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MixParameters {
    backing_volume: f32,
    voice_volume: f32,
}

impl Default for MixParameters {
    fn default() -> Self {
        Self {
            backing_volume: 0.5,
            voice_volume: 1.0,
        }
    }
}

impl MixParameters {
    pub fn new(backing_volume: f32, voice_volume: f32) -> Self {
        let mut params = Self::default();
        params.set_backing_volume(backing_volume);
        params.set_voice_volume(voice_volume);
        params
    }

    pub fn backing_volume(&self) -> f32 {
        self.backing_volume
    }

    pub fn voice_volume(&self) -> f32 {
        self.voice_volume
    }

    /// Clamped to [`BACKING_VOLUME_RANGE`]; NaN is ignored.
    pub fn set_backing_volume(&mut self, volume: f32) {
        if let Some(v) = clamp(volume, &BACKING_VOLUME_RANGE) {
            self.backing_volume = v;
        }
    }

    /// Clamped to [`VOICE_VOLUME_RANGE`]; NaN is ignored.
    pub fn set_voice_volume(&mut self, volume: f32) {
        if let Some(v) = clamp(volume, &VOICE_VOLUME_RANGE) {
            self.voice_volume = v;
        }
    }
}

fn clamp(value: f32, range: &RangeInclusive<f32>) -> Option<f32> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(*range.start(), *range.end()))
    }
}
