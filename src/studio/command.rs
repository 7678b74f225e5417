use std::path::PathBuf;

/// Everything the studio loop reacts to: user intents from the API or CLI,
/// and internal timer/playback events.
#[derive(Debug, Clone, PartialEq)]
pub enum StudioCommand {
    /// Begin the 3-2-1 countdown, then record.
    Record,
    /// Same as `Record`, honored once per studio lifetime.
    AutoStart,
    Stop,
    TogglePreview,
    SetMix {
        backing_volume: Option<f32>,
        voice_volume: Option<f32>,
    },
    /// Render and write to `path`, or to the configured download location.
    Download {
        path: Option<PathBuf>,
    },
    SaveToFavorites,
    Discard,
    Shutdown,
    CountdownTick(u8),
    CountdownElapsed,
    /// The voice playback of preview `generation` reached its end.
    PreviewEnded(u64),
}
