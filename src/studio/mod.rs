//! The recording studio: countdown, capture over the backing track, live remix
//! preview, offline render and hand-off to download or favorites.

pub mod command;
pub mod countdown;
pub mod error;
pub mod params;
pub mod preview;
pub mod recorder;
pub mod render;
pub mod session;
pub mod state;
pub mod voice;


pub use command::StudioCommand;
pub use error::StudioError;
pub use params::{MixParameters, MONITORING_VOLUME};
pub use recorder::{Studio, StudioDevices, StudioOptions, SAVED_MIX_REDIRECT};
pub use render::{render_encoded, OfflineMixRenderer, RenderedMix};
pub use state::{SavedMix, SongRef, StudioPhase, StudioStatus, StudioStatusHandle};
pub use voice::{VoiceInfo, VoiceRecording};
