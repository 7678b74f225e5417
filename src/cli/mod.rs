pub mod args;
pub mod favorites;
pub mod mix;

pub use args::{Cli, CliCommand, MixCliArgs, ServeCliArgs};
pub use favorites::handle_favorites_command;
pub use mix::handle_mix_command;

use crate::app::ServeOptions;
use crate::studio::SongRef;

impl From<ServeCliArgs> for ServeOptions {
    fn from(args: ServeCliArgs) -> Self {
        Self {
            track: args.track,
            song: args.song_id.map(|id| SongRef {
                id,
                title: args.song_title,
            }),
            auto_start: args.auto_start,
        }
    }
}
