use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "karaoke-studio")]
#[command(about = "Sing over a backing track, preview the remix and render it to WAV", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the studio with its control API
    Serve(ServeCliArgs),
    /// Render a backing track and a voice take into one WAV file, offline
    Mix(MixCliArgs),
    /// List favorite songs from the music backend
    Favorites,
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct ServeCliArgs {
    /// Backing track URL or file path
    #[arg(short, long)]
    pub track: String,
    /// Id of the backing song on the music backend (needed to save mixes)
    #[arg(long)]
    pub song_id: Option<i64>,
    /// Title of the backing song, for display
    #[arg(long, requires = "song_id")]
    pub song_title: Option<String>,
    /// Start the countdown as soon as the studio is up
    #[arg(long)]
    pub auto_start: bool,
}

#[derive(ClapArgs, Debug)]
pub struct MixCliArgs {
    /// Backing track URL or file path
    #[arg(short, long)]
    pub backing: String,
    /// Voice take (any format the decoder understands)
    #[arg(long)]
    pub voice: PathBuf,
    /// Output WAV file
    #[arg(short, long)]
    pub output: PathBuf,
    /// Backing track volume (0.0 - 1.0, default from config)
    #[arg(long)]
    pub backing_volume: Option<f32>,
    /// Voice volume (0.0 - 2.0, default from config)
    #[arg(long)]
    pub voice_volume: Option<f32>,
    /// Write 16-bit PCM instead of 32-bit float
    #[arg(long)]
    pub pcm16: bool,
}
