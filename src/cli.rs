use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "video-pipeline")]
#[command(author, version, about = "Acquire source videos and transcode them through an event log")]
pub struct Cli {
    /// Load environment variables from this file instead of `.env`
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Acquire every item of the work list once, then exit
    Acquire,

    /// Run the transcoding consumer until it is stopped
    Serve,
}
