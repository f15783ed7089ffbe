//! Two-stage video pipeline.
//!
//! The acquisition worker downloads source media, stores it under
//! `videos/<name>` and announces the key on the `video-uploads` topic. The
//! transcoding worker consumes those keys, encodes each original into every
//! configured format concurrently and stores the results under
//! `encoded/<name>`. The two stages share nothing but the blob store and the
//! event bus.

pub mod app;
pub mod cli;
pub mod common;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod modules;
pub mod state;
pub mod workers;

pub use error::{PipelineError, PipelineResult};
