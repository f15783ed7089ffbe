pub mod events;
pub mod model;

pub use events::PipelineEvent;
pub use model::{BlobKey, KeyLayout, SourceReference, TranscodeTarget, download_base_name};
