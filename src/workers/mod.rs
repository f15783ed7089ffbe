pub mod acquisition;
pub mod transcoder;

pub use acquisition::{AcquisitionReport, AcquisitionWorker};
pub use transcoder::{RetryPolicy, TranscodeOutcome, TranscodingWorker};
