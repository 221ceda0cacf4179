mod recorder;

pub use recorder::{CallRecorder, RecordingSummary};
