pub mod capability;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod keywords;
pub mod progress;
pub mod scheduler;
pub mod sink;
pub mod walker;

pub use capability::Capabilities;
pub use config::{Config, ScanRequest};
pub use error::{Result, ScanError};
pub use extract::{ExtractorKind, Found};
pub use keywords::KeywordSet;
pub use progress::ProgressObserver;
pub use scheduler::{
    CancelToken, NullObserver, ProgressEvent, ScanObserver, ScanOutcome, Scanner,
};
pub use sink::ResultSink;
pub use walker::FileRecord;
