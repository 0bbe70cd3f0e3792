pub mod config;
pub mod logging;

pub mod checksum;
pub mod control;
pub mod downloader;
pub mod fetch;
pub mod manifest;
pub mod progress;
pub mod verify;

pub use control::{CancelMode, CancelSignal};
pub use fetch::{FetchOutcome, ParamFetcher, ParamsError};
