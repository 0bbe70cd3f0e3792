//! CLI command handlers. Each command is in its own file.

mod check;
mod digest;
mod fetch;

pub use check::run_check;
pub use digest::run_digest;
pub use fetch::run_fetch;
