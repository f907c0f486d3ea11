pub mod error;
pub mod executor;
pub mod job_manager;
pub mod parser;
pub mod readline;
#[allow(clippy::module_inception)]
pub mod shell;

pub use shell::Shell;
