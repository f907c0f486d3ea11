pub mod builtin;
#[allow(clippy::module_inception)]
pub mod executor;
pub mod redirect;

pub use builtin::{BuiltinContext, BuiltinFn, Builtins};
pub use executor::Executor;

/// How a line ended, from the read loop's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    /// Keep reading lines.
    Success,
    /// Leave the read loop.
    Exit,
    /// The command could not be found; keep reading.
    Unknown,
}
