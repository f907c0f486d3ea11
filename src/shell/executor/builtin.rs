use std::collections::HashMap;
use std::io::Write;

use log::debug;

use super::ExitSignal;
use crate::shell::error::ShellError;
use crate::shell::job_manager::JobManager;
use crate::shell::parser::Command;

/// What a built-in may touch besides its own command.
pub struct BuiltinContext<'a> {
    pub jobs: &'a JobManager,
    pub out: &'a mut dyn Write,
}

pub type BuiltinFn = fn(&Command, &mut BuiltinContext<'_>) -> Result<ExitSignal, ShellError>;

/// Commands that run inside the shell process instead of being spawned.
pub struct Builtins {
    table: HashMap<&'static str, BuiltinFn>,
}

impl Default for Builtins {
    fn default() -> Self {
        let mut builtins = Self::empty();
        builtins.register("exit", builtin_exit);
        builtins.register("cd", builtin_cd);
        builtins.register("jobs", builtin_jobs);
        builtins
    }
}

impl Builtins {
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Adds or replaces a built-in. Matching is by exact name.
    pub fn register(&mut self, name: &'static str, func: BuiltinFn) {
        self.table.insert(name, func);
    }

    pub fn lookup(&self, name: &str) -> Option<BuiltinFn> {
        self.table.get(name).copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.table.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn builtin_exit(_: &Command, _: &mut BuiltinContext<'_>) -> Result<ExitSignal, ShellError> {
    Ok(ExitSignal::Exit)
}

/// `cd` without an argument stays where it is.
fn builtin_cd(command: &Command, _: &mut BuiltinContext<'_>) -> Result<ExitSignal, ShellError> {
    let Some(target) = command.args.first() else {
        return Ok(ExitSignal::Success);
    };
    let expanded = shellexpand::tilde(target);
    let path: &str = &expanded;
    debug!("cd {}", path);
    nix::unistd::chdir(path).map_err(|source| ShellError::ChdirFailure {
        path: target.clone(),
        source,
    })?;
    Ok(ExitSignal::Success)
}

fn builtin_jobs(_: &Command, ctx: &mut BuiltinContext<'_>) -> Result<ExitSignal, ShellError> {
    for job in ctx.jobs.jobs() {
        // a closed stdout is not worth failing the shell over
        let _ = writeln!(ctx.out, "{}", job);
    }
    Ok(ExitSignal::Success)
}
