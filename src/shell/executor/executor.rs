use std::collections::VecDeque;
use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::raw::c_char;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use log::{debug, warn};
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::unistd::{self, dup2, fork, pipe, ForkResult, Pid};

use super::builtin::{BuiltinContext, Builtins};
use super::redirect::{self, Redirection, StdStream};
use super::ExitSignal;
use crate::shell::error::ShellError;
use crate::shell::job_manager::{wait_foreground, Job, JobManager};
use crate::shell::parser::{Command, Parser, StageRole};
use crate::utils::config::Config;
use crate::utils::path::resolve_executable;

/// Everything a child needs, prepared before `fork` so the child never
/// allocates.
struct Stage {
    name: String,
    program: CString,
    argv: Argv,
    redirection: Option<StdStream>,
    not_found: Vec<u8>,
    setup_failed: Vec<u8>,
}

pub struct Executor {
    sysname: String,
    bin_dir: PathBuf,
    parser: Parser,
    builtins: Builtins,
    jobs: JobManager,
}

impl Executor {
    pub fn new(config: &Config) -> Self {
        Self {
            sysname: config.name.clone(),
            bin_dir: config.bin_dir.clone(),
            parser: Parser::new(config.max_line_len),
            builtins: Builtins::default(),
            jobs: JobManager::new(),
        }
    }

    /// Registers extra built-ins on top of the defaults.
    pub fn builtins_mut(&mut self) -> &mut Builtins {
        &mut self.builtins
    }

    pub fn jobs(&self) -> &JobManager {
        &self.jobs
    }

    pub fn reap_jobs(&mut self) -> Vec<Job> {
        self.jobs.reap()
    }

    /// Parses, dispatches and runs one line, printing any diagnostic.
    pub fn run_line(&mut self, line: &str) -> ExitSignal {
        let command = match self.parser.parse(line) {
            Ok(command) => command,
            Err(e) => {
                self.report("", &e);
                return ExitSignal::Success;
            }
        };

        match self.execute(&command) {
            Ok(signal) => signal,
            Err(e) => {
                self.report(&command.name, &e);
                match e {
                    ShellError::ExecutableNotFound { .. } => ExitSignal::Unknown,
                    _ => ExitSignal::Success,
                }
            }
        }
    }

    pub fn execute(&mut self, command: &Command) -> Result<ExitSignal, ShellError> {
        if let Some(result) = self.dispatch(command) {
            return result;
        }
        self.execute_external(command)
    }

    /// Runs `command` in-process if it is blank or a built-in. `None` means it
    /// has to be spawned.
    pub fn dispatch(&mut self, command: &Command) -> Option<Result<ExitSignal, ShellError>> {
        if command.is_empty() {
            return Some(Ok(ExitSignal::Success));
        }

        let func = self.builtins.lookup(&command.name)?;
        if command.is_pipeline() {
            warn!(
                "built-in {} runs in the shell, the rest of the pipeline is dropped",
                command.name
            );
        }
        debug!("built-in: {}", command.name);

        let stdout = io::stdout();
        let mut out = stdout.lock();
        let result = {
            let mut ctx = BuiltinContext {
                jobs: &self.jobs,
                out: &mut out,
            };
            func(command, &mut ctx)
        };
        let _ = out.flush();
        Some(result)
    }

    fn execute_external(&mut self, command: &Command) -> Result<ExitSignal, ShellError> {
        debug!("external: {}", command);
        let mut stages = self.plan(command)?;

        let mut pids = Vec::with_capacity(stages.len());
        if let Err(e) = spawn_pipeline(&mut stages, None, &mut pids) {
            // the stages that did start see EOF once our pipe ends are gone
            let _ = wait_foreground(&pids);
            return Err(e);
        }

        if command.background {
            let index = self.jobs.add_job(pids.clone(), command.to_string());
            let leader = pids.last().map(|p| p.as_raw()).unwrap_or_default();
            let _ = writeln!(io::stdout(), "[{}] {}", index, leader);
            return Ok(ExitSignal::Success);
        }

        let status = wait_foreground(&pids)?;
        debug!("{} finished with status {}", command.name, status);
        Ok(ExitSignal::Success)
    }

    /// Resolves programs, opens redirections and builds argv for every stage.
    ///
    /// Programs are resolved first, so a typo anywhere in the pipeline neither
    /// spawns anything nor truncates an output file.
    fn plan(&self, command: &Command) -> Result<VecDeque<Stage>, ShellError> {
        let programs = command
            .stages()
            .map(|stage| {
                resolve_executable(&stage.name, &self.bin_dir).ok_or_else(|| {
                    ShellError::ExecutableNotFound {
                        name: stage.name.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let len = command.len();
        command
            .stages()
            .zip(programs)
            .enumerate()
            .map(|(i, (stage, program))| {
                let redirection = redirect::resolve(stage, StageRole::of(i, len))?;
                let argv = Argv::new(std::iter::once(&stage.name).chain(&stage.args))?;
                Ok(Stage {
                    name: stage.name.clone(),
                    program: to_cstring(program.as_os_str().as_bytes())?,
                    argv,
                    redirection: redirection.map(Redirection::into_stream),
                    not_found: format!("-{}: {}: command not found\n", self.sysname, stage.name)
                        .into_bytes(),
                    setup_failed: format!(
                        "-{}: {}: cannot set up standard streams\n",
                        self.sysname, stage.name
                    )
                    .into_bytes(),
                })
            })
            .collect()
    }

    fn report(&self, command: &str, err: &ShellError) {
        let _ = writeln!(io::stderr(), "{}", err.diagnostic(&self.sysname, command));
    }
}

/// `[name, args..., NULL]` as `execv` wants it, with the strings it points
/// into.
struct Argv {
    strings: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl Argv {
    fn new<'a>(args: impl Iterator<Item = &'a String>) -> Result<Self, ShellError> {
        let strings = args
            .map(|arg| to_cstring(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        // moving a CString does not move its heap buffer
        let ptrs = strings
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect();
        Ok(Self { strings, ptrs })
    }

    fn len(&self) -> usize {
        self.strings.len()
    }

    fn as_ptr(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }
}

fn to_cstring(bytes: &[u8]) -> Result<CString, ShellError> {
    CString::new(bytes)
        .map_err(|_| ShellError::ParseAmbiguity("argument contains a NUL byte".to_string()))
}

fn set_cloexec(fd: &OwnedFd) -> Result<(), ShellError> {
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
        .map_err(|e| ShellError::spawn("pipe", e))?;
    Ok(())
}

/// Forks the first of `stages` reading from `stdin`, then recurses down the
/// rest of the chain. Each step owns one new pipe: the left stage gets its
/// write end, the recursion gets its read end.
fn spawn_pipeline(
    stages: &mut VecDeque<Stage>,
    stdin: Option<OwnedFd>,
    pids: &mut Vec<Pid>,
) -> Result<(), ShellError> {
    let Some(stage) = stages.pop_front() else {
        return Ok(());
    };

    if stages.is_empty() {
        pids.push(fork_stage(stage, stdin, None, None)?);
        return Ok(());
    }

    let (read, write) = pipe().map_err(|e| ShellError::spawn("pipe", e))?;
    set_cloexec(&read)?;
    set_cloexec(&write)?;

    pids.push(fork_stage(stage, stdin, Some(write), Some(&read))?);
    spawn_pipeline(stages, Some(read), pids)
}

/// `unused` is a descriptor the parent keeps for a later stage; the child
/// closes its copy.
fn fork_stage(
    stage: Stage,
    stdin: Option<OwnedFd>,
    stdout: Option<OwnedFd>,
    unused: Option<&OwnedFd>,
) -> Result<Pid, ShellError> {
    // SAFETY: the child only makes async-signal-safe calls before exec or _exit
    match unsafe { fork() } {
        // parent copies of stdin, stdout and the redirect file close on return
        Ok(ForkResult::Parent { child }) => {
            debug!(
                "spawned {} with {} arg(s) as pid {}",
                stage.name,
                stage.argv.len(),
                child
            );
            Ok(child)
        }
        Ok(ForkResult::Child) => exec_stage(stage, stdin, stdout, unused),
        Err(e) => Err(ShellError::spawn("fork", e)),
    }
}

fn exec_stage(
    stage: Stage,
    stdin: Option<OwnedFd>,
    stdout: Option<OwnedFd>,
    unused: Option<&OwnedFd>,
) -> ! {
    if let Some(fd) = unused {
        let _ = unistd::close(fd.as_raw_fd());
    }

    let wired = stdin
        .map_or(Ok(()), |fd| install_fd(fd, libc::STDIN_FILENO))
        .and_then(|_| stdout.map_or(Ok(()), |fd| install_fd(fd, libc::STDOUT_FILENO)))
        .and_then(|_| stage.redirection.map_or(Ok(()), StdStream::install))
        // the shell runs with SIGPIPE ignored, and ignored dispositions
        // survive exec
        // SAFETY: sigaction(2) is async-signal-safe and no handler is installed
        .and_then(|_| unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) }.map(|_| ()));
    if wired.is_err() {
        child_exit(&stage.setup_failed, 1);
    }

    // SAFETY: program and every argv pointer stay alive in this process image;
    // execv only returns on failure
    unsafe {
        libc::execv(stage.program.as_ptr(), stage.argv.as_ptr());
    }
    child_exit(&stage.not_found, 127)
}

/// Moves `fd` onto `target` and closes the original.
fn install_fd(fd: OwnedFd, target: RawFd) -> nix::Result<()> {
    if fd.as_raw_fd() == target {
        // already in place; keep it open across exec
        fcntl(target, FcntlArg::F_SETFD(FdFlag::empty()))?;
        let _ = fd.into_raw_fd();
        return Ok(());
    }
    dup2(fd.as_raw_fd(), target)?;
    Ok(())
}

fn child_exit(message: &[u8], code: i32) -> ! {
    // SAFETY: write(2) and _exit(2) are async-signal-safe
    unsafe {
        libc::write(libc::STDERR_FILENO, message.as_ptr().cast(), message.len());
        libc::_exit(code)
    }
}
