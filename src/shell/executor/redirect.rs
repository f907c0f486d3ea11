use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::path::PathBuf;

use log::debug;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::unistd::dup2;

use crate::shell::error::ShellError;
use crate::shell::parser::{Command, RedirectOp, StageRole};

/// An opened redirect target.
///
/// Files are opened by the shell before forking (close-on-exec, as `std::fs`
/// always does), so a bad path is reported without spawning anything.
#[derive(Debug)]
pub struct Redirection {
    pub op: RedirectOp,
    pub path: PathBuf,
    file: File,
}

impl Redirection {
    /// `command` is the stage the redirect belongs to, kept for diagnostics.
    pub fn open(op: RedirectOp, target: &str, command: &str) -> Result<Self, ShellError> {
        let path = PathBuf::from(target);
        let opened = match op {
            RedirectOp::Input => File::open(&path),
            RedirectOp::Output => File::create(&path),
            RedirectOp::Append => OpenOptions::new().create(true).append(true).open(&path),
        };
        match opened {
            Ok(file) => Ok(Redirection { op, path, file }),
            Err(e) if e.kind() == io::ErrorKind::NotFound && op == RedirectOp::Input => {
                Err(ShellError::FileNotFound {
                    command: command.to_string(),
                    path,
                })
            }
            Err(source) => Err(ShellError::Redirect {
                command: command.to_string(),
                path,
                source,
            }),
        }
    }

    /// The standard stream this redirection replaces.
    pub fn target_fd(&self) -> RawFd {
        match self.op {
            RedirectOp::Input => libc::STDIN_FILENO,
            RedirectOp::Output | RedirectOp::Append => libc::STDOUT_FILENO,
        }
    }

    /// Drops everything but the descriptor, so the forked child has nothing
    /// left to free.
    pub fn into_stream(self) -> StdStream {
        StdStream {
            target: self.target_fd(),
            file: self.file,
        }
    }
}

/// A file bound for one standard stream of a child.
#[derive(Debug)]
pub struct StdStream {
    target: RawFd,
    file: File,
}

impl StdStream {
    /// Duplicates the file onto its standard stream and closes the original.
    /// Only async-signal-safe calls, so it can run between fork and exec.
    pub fn install(self) -> nix::Result<()> {
        if self.file.as_raw_fd() == self.target {
            // already in place; closing it would undo the redirect and
            // close-on-exec would drop it at exec
            fcntl(self.target, FcntlArg::F_SETFD(FdFlag::empty()))?;
            let _ = self.file.into_raw_fd();
            return Ok(());
        }
        dup2(self.file.as_raw_fd(), self.target)?;
        Ok(())
    } // file closed when it goes out of scope
}

/// Opens the one slot of `stage`'s redirects honored in `role`, if any.
pub fn resolve(stage: &Command, role: StageRole) -> Result<Option<Redirection>, ShellError> {
    let redirects = &stage.redirects;
    let Some((op, target)) = redirects.effective(role) else {
        if !redirects.is_empty() {
            debug!("redirects {:?} of {} have no effect as {:?}", redirects, stage.name, role);
        }
        return Ok(None);
    };

    let ignored = [RedirectOp::Input, RedirectOp::Output, RedirectOp::Append]
        .into_iter()
        .filter(|&other| other != op && redirects.get(other).is_some())
        .count();
    if ignored > 0 {
        debug!("{} {} wins, {} other redirect(s) ignored", op.symbol(), target, ignored);
    }

    Redirection::open(op, target, &stage.name).map(Some)
}
