use std::fmt;

use log::{debug, error};
use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::sys::wait::WaitPidFlag as WF;
use nix::sys::wait::WaitStatus as WS;
use nix::unistd::Pid;

use crate::shell::error::ShellError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Done(i32),
}

#[derive(Debug, Clone)]
pub struct Job {
    pub index: usize,
    pub pids: Vec<Pid>,
    pub command: String,
    pub status: JobStatus,
    pub is_current: bool,
    pub is_previous: bool,
    reaped: Vec<Pid>,
}

impl Job {
    fn new(index: usize, pids: Vec<Pid>, command: String) -> Self {
        Self {
            index,
            pids,
            command,
            status: JobStatus::Running,
            is_current: false,
            is_previous: false,
            reaped: Vec::new(),
        }
    }

    /// Pid of the last stage, the one whose status is the job's status.
    pub fn leader(&self) -> Option<Pid> {
        self.pids.last().copied()
    }

    fn is_finished(&self) -> bool {
        self.pids.iter().all(|pid| self.reaped.contains(pid))
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            JobStatus::Running => "running".to_string(),
            JobStatus::Done(0) => "done".to_string(),
            JobStatus::Done(code) => format!("exit {}", code),
        };
        let mark = if self.is_current {
            "+"
        } else if self.is_previous {
            "-"
        } else {
            " "
        };
        let pid = self.leader().map(|p| p.as_raw()).unwrap_or_default();
        write!(
            f,
            "[{}] {} {} {} {}",
            self.index, mark, pid, status, self.command
        )
    }
}

/// Background pipelines the shell launched and has not reaped yet.
#[derive(Default)]
pub struct JobManager {
    jobs: Vec<Job>,
}

impl JobManager {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn find_available_index(&self) -> usize {
        let mut index = 1;
        while self.jobs.iter().any(|job| job.index == index) {
            index += 1;
        }
        index
    }

    pub fn add_job(&mut self, pids: Vec<Pid>, command: String) -> usize {
        let index = self.find_available_index();
        debug!("job [{}] started: {:?} {}", index, pids, command);
        self.jobs.push(Job::new(index, pids, command));
        self.update_marks(index);
        index
    }

    fn remove_job(&mut self, index: usize) -> Option<Job> {
        let pos = self.jobs.iter().position(|job| job.index == index)?;
        let was_current = self.jobs[pos].is_current;
        let job = self.jobs.remove(pos);

        if was_current && !self.jobs.is_empty() {
            // promote the previous job, or the newest one if there is none
            if let Some(prev_job) = self.jobs.iter_mut().find(|job| job.is_previous) {
                prev_job.is_current = true;
                prev_job.is_previous = false;
            } else {
                let last_idx = self.jobs.len() - 1;
                self.jobs[last_idx].is_current = true;
            }
        }
        Some(job)
    }

    fn update_marks(&mut self, current_job_index: usize) {
        for job in self.jobs.iter_mut() {
            if job.index == current_job_index {
                job.is_current = true;
                job.is_previous = false;
            } else if job.is_current {
                job.is_current = false;
                job.is_previous = true;
            } else {
                job.is_previous = false;
            }
        }
    }

    /// Collects every tracked child that has exited, without blocking.
    ///
    /// Only pids registered here are waited on, so children owned by anyone
    /// else are left alone. Jobs whose stages have all exited are removed and
    /// returned.
    pub fn reap(&mut self) -> Vec<Job> {
        let mut finished = Vec::new();
        for job in self.jobs.iter_mut() {
            let pending: Vec<Pid> = job
                .pids
                .iter()
                .copied()
                .filter(|pid| !job.reaped.contains(pid))
                .collect();
            for pid in pending {
                match try_wait(pid) {
                    Ok(Some(code)) => {
                        job.reaped.push(pid);
                        if Some(pid) == job.leader() {
                            job.status = JobStatus::Done(code);
                        }
                    }
                    Ok(None) => {}
                    Err(Errno::ECHILD) => {
                        // someone else already collected it
                        job.reaped.push(pid);
                    }
                    Err(e) => error!("waitpid {} failed: {}", pid, e),
                }
            }
            if job.is_finished() {
                if job.status == JobStatus::Running {
                    job.status = JobStatus::Done(0);
                }
                finished.push(job.index);
            }
        }

        finished
            .into_iter()
            .filter_map(|index| self.remove_job(index))
            .collect()
    }
}

fn exit_code(status: WS) -> Option<i32> {
    match status {
        WS::Exited(_, code) => Some(code),
        WS::Signaled(_, sig, _) => Some(128 + sig as i32),
        _ => None,
    }
}

fn try_wait(pid: Pid) -> Result<Option<i32>, Errno> {
    loop {
        match waitpid(pid, Some(WF::WNOHANG)) {
            Err(Errno::EINTR) => continue,
            Ok(WS::StillAlive) => return Ok(None),
            Ok(status) => return Ok(exit_code(status)),
            Err(e) => return Err(e),
        }
    }
}

fn wait_one(pid: Pid) -> Result<i32, Errno> {
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            Ok(status) => match exit_code(status) {
                Some(code) => return Ok(code),
                // stopped or continued, keep waiting for termination
                None => continue,
            },
            Err(e) => return Err(e),
        }
    }
}

/// Blocks until every pid has terminated, in order. Returns the status of the
/// last one, the pipeline's tail.
pub fn wait_foreground(pids: &[Pid]) -> Result<i32, ShellError> {
    let mut status = 0;
    let mut failure = None;
    for &pid in pids {
        match wait_one(pid) {
            Ok(code) => {
                debug!("pid {} exited with {}", pid, code);
                status = code;
            }
            Err(e) => {
                error!("waitpid {} failed: {}", pid, e);
                failure.get_or_insert(e);
            }
        }
    }
    match failure {
        Some(e) => Err(ShellError::spawn("waitpid", e)),
        None => Ok(status),
    }
}
