use log::{debug, error, warn};
use std::error::Error;
use std::io::{self, Write};

use crate::shell::executor::{Executor, ExitSignal};
use crate::shell::job_manager::{Job, JobStatus};
use crate::shell::readline::{ReadlineError, ReadlineManager};
use crate::utils::config::Config;
use crate::utils::theme::{load_theme, Theme};

pub struct Shell {
    name: String,
    theme: Theme,
    readline: ReadlineManager,
    executor: Executor,
}

impl Shell {
    pub fn new(config: &Config) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            name: config.name.clone(),
            theme: load_theme(&config.theme),
            readline: ReadlineManager::new(config)?,
            executor: Executor::new(config),
        })
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        self.readline.load_history();
        debug!("{} ready", self.name);

        let result = self.run_loop();
        self.readline.save_history();

        debug!("leaving {}", self.name);
        result
    }

    fn run_loop(&mut self) -> Result<(), Box<dyn Error>> {
        // text handed back to the editor after an auto-complete request
        let mut pending: Option<String> = None;

        loop {
            self.report_finished_jobs();
            io::stdout().flush()?;

            let prompt = self.theme.prompt(&self.name);
            let read = match pending.take() {
                Some(initial) => self.readline.readline_with_initial(&prompt, &initial),
                None => self.readline.readline(&prompt),
            };

            match read {
                Ok(line) => {
                    if self.readline.take_completion_request() {
                        debug!("auto-complete requested for {:?}", line);
                        pending = Some(line);
                        continue;
                    }
                    if !line.trim().is_empty() {
                        self.readline.add_history(&line)?;
                    }
                    if self.executor.run_line(&line) == ExitSignal::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Eof) => {
                    debug!("end of input");
                    break;
                }
                Err(ReadlineError::Interrupted) => {
                    warn!("interrupted");
                }
                Err(err) => {
                    error!("readline failed: {}", err);
                    eprintln!("{}", (self.theme.error_style)(format!("-{}: {}", self.name, err)));
                }
            }
        }
        Ok(())
    }

    fn report_finished_jobs(&mut self) {
        for job in self.executor.reap_jobs() {
            println!("{}", (self.theme.notice_style)(done_notice(&job)));
        }
    }
}

fn done_notice(job: &Job) -> String {
    match job.status {
        JobStatus::Done(0) | JobStatus::Running => format!("[{}] Done {}", job.index, job.command),
        JobStatus::Done(code) => format!("[{}] Exit {} {}", job.index, code, job.command),
    }
}
