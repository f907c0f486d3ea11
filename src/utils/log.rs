use crate::utils::config::Config;
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::{self, File};
use std::io::Write;
use std::process;

pub fn level_filter(level: &str) -> LevelFilter {
    match level {
        level if level.eq_ignore_ascii_case("off") => LevelFilter::Off,
        level if level.eq_ignore_ascii_case("error") => LevelFilter::Error,
        level if level.eq_ignore_ascii_case("warn") => LevelFilter::Warn,
        level if level.eq_ignore_ascii_case("info") => LevelFilter::Info,
        level if level.eq_ignore_ascii_case("debug") => LevelFilter::Debug,
        level if level.eq_ignore_ascii_case("trace") => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    }
}

fn open_log_file(config: &Config) -> std::io::Result<File> {
    fs::create_dir_all(&config.logger_dir)?;
    let date = Local::now().format("%Y-%m-%d");
    File::options()
        .create(true)
        .append(true)
        .open(config.logger_dir.join(format!("{}_{}.log", config.name, date)))
}

/// Logs go to the dated file in the log directory. Stdout belongs to the
/// commands the shell runs, so it is never a log target; stderr is used only
/// when the file cannot be opened.
pub fn init_logger(config: &Config) {
    let level = level_filter(&config.logger_level);

    let sink: Box<dyn Write + Send> = match open_log_file(config) {
        Ok(file) => Box::new(file),
        Err(e) => {
            eprintln!(
                "-{}: log dir {}: {}",
                config.name,
                config.logger_dir.display(),
                e
            );
            Box::new(std::io::stderr())
        }
    };

    let result = Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[PID:{}][{}] {} - {}",
                process::id(),
                record.level(),
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.args()
            )
        })
        .target(Target::Pipe(sink))
        .filter(Some(&config.name), level)
        .filter(None, LevelFilter::Warn)
        .try_init();

    if result.is_ok() {
        log::debug!("log level set to {}", level);
    }
}
