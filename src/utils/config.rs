use dotenv::dotenv;
use rustyline::EditMode;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::shell::parser::DEFAULT_MAX_LINE_LEN;

pub struct Config {
    pub name: String,
    pub config_dir: PathBuf,
    pub theme: String,
    pub bin_dir: PathBuf,
    pub history_file: PathBuf,
    pub editor_mode: String,
    pub logger_level: String,
    pub logger_dir: PathBuf,
    pub max_line_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = Self::get_config_dir();
        Config {
            name: String::from("shellax"),
            theme: String::from("default"),
            bin_dir: PathBuf::from("/usr/bin"),
            history_file: config_dir.join(".shellax_history"),
            editor_mode: String::from("emacs"),
            logger_level: String::from("warn"),
            logger_dir: config_dir.join("logs"),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            config_dir,
        }
    }
}

impl Config {
    fn get_config_dir() -> PathBuf {
        if let Ok(home) = env::var("HOME") {
            PathBuf::from(home).join(".config/shellax")
        } else {
            PathBuf::from("tmp")
        }
    }

    pub fn new() -> Self {
        // .env never overrides variables already set
        if cfg!(debug_assertions) {
            dotenv::from_filename(".env.development").ok();
        } else {
            dotenv().ok();
        }

        let mut config = Config::default();

        if let Ok(theme) = env::var("SHELLAX_THEME") {
            config.theme = theme;
        }

        if let Ok(dir) = env::var("SHELLAX_BIN_DIR") {
            config.bin_dir = PathBuf::from(dir);
        }

        if let Ok(editor) = env::var("SHELLAX_EDITOR") {
            config.editor_mode = editor;
        }

        if let Ok(history) = env::var("SHELLAX_HISTORY") {
            config.history_file = PathBuf::from(history);
        }

        if let Ok(level) = env::var("SHELLAX_LOG_LEVEL") {
            config.logger_level = level;
        }

        if let Ok(dir) = env::var("SHELLAX_LOG_DIR") {
            config.logger_dir = PathBuf::from(dir);
        }

        if let Some(len) = env::var("SHELLAX_MAX_LINE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.max_line_len = len;
        }

        // best effort: a missing directory only costs us history persistence
        if let Some(parent) = config.history_file.parent() {
            fs::create_dir_all(parent).ok();
        }

        config
    }

    pub fn get_edit_mode(&self) -> EditMode {
        match self.editor_mode.to_lowercase().as_str() {
            "vi" => EditMode::Vi,
            _ => EditMode::Emacs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.name, "shellax");
        assert_eq!(config.bin_dir, PathBuf::from("/usr/bin"));
        assert_eq!(config.max_line_len, DEFAULT_MAX_LINE_LEN);
        assert!(config.history_file.ends_with(".shellax_history"));
    }

    #[test]
    fn test_edit_mode() {
        let mut config = Config::default();
        assert_eq!(config.get_edit_mode(), EditMode::Emacs);
        config.editor_mode = "VI".to_string();
        assert_eq!(config.get_edit_mode(), EditMode::Vi);
    }
}
