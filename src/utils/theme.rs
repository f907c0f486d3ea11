use colored::Colorize;
use nix::unistd::gethostname;
use std::env;

use crate::utils::path;

pub struct Theme {
    pub user_style: Box<dyn Fn(String) -> String>,
    pub cwd_style: Box<dyn Fn(String) -> String>,
    pub error_style: Box<dyn Fn(String) -> String>,
    pub notice_style: Box<dyn Fn(String) -> String>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            user_style: Box::new(|s| s.bright_green().bold().to_string()),
            cwd_style: Box::new(|s| s.bright_blue().to_string()),
            error_style: Box::new(|s| s.bright_red().to_string()),
            notice_style: Box::new(|s| s.bright_magenta().to_string()),
        }
    }
}

impl Theme {
    pub fn plain() -> Self {
        Theme {
            user_style: Box::new(|s| s),
            cwd_style: Box::new(|s| s),
            error_style: Box::new(|s| s),
            notice_style: Box::new(|s| s),
        }
    }

    /// `user@host:cwd shellax$ `
    pub fn prompt(&self, sysname: &str) -> String {
        let user = env::var("USER").unwrap_or_default();
        let host = gethostname()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_default();
        format!(
            "{}:{} {}$ ",
            (self.user_style)(format!("{}@{}", user, host)),
            (self.cwd_style)(path::current_dir()),
            sysname
        )
    }
}

pub fn load_theme(theme_name: &str) -> Theme {
    match theme_name {
        "plain" => Theme::plain(),
        _ => Theme::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prompt_shape() {
        let prompt = load_theme("plain").prompt("shellax");
        assert!(prompt.ends_with(" shellax$ "));
        assert!(prompt.contains('@'));
        assert!(!prompt.contains('\u{1b}'));
    }
}
