use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::utils::config::Config;
use log::{debug, error, warn};
pub use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use rustyline::{
    Cmd, CompletionType, ConditionalEventHandler, Config as RLConfig, Event, EventContext,
    EventHandler, KeyCode, KeyEvent, Modifiers, RepeatCount,
};

/// Tab ends the line and flags it as a completion request.
struct CompletionKey {
    requested: Arc<AtomicBool>,
}

impl CompletionKey {
    fn press(&self) -> Cmd {
        self.requested.store(true, Ordering::SeqCst);
        Cmd::AcceptLine
    }
}

impl ConditionalEventHandler for CompletionKey {
    fn handle(&self, _: &Event, _: RepeatCount, _: bool, _: &EventContext) -> Option<Cmd> {
        Some(self.press())
    }
}

pub struct ReadlineManager {
    history_file: PathBuf,
    editor: Editor<(), FileHistory>,
    completion_requested: Arc<AtomicBool>,
}

impl ReadlineManager {
    pub fn new(config: &Config) -> Result<Self, ReadlineError> {
        let rl_config = RLConfig::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(config.get_edit_mode())
            .build();

        let mut editor = Editor::with_config(rl_config)?;
        let completion_requested = Arc::new(AtomicBool::new(false));
        editor.bind_sequence(
            KeyEvent(KeyCode::Tab, Modifiers::NONE),
            EventHandler::Conditional(Box::new(CompletionKey {
                requested: Arc::clone(&completion_requested),
            })),
        );
        Ok(Self {
            history_file: config.history_file.clone(),
            editor,
            completion_requested,
        })
    }

    /// A missing history file is normal on first start.
    pub fn load_history(&mut self) {
        match self.editor.load_history(&self.history_file) {
            Ok(()) => debug!("history loaded from {}", self.history_file.display()),
            Err(err) => warn!(
                "cannot load history {}: {}",
                self.history_file.display(),
                err
            ),
        }
    }

    pub fn save_history(&mut self) {
        match self.editor.save_history(&self.history_file) {
            Ok(()) => debug!("history saved"),
            Err(err) => error!(
                "cannot save history {}: {}",
                self.history_file.display(),
                err
            ),
        }
    }

    pub fn add_history(&mut self, line: &str) -> Result<bool, ReadlineError> {
        self.editor.add_history_entry(line)
    }

    pub fn readline(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        self.editor.readline(prompt)
    }

    /// Whether the last line was ended with Tab. Clears the flag.
    pub fn take_completion_request(&self) -> bool {
        self.completion_requested.swap(false, Ordering::SeqCst)
    }

    /// Reads a line with `initial` already typed in, cursor at its end.
    pub fn readline_with_initial(
        &mut self,
        prompt: &str,
        initial: &str,
    ) -> Result<String, ReadlineError> {
        self.editor.readline_with_initial(prompt, (initial, ""))
    }
}
