use crate::console::config::KeyPress;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use rustyline::error::ReadlineError;
use rustyline::history::MemHistory;
use rustyline::{Config, Editor};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key(KeyPress),
    /// Key without a char representation (like `enter` or `f1`).
    Other(String),
    /// Input closed or interrupted.
    Eof,
}

/// Source of user input.
pub trait Input {
    /// Read a single key press.
    fn read_key(&mut self) -> anyhow::Result<InputEvent>;

    /// Read a line, `None` if input is closed.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;
}

/// Keys in raw terminal mode, lines with line editor.
pub struct TerminalInput {
    editor: Editor<(), MemHistory>,
}

impl TerminalInput {
    pub fn new() -> anyhow::Result<Self> {
        let editor = Editor::with_history(Config::default(), MemHistory::new())?;
        Ok(Self { editor })
    }

    fn next_key() -> anyhow::Result<InputEvent> {
        loop {
            let Event::Key(key) = crossterm::event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            let event = match key.code {
                KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    InputEvent::Eof
                }
                KeyCode::Char(c) => InputEvent::Key(KeyPress {
                    key: c,
                    alt: key.modifiers.contains(KeyModifiers::ALT),
                }),
                code => InputEvent::Other(format!("{code:?}")),
            };
            return Ok(event);
        }
    }
}

impl Input for TerminalInput {
    fn read_key(&mut self) -> anyhow::Result<InputEvent> {
        terminal::enable_raw_mode()?;
        let event = Self::next_key();
        terminal::disable_raw_mode()?;

        if let Ok(InputEvent::Key(key)) = &event {
            println!("{}", key.key);
        }
        event
    }

    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                _ = self.editor.add_history_entry(&line);
                Ok(Some(line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptItem {
    Key(KeyPress),
    Line(String),
}

/// Predefined input, used for non-interactive sessions and tests.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    items: VecDeque<ScriptItem>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: char) -> Self {
        self.items.push_back(ScriptItem::Key(KeyPress::new(key)));
        self
    }

    pub fn alt_key(mut self, key: char) -> Self {
        self.items.push_back(ScriptItem::Key(KeyPress::alt(key)));
        self
    }

    pub fn line(mut self, line: &str) -> Self {
        self.items.push_back(ScriptItem::Line(line.to_string()));
        self
    }
}

impl Input for ScriptedInput {
    fn read_key(&mut self) -> anyhow::Result<InputEvent> {
        Ok(match self.items.pop_front() {
            None => InputEvent::Eof,
            Some(ScriptItem::Key(key)) => InputEvent::Key(key),
            Some(ScriptItem::Line(line)) => InputEvent::Other(line),
        })
    }

    fn read_line(&mut self, _: &str) -> anyhow::Result<Option<String>> {
        Ok(match self.items.pop_front() {
            None => None,
            Some(ScriptItem::Line(line)) => Some(line),
            Some(ScriptItem::Key(key)) => Some(key.key.to_string()),
        })
    }
}
