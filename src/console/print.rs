use std::io::Write;
use std::sync::{Arc, Mutex};

/// Console output.
///
/// Messages go to stdout, in test environment printer may capture them instead.
#[derive(Clone, Default)]
pub struct Printer {
    captured: Option<Arc<Mutex<Vec<String>>>>,
}

impl Printer {
    pub fn stdout() -> Self {
        Self { captured: None }
    }

    /// Create printer that captures all messages in a shared buffer.
    pub fn capturing() -> (Self, Arc<Mutex<Vec<String>>>) {
        let buffer = Arc::new(Mutex::new(vec![]));
        (
            Self {
                captured: Some(Arc::clone(&buffer)),
            },
            buffer,
        )
    }

    pub fn print(&self, msg: impl Into<String>) {
        let msg = msg.into();
        match &self.captured {
            None => println!("{msg}"),
            Some(buffer) => {
                if let Ok(mut buffer) = buffer.lock() {
                    buffer.push(msg);
                }
            }
        }
    }

    /// Print message without line break, not captured.
    pub fn prompt(&self, msg: &str) {
        if self.captured.is_none() {
            print!("{msg}");
            _ = std::io::stdout().flush();
        }
    }
}
