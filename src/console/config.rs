use crate::debugger::jmc::JmcPolicy;
use crate::{muted_error, sd_warn, weak_error};
use anyhow::bail;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::fs::read_to_string;
use std::path::Path;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

/// Single key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: char,
    pub alt: bool,
}

impl KeyPress {
    pub const fn new(key: char) -> Self {
        Self { key, alt: false }
    }

    pub const fn alt(key: char) -> Self {
        Self { key, alt: true }
    }
}

impl FromStr for KeyPress {
    type Err = anyhow::Error;

    /// Parse key from a string like `space`, `alt-l` or `b`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (alt, raw) = match raw.strip_prefix("alt-") {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let key = match raw {
            "space" => ' ',
            "tab" => '\t',
            "hyphen" | "minus" => '-',
            _ => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => bail!("Unknown key code: {raw}"),
                }
            }
        };
        Ok(Self { key, alt })
    }
}

impl Display for KeyPress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.alt {
            f.write_str("alt-")?;
        }
        match self.key {
            ' ' => f.write_str("space"),
            '\t' => f.write_str("tab"),
            c => write!(f, "{c}"),
        }
    }
}

/// Debugger actions available at a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Continue,
    Quit,
    Locals,
    /// Locals, including compiler generated ones.
    LocalsAll,
    Trace,
    /// Stack trace, including infrastructure frames.
    TraceAll,
    StepOver,
    StepInto,
    StepOut,
    /// Prefix of breakpoint actions.
    Breakpoint,
    Help,
}

/// Actions available after breakpoint prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BreakpointAction {
    #[strum(serialize = "breakpoint_add")]
    Add,
    #[strum(serialize = "breakpoint_list")]
    List,
    #[strum(serialize = "breakpoint_enable")]
    Enable,
    #[strum(serialize = "breakpoint_disable")]
    Disable,
}

const DEFAULT_ACTIONS: &[(Action, KeyPress)] = &[
    (Action::Continue, KeyPress::new(' ')),
    (Action::Quit, KeyPress::new('q')),
    (Action::Locals, KeyPress::new('l')),
    (Action::LocalsAll, KeyPress::alt('l')),
    (Action::Trace, KeyPress::new('t')),
    (Action::TraceAll, KeyPress::alt('t')),
    (Action::StepOver, KeyPress::new('s')),
    (Action::StepInto, KeyPress::new('i')),
    (Action::StepOut, KeyPress::new('o')),
    (Action::Breakpoint, KeyPress::new('b')),
    (Action::Help, KeyPress::new('h')),
];

const DEFAULT_BREAKPOINT_ACTIONS: &[(BreakpointAction, KeyPress)] = &[
    (BreakpointAction::Add, KeyPress::new('a')),
    (BreakpointAction::List, KeyPress::new('l')),
    (BreakpointAction::Enable, KeyPress::new('e')),
    (BreakpointAction::Disable, KeyPress::new('d')),
];

/// Configuration of key bindings, keys are case-sensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMap {
    keys: HashMap<KeyPress, Action>,
    breakpoint_keys: HashMap<KeyPress, BreakpointAction>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            keys: DEFAULT_ACTIONS.iter().map(|(a, k)| (*k, *a)).collect(),
            breakpoint_keys: DEFAULT_BREAKPOINT_ACTIONS
                .iter()
                .map(|(a, k)| (*k, *a))
                .collect(),
        }
    }
}

impl KeyMap {
    /// Override default bindings, `bindings` is a map of action name to key.
    /// Unknown actions and keys are ignored.
    pub fn with_bindings(bindings: &HashMap<String, String>) -> Self {
        let mut keymap = Self::default();
        for (action, key) in bindings {
            let Some(key) = weak_error!(KeyPress::from_str(key), "keymap:") else {
                continue;
            };
            if let Ok(action) = Action::from_str(action) {
                keymap.keys.retain(|_, a| *a != action);
                keymap.keys.insert(key, action);
            } else if let Ok(action) = BreakpointAction::from_str(action) {
                keymap.breakpoint_keys.retain(|_, a| *a != action);
                keymap.breakpoint_keys.insert(key, action);
            } else {
                sd_warn!(target: "console", "keymap: unknown action `{action}`");
            }
        }
        keymap
    }

    pub fn action(&self, key: &KeyPress) -> Option<Action> {
        self.keys.get(key).copied()
    }

    pub fn breakpoint_action(&self, key: &KeyPress) -> Option<BreakpointAction> {
        self.breakpoint_keys.get(key).copied()
    }

    /// Return all keys bound to an action.
    pub fn keys_for_action(&self, act: Action) -> Vec<&KeyPress> {
        self.keys
            .iter()
            .filter_map(|(k, v)| if *v == act { Some(k) } else { None })
            .collect()
    }

    /// Return all keys bound to a breakpoint action.
    pub fn keys_for_breakpoint_action(&self, act: BreakpointAction) -> Vec<&KeyPress> {
        self.breakpoint_keys
            .iter()
            .filter_map(|(k, v)| if *v == act { Some(k) } else { None })
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    keymap: HashMap<String, String>,
    jmc: JmcPolicy,
}

/// Application configuration.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Config {
    pub keymap: KeyMap,
    pub jmc: JmcPolicy,
}

impl Config {
    const DEFAULT_PATH: &'static str = ".config/sdbg/config.toml";

    pub fn parse(data: &str) -> anyhow::Result<Self> {
        let file: ConfigFile = toml::from_str(data)?;
        Ok(Self {
            keymap: KeyMap::with_bindings(&file.keymap),
            jmc: file.jmc,
        })
    }

    /// Load configuration from a file, `~/.config/sdbg/config.toml` by default.
    /// Return default configuration if file is absent or broken.
    pub fn load(path: Option<&Path>) -> Self {
        let data = match path {
            None => {
                let Some(home) = home::home_dir() else {
                    return Self::default();
                };
                // missing default config is not an error
                match muted_error!(read_to_string(home.join(Self::DEFAULT_PATH))) {
                    Some(data) => data,
                    None => return Self::default(),
                }
            }
            Some(path) => match read_to_string(path) {
                Ok(data) => data,
                Err(err) => {
                    sd_warn!(target: "console", "Error while load config file: {err}");
                    return Self::default();
                }
            },
        };

        weak_error!(Self::parse(&data), "config ignored:").unwrap_or_default()
    }
}
