//! Modal key dispatch: configured key names resolve to actions per mode.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gpttui_core::KeyBindings;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert,
    Normal,
    Send,
    Yank,
    Paste,
    Clear,
    Quit,
    Delete,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
}

/// Resolved bindings. Normal mode holds insert/yank/paste/clear/quit/delete,
/// insert mode holds normal/send; everything else typed in insert mode edits
/// the input line.
#[derive(Debug, Clone)]
pub struct KeyMap {
    normal: HashMap<String, Action>,
    insert: HashMap<String, Action>,
}

impl KeyMap {
    pub fn from_bindings(bindings: &KeyBindings) -> Self {
        let mut normal = HashMap::new();
        normal.insert("j".to_string(), Action::ScrollDown);
        normal.insert("k".to_string(), Action::ScrollUp);
        normal.insert("pageup".to_string(), Action::PageUp);
        normal.insert("pagedown".to_string(), Action::PageDown);
        // Configured keys win over the built-in scroll keys.
        for (key, action) in [
            (&bindings.insert, Action::Insert),
            (&bindings.yank, Action::Yank),
            (&bindings.paste, Action::Paste),
            (&bindings.clear, Action::Clear),
            (&bindings.quit, Action::Quit),
            (&bindings.delete, Action::Delete),
        ] {
            normal.insert(normalize(key), action);
        }

        let mut insert = HashMap::new();
        insert.insert(normalize(&bindings.normal), Action::Normal);
        insert.insert(normalize(&bindings.send), Action::Send);

        Self { normal, insert }
    }

    pub fn lookup(&self, mode: Mode, key: &KeyEvent) -> Option<Action> {
        let name = key_name(key)?;
        match mode {
            Mode::Normal => self.normal.get(&name).copied(),
            Mode::Insert => self.insert.get(&name).copied(),
        }
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::from_bindings(&KeyBindings::default())
    }
}

fn normalize(name: &str) -> String {
    let name = name.trim();
    // Single characters are case-sensitive, named keys are not.
    if name.chars().count() == 1 {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

/// Name of a key event in binding syntax: `a`, `A`, `enter`, `escape`,
/// `ctrl+x`. Returns `None` for keys with no name.
pub fn key_name(key: &KeyEvent) -> Option<String> {
    let base = match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Some(format!("ctrl+{}", c.to_ascii_lowercase()));
        }
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Esc => "escape".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        _ => return None,
    };
    Some(base)
}
