// Library interface for gpttui-cli so integration tests can reach the
// key dispatch and theme modules. main.rs declares the same files, hence
// the path attributes.

#[path = "keys.rs"]
pub mod keys;

#[path = "theme.rs"]
pub mod theme;

pub use keys::{key_name, Action, KeyMap, Mode};
pub use theme::Theme;
