mod completer;
mod editor;
pub mod history;

pub use completer::{common_prefix, ShellCompleter};
pub use editor::LineEditor;
pub use history::History;
