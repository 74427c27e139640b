//! Terminal chat session for ragbot

pub mod session;
pub mod ui;

#[cfg(test)]
mod tests;

pub use session::{ChatSession, GREETING, SessionState};
pub use ui::{
    PromptHistory, clear_screen, display_banner, read_prompt, render_history, show_thinking,
};
