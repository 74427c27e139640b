//! Terminal rendering and line input

use colored::*;
use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use ragbot_core::{ChatMessage, Result, Role};

const PROMPT: &str = "you>";

/// Display startup banner
pub fn display_banner() {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = terminal_width.saturating_sub(4).clamp(40, 60);

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));

    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());
    for line in [
        "ragbot - chat with your documents",
        "",
        "↑/↓ recall earlier prompts",
        "Esc, Ctrl-C or Ctrl-D to quit",
    ] {
        if line.is_empty() {
            println!("{}", empty_line.blue());
            continue;
        }
        let padding = (banner_width - 4).saturating_sub(line.chars().count());
        println!("{}", format!("│  {}{}│", line, " ".repeat(padding)).blue());
    }
    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
}

/// Clear the terminal and move the cursor home
pub fn clear_screen() -> Result<()> {
    if io::stdout().is_terminal() {
        execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
    }
    Ok(())
}

/// Write every message in order, each under its role tag
pub fn render_history<W: Write>(out: &mut W, messages: &[ChatMessage]) -> io::Result<()> {
    for message in messages {
        let tag = match message.role {
            Role::User => "you".green().bold(),
            Role::Assistant => "ragbot".blue().bold(),
            Role::System => "system".dimmed(),
        };
        writeln!(out, "{}", tag)?;
        writeln!(out, "{}", message.content)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Show the indicator displayed while a response is pending
pub fn show_thinking() -> Result<()> {
    print!("{}", "Thinking...".dimmed().italic());
    io::stdout().flush()?;
    Ok(())
}

/// Earlier prompts navigable with ↑/↓
#[derive(Debug, Default)]
pub struct PromptHistory {
    entries: Vec<String>,
    index: Option<usize>,
}

impl PromptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submitted prompt and reset navigation
    pub fn push(&mut self, entry: &str) {
        if !entry.trim().is_empty() {
            self.entries.push(entry.to_string());
        }
        self.index = None;
    }

    /// Step back to an older entry
    pub fn older(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let index = match self.index {
            None => self.entries.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.index = Some(index);
        Some(&self.entries[index])
    }

    /// Step forward; an empty line once past the newest entry
    pub fn newer(&mut self) -> Option<&str> {
        let index = self.index?;
        if index + 1 < self.entries.len() {
            self.index = Some(index + 1);
            Some(&self.entries[index + 1])
        } else {
            self.index = None;
            Some("")
        }
    }
}

/// Disables raw mode when dropped, including on early returns
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Read one prompt. `None` means the user asked to quit.
pub fn read_prompt(history: &mut PromptHistory) -> Result<Option<String>> {
    // Piped input: one line per prompt, end of input quits
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim_end_matches(['\r', '\n']).to_string();
        history.push(&input);
        return Ok(Some(input));
    }

    let _raw = RawMode::enable()?;
    let mut input = String::new();
    redraw(&input)?;

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => {
                print!("\r\n");
                return Ok(None);
            }
            KeyCode::Esc => {
                print!("\r\n");
                return Ok(None);
            }
            KeyCode::Enter => {
                print!("\r\n");
                io::stdout().flush()?;
                history.push(&input);
                return Ok(Some(input));
            }
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Up => {
                if let Some(entry) = history.older() {
                    input = entry.to_string();
                }
            }
            KeyCode::Down => {
                if let Some(entry) = history.newer() {
                    input = entry.to_string();
                }
            }
            _ => continue,
        }
        redraw(&input)?;
    }
}

fn redraw(input: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, crossterm::cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    write!(stdout, "{} {}", PROMPT.green().bold(), input)?;
    stdout.flush()
}
