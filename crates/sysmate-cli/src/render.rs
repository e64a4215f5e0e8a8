//! Terminal output: markdown answers and history pretty-printing.

use colored::Colorize;
use termimad::MadSkin;
use termimad::crossterm::style::Color;

use sysmate_core::history::{ConversationHistory, Turn};

pub fn make_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.set_headers_fg(Color::Cyan);
    skin.bold.set_fg(Color::Yellow);
    skin.italic.set_fg(Color::Magenta);
    skin.code_block.set_fg(Color::Green);
    skin.inline_code.set_fg(Color::Green);
    skin
}

/// Render a model answer as markdown.
pub fn print_answer(skin: &MadSkin, text: &str) {
    println!();
    skin.print_text(text);
    println!();
}

/// Dump the retained conversation, one line per turn.
pub fn print_history(history: &ConversationHistory) {
    if history.is_empty() {
        println!("{}", "No conversation yet.".dimmed());
        return;
    }

    println!(
        "{}",
        format!(
            "─── history ({}/{} turns) ───",
            history.len(),
            history.capacity()
        )
        .dimmed()
    );

    for turn in history.turns() {
        match turn {
            Turn::User { text } => println!("{} {}", "you:".green().bold(), text),
            Turn::ModelText { text } => {
                println!("{} {}", "assistant:".cyan().bold(), first_line(text))
            }
            Turn::ToolCalls { calls } => {
                let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
                println!("{}", format!("  ⚙ called {}", names.join(", ")).dimmed());
            }
            Turn::ToolResults { records } => {
                let ok = records.iter().filter(|r| r.result.is_success()).count();
                println!(
                    "{}",
                    format!("  ⚙ {} result(s), {} ok", records.len(), ok).dimmed()
                );
            }
        }
    }
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if text.lines().count() > 1 {
        format!("{} ...", line)
    } else {
        line.to_string()
    }
}
