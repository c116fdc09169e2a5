use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::sync::StrategyEditor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Field {
    Strategy,
    Notes,
}

pub fn render_document(editor: &StrategyEditor) -> String {
    let saved = editor
        .last_saved()
        .map(|at| format!("Saved {}", at.format("%Y-%m-%d %H:%M:%S")))
        .unwrap_or_else(|| "Not saved yet".to_string());

    let strategy = editor.strategy();
    let notes = editor.notes();
    format!(
        "Strategy & Rules\n{}\n\nNotes\n{}\n\n{}",
        if strategy.is_empty() { "(empty)" } else { strategy.as_str() },
        if notes.is_empty() { "(empty)" } else { notes.as_str() },
        saved
    )
}

pub async fn show(editor: &StrategyEditor) -> Result<()> {
    editor.load().await?;
    println!("{}", render_document(editor));
    Ok(())
}

/// Replaces one or both texts and saves before returning.
pub async fn set(
    editor: &StrategyEditor,
    strategy: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    if strategy.is_none() && notes.is_none() {
        bail!("Nothing to save: pass --strategy and/or --notes");
    }
    editor.load().await?;
    if let Some(text) = strategy {
        editor.edit_strategy(text);
    }
    if let Some(text) = notes {
        editor.edit_notes(text);
    }
    editor.flush().await?;
    println!("{}", render_document(editor));
    Ok(())
}

/// Live editing: every input line is appended to `field` and autosaved
/// once typing pauses. Whatever is still unsaved at end of input is flushed.
pub async fn edit<R>(editor: &StrategyEditor, field: Field, input: R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    editor.load().await?;
    let mut text = match field {
        Field::Strategy => editor.strategy(),
        Field::Notes => editor.notes(),
    };

    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&line);
        match field {
            Field::Strategy => editor.edit_strategy(text.clone()),
            Field::Notes => editor.edit_notes(text.clone()),
        }
    }

    if editor.has_unsaved_changes() {
        editor.flush().await?;
    }
    println!("{}", render_document(editor));
    Ok(())
}
