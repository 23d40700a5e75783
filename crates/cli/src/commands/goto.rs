use anyhow::{anyhow, Result};
use serde::Serialize;
use stringref_core::services::{DebugInfoCodeView, PlainRenderer};

use super::util::{run_search, ReferenceRow, SearchArgs};

/// Which visible reference to follow.
#[derive(Debug, Clone)]
pub enum GotoTarget {
    /// Zero-based position in the visible list.
    Position(usize),
    /// First visible reference whose raw literal equals the text.
    Literal(String),
}

#[derive(Debug, Serialize)]
struct GotoReport {
    reference: ReferenceRow,
    moved: bool,
    position: Option<String>,
    tabs: usize,
}

/// Select a reference and follow it into the debug-info code view.
pub fn goto_command(
    args: &SearchArgs,
    target: &GotoTarget,
    new_tab: bool,
    json: bool,
) -> Result<()> {
    let (config, mut service) = run_search(args)?;
    let position = match target {
        GotoTarget::Position(position) => *position,
        GotoTarget::Literal(text) => service
            .visible()
            .position(|reference| reference.literal() == text.as_str())
            .ok_or_else(|| anyhow!("No string reference matches literal '{}'", text))?,
    };
    if service.select(position).is_none() {
        return Err(anyhow!(
            "No string reference at position {} ({} visible)",
            position,
            service.index().visible_len()
        ));
    }

    let view = DebugInfoCodeView::new();
    let moved = service.follow_selected(new_tab || config.new_tab, &view);
    let reference = match service.current_reference() {
        Some(reference) => ReferenceRow::new(reference, &PlainRenderer),
        None => return Err(anyhow!("Selection was lost before navigation")),
    };
    let caret = view.caret().filter(|_| moved).map(|pos| pos.to_string());

    if json {
        let report = GotoReport { reference, moved, position: caret, tabs: view.tab_count() };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match caret {
        Some(pos) => println!("Navigated to {} {}", pos, reference.location()),
        None => println!("Opened {} (no source position)", reference.location()),
    }
    Ok(())
}
