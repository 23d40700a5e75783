use anyhow::Result;
use stringref_core::services::escape;

/// Print the display form of `text` as it would appear in the reference list.
pub fn escape_command(text: &str, json: bool) -> Result<()> {
    let formatted = escape(text);
    if json {
        println!("{}", serde_json::to_string_pretty(&formatted)?);
    } else {
        println!("{}", formatted.text);
        println!("verbatim: {}", formatted.verbatim);
    }
    Ok(())
}
