//! `kiln version` command implementation.

use miette::Result;

/// Run the version command.
pub fn run(json: bool) -> Result<()> {
    if json {
        let result = serde_json::json!({
            "ok": true,
            "version": kiln_core::VERSION,
        });
        println!("{result}");
    } else {
        println!("{}", kiln_core::version::version_string());
    }
    Ok(())
}
