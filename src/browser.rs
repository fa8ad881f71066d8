use anyhow::{anyhow, Context, Result};
use std::process::{Command, Stdio};

/// Hands `url` to the desktop's default browser and returns immediately.
/// Nothing about the page that opens is checked.
pub fn open_link(url: &str) -> Result<()> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(anyhow!("Refusing to open non-http link: {}", url));
    }

    let (program, args) = opener(url);
    Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to launch '{}' to open {}", program, url))?;

    tracing::debug!(url, program, "opened apply link");
    Ok(())
}

fn opener(url: &str) -> (&'static str, Vec<String>) {
    if cfg!(target_os = "macos") {
        ("open", vec![url.to_string()])
    } else if cfg!(target_os = "windows") {
        ("cmd", vec!["/C".to_string(), "start".to_string(), String::new(), url.to_string()])
    } else {
        ("xdg-open", vec![url.to_string()])
    }
}
