//! Screenshot artifacts.

use std::path::{Path, PathBuf};

use crate::driver::Surface;
use crate::result::StorefrontResult;

/// Make a string safe to use as a file name.
///
/// Reserved characters and whitespace become `_`, runs of `_` collapse,
/// leading and trailing `_` are dropped and the result is lowercased.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            ':' | '<' | '>' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed.trim_matches('_').to_lowercase()
}

/// File name for a screenshot: `<sanitized name>_<unix millis>.png`
#[must_use]
pub fn screenshot_file_name(name: &str, taken_at: chrono::DateTime<chrono::Local>) -> String {
    let safe = sanitize_file_name(name);
    let safe = if safe.is_empty() {
        "screenshot".to_string()
    } else {
        safe
    };
    format!("{safe}_{}.png", taken_at.timestamp_millis())
}

/// Capture the surface and write the PNG under `dir`, creating it if needed.
///
/// Returns the path of the written file.
pub async fn save_screenshot(
    surface: &Surface,
    name: &str,
    dir: impl AsRef<Path>,
) -> StorefrontResult<PathBuf> {
    let screenshot = surface.driver().screenshot().await?;
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(screenshot_file_name(name, screenshot.taken_at));
    tokio::fs::write(&path, &screenshot.data).await?;
    tracing::info!(path = %path.display(), bytes = screenshot.size_bytes(), "saved screenshot");
    Ok(path)
}
