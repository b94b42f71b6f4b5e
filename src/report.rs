//! Flat-text playlist report.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use rand::{distributions::Alphanumeric, Rng};

use crate::export::Library;

/// Render each playlist as a heading followed by one `track  -  artist` line per track.
pub fn format_report(library: &Library) -> String {
    let mut out = String::new();
    for playlist in &library.playlists {
        let _ = write!(out, "\n{}:\n\n", playlist.name);
        for track in &playlist.tracks {
            let _ = writeln!(out, "\t{}  -  {}", track.name, track.artist);
        }
    }
    out
}

/// Replace `path` with the report, creating parent directories as needed.
///
/// The text goes to a uniquely named sibling file first and is renamed into
/// place, so readers see either the previous report or the complete new one.
pub async fn write_report(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = staging_path(path);
    tokio::fs::write(&tmp, text).await?;
    if let Err(err) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err);
    }

    tracing::info!(path = %path.display(), bytes = text.len(), "report written");
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".into());
    path.with_file_name(format!(".{name}.{suffix}.tmp"))
}
