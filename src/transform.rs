//! Per-file materialization: copy, transcode, playlist rewrite

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use std::process::Command;

use crate::config::{LOSSLESS_EXT, LOSSY_EXT, OPUS_BITRATE};
use crate::mapper::relative_from;
use crate::scan::TransformKind;

/// Materialize one local file at its remote location.
///
/// `local_root` is the library root the playlist rewrite re-roots against.
pub fn convert(
    kind: TransformKind,
    local: &Path,
    remote: &Path,
    local_root: &Path,
) -> Result<()> {
    match kind {
        TransformKind::Copy => {
            fs::copy(local, remote).with_context(|| {
                format!("copying {} to {}", local.display(), remote.display())
            })?;
            Ok(())
        }
        TransformKind::AudioTranscode => transcode(local, remote),
        TransformKind::PlaylistRewrite => rewrite_playlist(local, remote, local_root),
    }
}

/// Shell out to ffmpeg for the lossy encode. Art and video streams are
/// dropped; the encoder overwrites any existing target itself.
fn transcode(local: &Path, remote: &Path) -> Result<()> {
    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(local)
        .args(["-vn", "-c:a", "libopus", "-b:a", OPUS_BITRATE])
        .arg(remote)
        .status()
        .context("failed to run ffmpeg")?;
    if !status.success() {
        bail!("ffmpeg failed on {} ({status})", local.display());
    }
    Ok(())
}

/// Rewrite a playlist for its device-side location.
///
/// Every line is prefixed with the escaped relative path from the playlist's
/// directory back to the music root, and lossless extension references are
/// rewritten to the transcoder's output extension, so entries keep resolving
/// after both the playlist and the tracks have moved.
fn rewrite_playlist(local: &Path, remote: &Path, local_root: &Path) -> Result<()> {
    let parent = local
        .parent()
        .with_context(|| format!("playlist {} has no parent directory", local.display()))?;
    let prefix = escape_entry(&format!(
        "{}/",
        relative_from(local_root, parent).display()
    ));

    let content = fs::read_to_string(local)
        .with_context(|| format!("reading playlist {}", local.display()))?;
    let from = format!(".{LOSSLESS_EXT}");
    let to = format!(".{LOSSY_EXT}");
    let mut rewritten = String::with_capacity(content.len() * 2);
    for line in content.lines() {
        rewritten.push_str(&prefix);
        rewritten.push_str(&line.replace(&from, &to));
        rewritten.push('\n');
    }

    fs::write(remote, rewritten)
        .with_context(|| format!("writing playlist {}", remote.display()))?;
    Ok(())
}

/// Backslash-escape the characters the player treats specially in entries.
fn escape_entry(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() * 2);
    for ch in raw.chars() {
        if matches!(ch, '\\' | '/' | '&') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
