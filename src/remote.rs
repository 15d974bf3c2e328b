//! Remote tree enumeration over adb

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// One entry of the device-side listing. `path` is mount-point qualified so it
/// compares directly against scan output; `mtime` is whole unix seconds, which
/// is all the device's stat reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub path: PathBuf,
    pub mtime: i64,
}

/// List every entry under `subpath` on the device with its modification time.
///
/// Runs a single find/stat pipeline on the device rather than statting through
/// the fuse mount, which would be one round-trip per file. Any failure is
/// fatal to the run: a listing we cannot trust would turn the deletion pass
/// into a hazard.
pub fn enumerate(mount_dir: &Path, subpath: &Path) -> Result<Vec<RemoteEntry>> {
    let root = Path::new("/").join(subpath);
    let output = Command::new("adb")
        .arg("shell")
        .arg(format!(
            "find {} -print0 | xargs -0 stat -c \"%Y %n\"",
            root.display()
        ))
        .output()
        .context("failed to run adb shell")?;
    if !output.status.success() {
        bail!(
            "remote listing of {} failed: {}",
            root.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let stdout =
        String::from_utf8(output.stdout).context("remote listing is not valid utf-8")?;
    let mut entries = Vec::new();
    for line in stdout.lines() {
        let Some((mtime, path)) = line.split_once(' ') else {
            bail!("malformed remote listing line: {line:?}");
        };
        let mtime: i64 = mtime
            .parse()
            .with_context(|| format!("bad mtime in remote listing line: {line:?}"))?;
        let relative = Path::new(path).strip_prefix("/").unwrap_or(Path::new(path));
        entries.push(RemoteEntry {
            path: mount_dir.join(relative),
            mtime,
        });
    }
    Ok(entries)
}
