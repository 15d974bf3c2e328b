//! Device discovery and fuse mount lifecycle

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Serial of the connected device, per `adb get-serialno`.
pub fn device_serial() -> Result<String> {
    let output = Command::new("adb")
        .arg("get-serialno")
        .output()
        .context("failed to run adb get-serialno")?;
    if !output.status.success() {
        bail!("adb get-serialno failed ({})", output.status);
    }
    let stdout = String::from_utf8(output.stdout).context("adb serial is not valid utf-8")?;
    let serial = stdout.trim();
    // Network serials carry a :port suffix that never shows up in manifests
    let serial = serial.split(':').next().unwrap_or(serial);
    if serial.is_empty() {
        bail!("adb reported an empty serial");
    }
    Ok(serial.to_string())
}

/// The device filesystem, mounted for the lifetime of this guard.
///
/// Mounts via adbfs into a fresh temp directory; dropping the guard unmounts
/// and removes the mount point. An unmount failure is reported but not
/// propagated, since by then the run's result is already decided.
pub struct MountedDevice {
    dir: TempDir,
}

impl MountedDevice {
    pub fn mount() -> Result<Self> {
        let dir = tempfile::tempdir().context("creating mount point")?;
        println!("Mounting phone");
        let status = Command::new("adbfs")
            .arg(dir.path())
            .status()
            .context("failed to run adbfs")?;
        if !status.success() {
            bail!("adbfs failed to mount ({status})");
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for MountedDevice {
    fn drop(&mut self) {
        println!("Unmounting phone");
        match Command::new("fusermount").arg("-u").arg(self.dir.path()).status() {
            Ok(status) if status.success() => {}
            Ok(status) => eprintln!("fusermount -u failed ({status})"),
            Err(e) => eprintln!("failed to run fusermount: {e}"),
        }
    }
}
