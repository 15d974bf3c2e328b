//! Engine configuration and the fixed names the sync contract is built on

use std::path::{Path, PathBuf};

/// Playlist files are always synced, filter set or not
pub const PLAYLIST_EXT: &str = "m3u";
/// Lossless source extension that triggers transcoding
pub const LOSSLESS_EXT: &str = "flac";
/// Container extension the transcoder writes
pub const LOSSY_EXT: &str = "ogg";
/// Cover-art extensions (matched case-insensitively)
pub const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png"];
/// Player-managed art cache, never synced
pub const ART_CACHE_DIR: &str = ".mediaartlocal";
/// Playlists subtree under the local library root
pub const LOCAL_PLAYLIST_DIR: &str = ".playlists";
/// Where playlists land on the device, relative to the remote music root
pub const REMOTE_PLAYLIST_DIR: &str = "Playlists";
/// Music root on the device, relative to the mount point
pub const REMOTE_MUSIC_SUBPATH: &str = "sdcard/Music";
/// Target bitrate for the opus encoder
pub const OPUS_BITRATE: &str = "70k";

/// Everything the engine needs to know about one sync invocation.
///
/// Built explicitly in main and passed down; nothing in the engine reads
/// process-wide state.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Local library root (e.g. ~/Music)
    pub local_root: PathBuf,
    /// Local playlists subtree, relocated under `Playlists` on the remote side
    pub playlists_root: PathBuf,
    /// Where the device filesystem is mounted
    pub mount_dir: PathBuf,
    /// Remote music root, mount-point qualified
    pub remote_root: PathBuf,
    /// Plan and report, but never touch the device
    pub dry_run: bool,
    /// Also report entries that are already current
    pub verbose: bool,
}

impl SyncConfig {
    pub fn new(local_root: PathBuf, mount_dir: PathBuf) -> Self {
        let playlists_root = local_root.join(LOCAL_PLAYLIST_DIR);
        let remote_root = mount_dir.join(REMOTE_MUSIC_SUBPATH);
        Self {
            local_root,
            playlists_root,
            mount_dir,
            remote_root,
            dry_run: false,
            verbose: false,
        }
    }

    /// Manifest naming the tracks a particular device wants
    pub fn manifest_path(&self, serial: &str) -> PathBuf {
        self.playlists_root.join(format!("Sync to {serial}.{PLAYLIST_EXT}"))
    }

    /// Remote music root relative to the mount point, as the device sees it
    pub fn remote_subpath(&self) -> &Path {
        self.remote_root
            .strip_prefix(&self.mount_dir)
            .expect("remote root is always constructed under the mount dir")
    }
}
