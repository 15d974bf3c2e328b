//! Local-to-remote path mapping

use std::path::{Component, Path, PathBuf};

use crate::config::{SyncConfig, REMOTE_PLAYLIST_DIR};

/// Translates local library paths to their device-side locations.
///
/// The playlists subtree is relocated under `Playlists` on the remote side;
/// everything else keeps its position relative to the library root. This is
/// the only place remote paths are constructed, so scan output and the remote
/// listing stay directly comparable.
#[derive(Debug, Clone)]
pub struct PathMapper {
    local_root: PathBuf,
    playlists_root: PathBuf,
    remote_root: PathBuf,
}

impl PathMapper {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            local_root: config.local_root.clone(),
            playlists_root: config.playlists_root.clone(),
            remote_root: config.remote_root.clone(),
        }
    }

    /// Map a local path to its remote location.
    ///
    /// Panics if `local` is outside the library root; callers only hand over
    /// paths produced by scanning that root.
    pub fn map(&self, local: &Path) -> PathBuf {
        if let Ok(rel) = local.strip_prefix(&self.playlists_root) {
            return self.remote_root.join(REMOTE_PLAYLIST_DIR).join(rel);
        }
        let rel = local
            .strip_prefix(&self.local_root)
            .expect("mapped path lies outside the local library root");
        self.remote_root.join(rel)
    }
}

/// Relative path from `base` to `target`, both absolute, using `..` to climb.
///
/// Returns `.` when the two are equal.
pub fn relative_from(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(t, b)| t == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component);
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;

    fn mapper() -> PathMapper {
        let config = SyncConfig::new("/home/u/Music".into(), "/mnt/phone".into());
        PathMapper::new(&config)
    }

    #[test]
    fn library_paths_keep_their_shape() {
        let m = mapper();
        assert_eq!(
            m.map(Path::new("/home/u/Music/Artist/track.flac")),
            Path::new("/mnt/phone/sdcard/Music/Artist/track.flac")
        );
    }

    #[test]
    fn playlists_are_relocated() {
        let m = mapper();
        assert_eq!(
            m.map(Path::new("/home/u/Music/.playlists/foo.m3u")),
            Path::new("/mnt/phone/sdcard/Music/Playlists/foo.m3u")
        );
    }

    #[test]
    fn nested_playlists_keep_their_subpath() {
        let m = mapper();
        assert_eq!(
            m.map(Path::new("/home/u/Music/.playlists/sub/bar.m3u")),
            Path::new("/mnt/phone/sdcard/Music/Playlists/sub/bar.m3u")
        );
    }

    #[test]
    #[should_panic(expected = "outside the local library root")]
    fn paths_outside_the_root_are_rejected() {
        mapper().map(Path::new("/etc/passwd"));
    }

    #[test]
    fn relative_from_parent() {
        assert_eq!(
            relative_from(Path::new("/home/u/Music"), Path::new("/home/u/Music/.playlists")),
            Path::new("..")
        );
    }

    #[test]
    fn relative_from_self_is_dot() {
        assert_eq!(
            relative_from(Path::new("/home/u/Music"), Path::new("/home/u/Music")),
            Path::new(".")
        );
    }

    #[test]
    fn relative_from_sibling() {
        assert_eq!(
            relative_from(Path::new("/a/b/c"), Path::new("/a/x/y")),
            Path::new("../../b/c")
        );
    }
}
