//! Local tree scanning and sync-unit classification

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{ART_CACHE_DIR, IMAGE_EXTS, LOSSLESS_EXT, LOSSY_EXT, PLAYLIST_EXT};
use crate::mapper::PathMapper;

/// How a file gets materialized on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Byte-for-byte copy
    Copy,
    /// Lossless source, transcoded to opus on the way over
    AudioTranscode,
    /// Playlist whose entries are re-rooted for the device layout
    PlaylistRewrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Directory,
    File(TransformKind),
}

/// One entry of the scan output: a directory that must exist remotely, or a
/// file to materialize. `remote_path` always comes from the [`PathMapper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncUnit {
    pub local_path: PathBuf,
    pub remote_path: PathBuf,
    pub kind: UnitKind,
}

impl SyncUnit {
    fn directory(local_path: PathBuf, remote_path: PathBuf) -> Self {
        Self {
            local_path,
            remote_path,
            kind: UnitKind::Directory,
        }
    }

    fn file(local_path: PathBuf, remote_path: PathBuf, transform: TransformKind) -> Self {
        Self {
            local_path,
            remote_path,
            kind: UnitKind::File(transform),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == UnitKind::Directory
    }
}

/// Which files make it into the sync pass.
///
/// `Manifest` is the per-device allow-list mode; `Everything` syncs the whole
/// library. Playlists are included either way, and in manifest mode cover art
/// rides along even when the manifest doesn't name it.
#[derive(Debug, Clone)]
pub enum FilterMode {
    Everything,
    Manifest(HashSet<PathBuf>),
}

impl FilterMode {
    /// Read an allow-list of library-relative paths, one per line.
    pub fn from_manifest(manifest: &Path, local_root: &Path) -> Result<Self> {
        let text = fs::read_to_string(manifest)
            .with_context(|| format!("reading sync manifest {}", manifest.display()))?;
        let set = text
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| local_root.join(line))
            .collect();
        Ok(Self::Manifest(set))
    }

    fn admits(&self, path: &Path) -> bool {
        match self {
            Self::Everything => true,
            Self::Manifest(set) => set.contains(path),
        }
    }
}

fn is_image(ext: &str) -> bool {
    IMAGE_EXTS.iter().any(|image| ext.eq_ignore_ascii_case(image))
}

/// Depth-first scanner producing the ordered unit stream the engine consumes.
///
/// Each directory's recursive output is buffered before anything is emitted,
/// so a directory that contributes no files simply vanishes: no unit, no
/// remote mkdir, nothing for the deletion pass to spare. Non-empty directories
/// are emitted pre-order (the directory before its contents), which is what
/// lets the engine create directories top-down in a single pass.
pub struct Scanner<'a> {
    mapper: &'a PathMapper,
    filter: &'a FilterMode,
}

impl<'a> Scanner<'a> {
    pub fn new(mapper: &'a PathMapper, filter: &'a FilterMode) -> Self {
        Self { mapper, filter }
    }

    pub fn scan(&self, root: &Path) -> Result<Vec<SyncUnit>> {
        let mut units = Vec::new();
        self.scan_dir(root, &mut units)?;
        Ok(units)
    }

    fn scan_dir(&self, dir: &Path, out: &mut Vec<SyncUnit>) -> Result<()> {
        let mut units = Vec::new();
        // Cover art syncs last within its directory group
        let mut images = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if entry.file_name() == ART_CACHE_DIR {
                    continue;
                }
                self.scan_dir(path, &mut units)?;
            } else if file_type.is_file() {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if ext == PLAYLIST_EXT {
                    units.push(SyncUnit::file(
                        path.to_path_buf(),
                        self.mapper.map(path),
                        TransformKind::PlaylistRewrite,
                    ));
                } else if !self.filter.admits(path) {
                    if is_image(ext) {
                        images.push(SyncUnit::file(
                            path.to_path_buf(),
                            self.mapper.map(path),
                            TransformKind::Copy,
                        ));
                    }
                } else if ext == LOSSLESS_EXT {
                    units.push(SyncUnit::file(
                        path.to_path_buf(),
                        self.mapper.map(path).with_extension(LOSSY_EXT),
                        TransformKind::AudioTranscode,
                    ));
                } else {
                    units.push(SyncUnit::file(
                        path.to_path_buf(),
                        self.mapper.map(path),
                        TransformKind::Copy,
                    ));
                }
            } else {
                bail!("{}: neither file nor directory", path.display());
            }
        }

        if units.is_empty() && images.is_empty() {
            return Ok(());
        }

        out.push(SyncUnit::directory(dir.to_path_buf(), self.mapper.map(dir)));
        out.append(&mut units);
        out.append(&mut images);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use std::fs::File;
    use std::io::Write;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap().write_all(content.as_bytes()).unwrap();
    }

    struct Fixture {
        root: tempfile::TempDir,
        config: SyncConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let config = SyncConfig::new(root.path().to_path_buf(), "/mnt/phone".into());
            Fixture { root, config }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.root.path().join(rel)
        }

        fn scan(&self, filter: &FilterMode) -> Vec<SyncUnit> {
            let mapper = PathMapper::new(&self.config);
            Scanner::new(&mapper, filter)
                .scan(&self.config.local_root)
                .unwrap()
        }
    }

    fn kinds(units: &[SyncUnit]) -> Vec<(PathBuf, UnitKind)> {
        units.iter().map(|u| (u.local_path.clone(), u.kind)).collect()
    }

    #[test]
    fn full_scan_is_preorder_and_classified() {
        let f = Fixture::new();
        touch(&f.path("Artist/Album/track.flac"));
        touch(&f.path("Artist/Album/notes.txt"));
        write(&f.path(".playlists/all.m3u"), "Artist/Album/track.flac\n");

        let units = f.scan(&FilterMode::Everything);
        let got = kinds(&units);
        assert_eq!(
            got,
            vec![
                (f.path(""), UnitKind::Directory),
                (f.path(".playlists"), UnitKind::Directory),
                (
                    f.path(".playlists/all.m3u"),
                    UnitKind::File(TransformKind::PlaylistRewrite)
                ),
                (f.path("Artist"), UnitKind::Directory),
                (f.path("Artist/Album"), UnitKind::Directory),
                (
                    f.path("Artist/Album/notes.txt"),
                    UnitKind::File(TransformKind::Copy)
                ),
                (
                    f.path("Artist/Album/track.flac"),
                    UnitKind::File(TransformKind::AudioTranscode)
                ),
            ]
        );
    }

    #[test]
    fn transcoded_files_get_the_lossy_extension_remotely() {
        let f = Fixture::new();
        touch(&f.path("Artist/track.flac"));

        let units = f.scan(&FilterMode::Everything);
        let track = units
            .iter()
            .find(|u| u.kind == UnitKind::File(TransformKind::AudioTranscode))
            .unwrap();
        assert_eq!(
            track.remote_path,
            Path::new("/mnt/phone/sdcard/Music/Artist/track.ogg")
        );
    }

    #[test]
    fn art_cache_directories_are_skipped() {
        let f = Fixture::new();
        touch(&f.path("Artist/.mediaartlocal/cover.jpg"));
        touch(&f.path("Artist/track.mp3"));

        let units = f.scan(&FilterMode::Everything);
        assert!(units.iter().all(|u| !u.local_path.ends_with("cover.jpg")));
        assert!(units.iter().any(|u| u.local_path.ends_with("track.mp3")));
    }

    #[test]
    fn empty_directories_vanish() {
        let f = Fixture::new();
        fs::create_dir_all(f.path("Empty/Nested")).unwrap();
        touch(&f.path("Artist/track.mp3"));

        let units = f.scan(&FilterMode::Everything);
        assert!(units.iter().all(|u| !u.local_path.starts_with(f.path("Empty"))));
    }

    #[test]
    fn excluded_only_directories_vanish() {
        let f = Fixture::new();
        touch(&f.path("Unwanted/demo.mp3"));
        touch(&f.path("Artist/track.mp3"));
        let filter = FilterMode::Manifest([f.path("Artist/track.mp3")].into_iter().collect());

        let units = f.scan(&filter);
        assert!(units.iter().all(|u| !u.local_path.starts_with(f.path("Unwanted"))));
        assert!(units.iter().any(|u| u.local_path == f.path("Artist/track.mp3")));
    }

    #[test]
    fn playlists_bypass_the_filter() {
        let f = Fixture::new();
        write(&f.path(".playlists/road trip.m3u"), "Artist/track.mp3\n");
        touch(&f.path("Artist/track.mp3"));
        let filter = FilterMode::Manifest([f.path("Artist/track.mp3")].into_iter().collect());

        let units = f.scan(&filter);
        assert!(units
            .iter()
            .any(|u| u.kind == UnitKind::File(TransformKind::PlaylistRewrite)));
    }

    #[test]
    fn unlisted_images_sync_last_in_their_directory() {
        let f = Fixture::new();
        touch(&f.path("Artist/cover.JPG"));
        touch(&f.path("Artist/track.mp3"));
        touch(&f.path("Artist/z-track.mp3"));
        let filter = FilterMode::Manifest(
            [f.path("Artist/track.mp3"), f.path("Artist/z-track.mp3")]
                .into_iter()
                .collect(),
        );

        let units = f.scan(&filter);
        let last = units.last().unwrap();
        assert_eq!(last.local_path, f.path("Artist/cover.JPG"));
        assert_eq!(last.kind, UnitKind::File(TransformKind::Copy));
    }

    #[test]
    fn deferred_images_keep_their_directory_alive() {
        let f = Fixture::new();
        touch(&f.path("Artist/cover.png"));
        let filter = FilterMode::Manifest(HashSet::new());

        let units = f.scan(&filter);
        assert_eq!(
            kinds(&units),
            vec![
                (f.path(""), UnitKind::Directory),
                (f.path("Artist"), UnitKind::Directory),
                (f.path("Artist/cover.png"), UnitKind::File(TransformKind::Copy)),
            ]
        );
    }

    #[test]
    fn unlisted_non_media_files_are_dropped() {
        let f = Fixture::new();
        touch(&f.path("Artist/track.mp3"));
        touch(&f.path("Artist/liner-notes.pdf"));
        let filter = FilterMode::Manifest([f.path("Artist/track.mp3")].into_iter().collect());

        let units = f.scan(&filter);
        assert!(units.iter().all(|u| !u.local_path.ends_with("liner-notes.pdf")));
    }

    #[test]
    fn manifest_lines_resolve_under_the_library_root() {
        let f = Fixture::new();
        write(
            &f.path(".playlists/Sync to PHONE01.m3u"),
            "Artist/track.mp3\n\nArtist/other.mp3\n",
        );

        let filter = FilterMode::from_manifest(
            &f.path(".playlists/Sync to PHONE01.m3u"),
            &f.config.local_root,
        )
        .unwrap();
        match filter {
            FilterMode::Manifest(set) => {
                assert_eq!(set.len(), 2);
                assert!(set.contains(&f.path("Artist/track.mp3")));
                assert!(set.contains(&f.path("Artist/other.mp3")));
            }
            FilterMode::Everything => panic!("expected manifest mode"),
        }
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let f = Fixture::new();
        let err = FilterMode::from_manifest(&f.path("no-such.m3u"), &f.config.local_root);
        assert!(err.is_err());
    }
}
