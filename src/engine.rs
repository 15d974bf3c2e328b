//! The sync engine: diff local units against the remote listing, then apply

use anyhow::{Context, Result};
use filetime::FileTime;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::SyncConfig;
use crate::logger::Logger;
use crate::mapper::PathMapper;
use crate::remote::{self, RemoteEntry};
use crate::scan::{FilterMode, Scanner, SyncUnit, TransformKind, UnitKind};
use crate::transform;

/// One mutating step of a sync run, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Delete(PathBuf),
    Mkdir(PathBuf),
    Transfer {
        local: PathBuf,
        remote: PathBuf,
        kind: TransformKind,
    },
}

/// Counts for the end-of-run summary
#[derive(Debug, Default, Clone)]
pub struct SyncStats {
    pub deleted: u64,
    pub dirs_created: u64,
    pub files_synced: u64,
}

/// Orchestrates one run: the local collection is scanned once at construction
/// and diffed against a fresh remote listing on every `sync` call. Nothing is
/// persisted between runs.
pub struct SyncEngine {
    config: SyncConfig,
    local_units: Vec<SyncUnit>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, filter: FilterMode) -> Result<Self> {
        let mapper = PathMapper::new(&config);
        let local_units = Scanner::new(&mapper, &filter)
            .scan(&config.local_root)
            .context("scanning local library")?;
        Ok(Self {
            config,
            local_units,
        })
    }

    pub fn local_units(&self) -> &[SyncUnit] {
        &self.local_units
    }

    /// Decide what a run would do, without touching anything.
    ///
    /// Deletions come first so a remote name can change kind (file to
    /// directory or back) within one run, ordered deepest-first so children
    /// are gone before their parent's rmdir. Creations follow in scan order,
    /// which is pre-order, so every mkdir's parent already exists when its
    /// turn comes.
    pub fn plan(&self, remote: &[RemoteEntry]) -> Result<Vec<Action>> {
        let remote_mtimes: HashMap<&Path, i64> = remote
            .iter()
            .map(|e| (e.path.as_path(), e.mtime))
            .collect();
        let keep: HashSet<&Path> = self
            .local_units
            .iter()
            .map(|u| u.remote_path.as_path())
            .collect();

        let mut doomed: Vec<&Path> = remote_mtimes
            .keys()
            .copied()
            .filter(|p| !keep.contains(p))
            .collect();
        doomed.sort_unstable();
        doomed.reverse();

        let mut actions: Vec<Action> = doomed
            .into_iter()
            .map(|p| Action::Delete(p.to_path_buf()))
            .collect();

        for unit in &self.local_units {
            let remote_mtime = remote_mtimes.get(unit.remote_path.as_path()).copied();
            let stale = match (remote_mtime, unit.kind) {
                (None, _) => true,
                (Some(_), UnitKind::Directory) => false,
                (Some(mtime), UnitKind::File(_)) => local_mtime(&unit.local_path)? > mtime,
            };
            if !stale {
                if self.config.verbose {
                    println!("Skipping {}", unit.remote_path.display());
                }
                continue;
            }
            match unit.kind {
                UnitKind::Directory => actions.push(Action::Mkdir(unit.remote_path.clone())),
                UnitKind::File(kind) => actions.push(Action::Transfer {
                    local: unit.local_path.clone(),
                    remote: unit.remote_path.clone(),
                    kind,
                }),
            }
        }
        Ok(actions)
    }

    /// Apply a plan in order, reporting one line per action. In dry-run mode
    /// the reporting happens and the filesystem does not. The first failure
    /// aborts the run; the tree may be left partially synced.
    pub fn execute(&self, actions: &[Action], logger: &dyn Logger) -> Result<SyncStats> {
        let mut stats = SyncStats::default();
        let dry_run = self.config.dry_run;

        for action in actions {
            match action {
                Action::Delete(path) => {
                    println!("Deleting {}", path.display());
                    logger.delete(path);
                    if !dry_run {
                        remove_remote(path)?;
                    }
                    stats.deleted += 1;
                }
                Action::Mkdir(path) => {
                    println!("Creating directory {}", path.display());
                    logger.mkdir(path);
                    if !dry_run {
                        fs::create_dir(path)
                            .with_context(|| format!("creating {}", path.display()))?;
                    }
                    stats.dirs_created += 1;
                }
                Action::Transfer {
                    local,
                    remote,
                    kind,
                } => {
                    println!("Syncing {}", remote.display());
                    logger.transfer(local, remote);
                    if !dry_run {
                        // Unlink stale content first: the old file may be a
                        // different kind under the same name
                        if remote.exists() {
                            fs::remove_file(remote)
                                .with_context(|| format!("replacing {}", remote.display()))?;
                        }
                        if let Err(e) =
                            transform::convert(*kind, local, remote, &self.config.local_root)
                        {
                            logger.error("convert", remote, &e.to_string());
                            return Err(e);
                        }
                    }
                    stats.files_synced += 1;
                }
            }
        }
        Ok(stats)
    }

    /// One full pass: enumerate the device, plan, apply.
    pub fn sync(&self, logger: &dyn Logger) -> Result<SyncStats> {
        println!("Scanning remote");
        let remote = remote::enumerate(&self.config.mount_dir, self.config.remote_subpath())?;
        let actions = self.plan(&remote)?;
        self.execute(&actions, logger)
    }
}

/// Delete one remote entry; directories are empty by the time their turn
/// comes because the plan orders deletions deepest-first.
fn remove_remote(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir(path).with_context(|| format!("removing directory {}", path.display()))
    } else {
        fs::remove_file(path).with_context(|| format!("removing {}", path.display()))
    }
}

fn local_mtime(path: &Path) -> Result<i64> {
    let meta =
        fs::metadata(path).with_context(|| format!("reading mtime of {}", path.display()))?;
    Ok(FileTime::from_last_modification_time(&meta).unix_seconds())
}
