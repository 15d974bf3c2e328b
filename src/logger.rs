use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub trait Logger: Send + Sync {
    fn start(&self, _local_root: &Path, _remote_root: &Path) {}
    fn delete(&self, _path: &Path) {}
    fn mkdir(&self, _path: &Path) {}
    fn transfer(&self, _src: &Path, _dst: &Path) {}
    fn error(&self, _context: &str, _path: &Path, _msg: &str) {}
    fn done(&self, _deleted: u64, _dirs: u64, _files: u64, _seconds: f64) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn start(&self, local_root: &Path, remote_root: &Path) {
        self.line(&format!(
            "START local={} remote={}",
            local_root.display(),
            remote_root.display()
        ));
    }
    fn delete(&self, path: &Path) {
        self.line(&format!("DELETE path={}", path.display()));
    }
    fn mkdir(&self, path: &Path) {
        self.line(&format!("MKDIR path={}", path.display()));
    }
    fn transfer(&self, src: &Path, dst: &Path) {
        self.line(&format!("SYNC src={} dst={}", src.display(), dst.display()));
    }
    fn error(&self, context: &str, path: &Path, msg: &str) {
        self.line(&format!("ERROR ctx={} path={} msg={}", context, path.display(), msg));
    }
    fn done(&self, deleted: u64, dirs: u64, files: u64, seconds: f64) {
        self.line(&format!(
            "DONE deleted={deleted} dirs={dirs} files={files} seconds={seconds:.3}"
        ));
    }
}
