//! データディレクトリ上のJSONファイルによる永続化

use civic_report_common::{Error, Persistence};
use std::path::PathBuf;

/// キーごとに `<dir>/<key>.json` を読み書きする
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Persistence for FileStore {
    fn load(&self, key: &str) -> civic_report_common::Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("{}: {}", path.display(), e))),
        }
    }

    fn save(&self, key: &str, value: &str) -> civic_report_common::Result<()> {
        let path = self.path_for(key);
        std::fs::create_dir_all(&self.dir)
            .and_then(|_| std::fs::write(&path, value))
            .map_err(|e| Error::Storage(format!("{}: {}", path.display(), e)))
    }
}
