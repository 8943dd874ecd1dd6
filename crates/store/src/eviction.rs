//! Content-addressed overflow store for oversized tool outputs.
//!
//! Layout: `<root>/<thread_id>/<sha256(content)[:16]>.bin`, raw bytes of
//! the original output. Files are write-once: identical content maps to
//! the identical path, so no two writers ever race on different data.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use wd_domain::error::{Error, Result};

const POINTER_SCHEME: &str = "evict://";
const HASH_PREFIX_LEN: usize = 16;

pub struct EvictionStore {
    root: PathBuf,
}

impl EvictionStore {
    pub fn new(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root).map_err(Error::Io)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Persist `content` for `thread_id` and return its pointer
    /// (`evict://<thread_id>/<hash>`).
    pub fn save(&self, thread_id: &str, content: &str) -> Result<String> {
        crate::validate_id(thread_id)?;

        let hash = content_hash(content);
        let dir = self.root.join(thread_id);
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;

        let path = self.contained_path(&dir, &hash)?;
        if !path.exists() {
            write_atomic(&path, content.as_bytes())?;
        }

        tracing::debug!(
            thread_id,
            bytes = content.len(),
            path = %path.display(),
            "output evicted"
        );
        Ok(format!("{POINTER_SCHEME}{thread_id}/{hash}"))
    }

    /// Load the content a pointer refers to.
    pub fn load(&self, pointer: &str) -> Result<String> {
        let (thread_id, hash) = parse_pointer(pointer)?;
        crate::validate_id(thread_id)?;
        if hash.len() != HASH_PREFIX_LEN
            || !hash.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
        {
            return Err(Error::PathEscape(format!(
                "malformed content hash in pointer '{pointer}'"
            )));
        }

        let dir = self.root.join(thread_id);
        let path = self.contained_path(&dir, hash)?;
        std::fs::read_to_string(&path).map_err(Error::Io)
    }

    /// Remove every evicted output belonging to a thread.
    pub fn delete_thread(&self, thread_id: &str) -> Result<()> {
        crate::validate_id(thread_id)?;
        let dir = self.root.join(thread_id);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(Error::Io)?;
        }
        Ok(())
    }

    /// Build `<dir>/<hash>.bin` and verify the resolved form stays under
    /// the store root.
    fn contained_path(&self, dir: &Path, hash: &str) -> Result<PathBuf> {
        let canonical_root = self.root.canonicalize().map_err(Error::Io)?;
        let canonical_dir = match dir.canonicalize() {
            Ok(d) => d,
            // Load against a thread that never evicted anything.
            Err(_) => canonical_root.join(
                dir.file_name()
                    .ok_or_else(|| Error::PathEscape("empty thread directory".into()))?,
            ),
        };
        if !canonical_dir.starts_with(&canonical_root) {
            return Err(Error::PathEscape(format!(
                "'{}' resolves outside eviction root '{}'",
                dir.display(),
                canonical_root.display()
            )));
        }
        Ok(canonical_dir.join(format!("{hash}.bin")))
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())[..HASH_PREFIX_LEN].to_owned()
}

fn parse_pointer(pointer: &str) -> Result<(&str, &str)> {
    let rest = pointer
        .strip_prefix(POINTER_SCHEME)
        .ok_or_else(|| Error::Other(format!("not an eviction pointer: '{pointer}'")))?;
    rest.split_once('/')
        .ok_or_else(|| Error::Other(format!("malformed eviction pointer: '{pointer}'")))
}

/// Write to a temp sibling, sync, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_name = format!(
        ".{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        uuid::Uuid::new_v4().as_simple()
    );
    let tmp_path = path.with_file_name(tmp_name);

    {
        use std::io::Write;
        let mut file = std::fs::File::create(&tmp_path).map_err(Error::Io)?;
        file.write_all(bytes).map_err(Error::Io)?;
        file.sync_data().map_err(Error::Io)?;
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        Error::Io(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> EvictionStore {
        EvictionStore::new(&dir.path().join("evictions")).unwrap()
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let pointer = store.save("t1", "oversized output").unwrap();
        assert!(pointer.starts_with("evict://t1/"));
        assert_eq!(store.load(&pointer).unwrap(), "oversized output");
    }

    #[test]
    fn layout_is_thread_dir_and_hash_bin() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let pointer = store.save("t1", "content").unwrap();
        let hash = pointer.rsplit('/').next().unwrap();
        assert_eq!(hash.len(), 16);

        let file = dir.path().join("evictions").join("t1").join(format!("{hash}.bin"));
        assert!(file.exists());
        assert_eq!(std::fs::read_to_string(file).unwrap(), "content");
    }

    #[test]
    fn identical_content_is_stored_once() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let p1 = store.save("t1", "same").unwrap();
        let p2 = store.save("t1", "same").unwrap();
        assert_eq!(p1, p2);

        let entries = std::fs::read_dir(dir.path().join("evictions").join("t1"))
            .unwrap()
            .count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn different_threads_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let p1 = store.save("t1", "shared content").unwrap();
        let p2 = store.save("t2", "shared content").unwrap();
        assert_ne!(p1, p2);
        assert_eq!(store.load(&p1).unwrap(), "shared content");
        assert_eq!(store.load(&p2).unwrap(), "shared content");
    }

    #[test]
    fn hostile_thread_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let err = store.save("../outside", "x").unwrap_err();
        assert!(matches!(err, Error::PathEscape(_)));
    }

    #[test]
    fn hostile_pointer_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save("t1", "x").unwrap();

        for bad in [
            "evict://../t1/0123456789abcdef",
            "evict://t1/../../secret",
            "file:///etc/passwd",
            "evict://t1/0123456789ABCDEF",
        ] {
            assert!(store.load(bad).is_err(), "accepted: {bad}");
        }
    }

    #[test]
    fn delete_thread_removes_all_content() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let pointer = store.save("t1", "bye").unwrap();
        store.delete_thread("t1").unwrap();
        assert!(store.load(&pointer).is_err());
    }
}
