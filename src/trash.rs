//! Soft delete for notes.
//!
//! A trashed note keeps its file name under `.trash/`, next to a
//! `<name>.meta.json` sidecar holding `{ "deletedAt": <epoch-ms> }`. The
//! sidecar is advisory: when it is missing or unreadable the content file's
//! modification time stands in for the deletion time.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::models::{NoteKey, NoteRecord, TrashEntry, TrashMeta};
use crate::paths::NotePaths;
use crate::repository::{modified_millis, note_files_in};

/// Reserved suffix of sidecar files.
pub const SIDECAR_SUFFIX: &str = ".meta.json";
/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
const DAY_MS: i64 = 86_400_000;

/// Sidecar location for a trashed content file.
pub fn sidecar_path(content_path: &Path) -> PathBuf {
    let mut name = content_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(SIDECAR_SUFFIX);
    content_path.with_file_name(name)
}

/// Outcome of a purge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub purged: Vec<NoteKey>,
    /// Entries that were due but could not be removed.
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct TrashManager {
    paths: NotePaths,
}

impl TrashManager {
    pub fn new(paths: NotePaths) -> Self {
        Self { paths }
    }

    /// Moves an active note into the trash, replacing any earlier trash
    /// entry of the same name, and records the deletion time.
    pub fn trash(&self, key: &NoteKey) -> Result<()> {
        self.trash_at(key, Utc::now().timestamp_millis())
    }

    pub(crate) fn trash_at(&self, key: &NoteKey, deleted_at: i64) -> Result<()> {
        self.trash_with(key, deleted_at, write_sidecar)
    }

    fn trash_with<W>(&self, key: &NoteKey, deleted_at: i64, write_meta: W) -> Result<()>
    where
        W: FnOnce(&Path, i64) -> Result<()>,
    {
        let from = self.paths.note_path(key)?;
        let to = self.paths.trashed_path(key)?;
        self.paths.ensure_trash()?;

        fs::rename(&from, &to).map_err(|e| StoreError::io(&from, e))?;
        info!("Moved {} to trash", from.display());

        // A sidecar left by an earlier entry of the same name must not
        // outlive the content it described.
        let sidecar = sidecar_path(&to);
        match fs::remove_file(&sidecar) {
            Ok(()) => debug!("Removed stale trash metadata {}", sidecar.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove stale trash metadata {}: {}", sidecar.display(), e),
        }

        // The entry is already in the trash; without a sidecar it falls
        // back to its mtime.
        if let Err(err) = write_meta(&to, deleted_at) {
            warn!("Failed to write trash metadata for {}: {}", to.display(), err);
        }
        Ok(())
    }

    /// Every trashed note, unsorted.
    pub fn list(&self) -> Result<Vec<TrashEntry>> {
        self.paths.ensure_trash()?;

        let mut entries = Vec::new();
        // Sidecars never carry a note extension, so only content files match.
        for key in note_files_in(self.paths.trash_dir())? {
            let path = self.paths.trash_dir().join(key.file_name());
            let last_edit_time = match modified_millis(&path) {
                Ok(mtime) => mtime,
                Err(err) => {
                    warn!("Skipping trash entry {}: {}", path.display(), err);
                    continue;
                }
            };
            let deleted_at = read_sidecar(&path).unwrap_or(last_edit_time);
            entries.push(TrashEntry {
                note: NoteRecord {
                    title: key.title,
                    ext: key.ext,
                    last_edit_time,
                },
                deleted_at,
            });
        }
        Ok(entries)
    }

    /// Moves a trashed note back into the root.
    ///
    /// Fails with `Collision` if an active note already has that name; the
    /// entry then stays in the trash untouched.
    pub fn restore(&self, key: &NoteKey) -> Result<()> {
        let from = self.paths.trashed_path(key)?;
        let to = self.paths.note_path(key)?;

        if !from.try_exists().map_err(|e| StoreError::io(&from, e))? {
            return Err(StoreError::NotFound { path: from });
        }
        self.paths.ensure_root()?;
        if to.try_exists().map_err(|e| StoreError::io(&to, e))? {
            return Err(StoreError::Collision { path: to });
        }

        fs::rename(&from, &to).map_err(|e| StoreError::io(&from, e))?;
        info!("Restored {} from trash", to.display());

        if let Err(err) = fs::remove_file(sidecar_path(&from)) {
            debug!("Could not remove trash metadata for {}: {}", from.display(), err);
        }
        Ok(())
    }

    /// Deletes every trash entry and sidecar, leaving an empty trash
    /// directory behind.
    pub fn empty(&self) -> Result<()> {
        let trash_dir = self.paths.trash_dir();
        match fs::remove_dir_all(trash_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(trash_dir, e)),
        }
        self.paths.ensure_trash()?;
        info!("Emptied trash");
        Ok(())
    }

    /// Permanently removes entries deleted more than `retention_days` ago.
    pub fn purge_expired(&self, retention_days: u32) -> Result<PurgeReport> {
        self.purge_expired_at(retention_days, Utc::now().timestamp_millis())
    }

    /// Purge relative to a given clock reading. Each entry is handled on its
    /// own; a failure on one does not stop the others.
    pub fn purge_expired_at(&self, retention_days: u32, now: i64) -> Result<PurgeReport> {
        let retention_ms = i64::from(retention_days) * DAY_MS;
        let mut report = PurgeReport::default();

        for entry in self.list()? {
            if now.saturating_sub(entry.deleted_at) <= retention_ms {
                continue;
            }
            let key = entry.note.key();
            match self.purge_entry(&key) {
                Ok(()) => {
                    info!("Purged {} from trash", key.file_name());
                    report.purged.push(key);
                }
                Err(err) => {
                    warn!("Failed to purge {}: {}", key.file_name(), err);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    fn purge_entry(&self, key: &NoteKey) -> Result<()> {
        let path = self.paths.trash_dir().join(key.file_name());
        fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;

        let sidecar = sidecar_path(&path);
        match fs::remove_file(&sidecar) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(sidecar, e)),
        }
    }
}

fn write_sidecar(content_path: &Path, deleted_at: i64) -> Result<()> {
    let sidecar = sidecar_path(content_path);
    let json = serde_json::to_string(&TrashMeta { deleted_at })?;
    fs::write(&sidecar, json).map_err(|e| StoreError::io(sidecar, e))
}

fn read_sidecar(content_path: &Path) -> Option<i64> {
    let sidecar = sidecar_path(content_path);
    let raw = fs::read_to_string(&sidecar).ok()?;
    match serde_json::from_str::<TrashMeta>(&raw) {
        Ok(meta) => Some(meta.deleted_at),
        Err(err) => {
            debug!("Ignoring unreadable trash metadata {}: {}", sidecar.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteExt;
    use crate::repository::NoteRepository;
    use std::fs::File;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _tmp: TempDir,
        repo: NoteRepository,
        trash: TrashManager,
    }

    fn fixture() -> Fixture {
        let tmp = tempdir().unwrap();
        let paths = NotePaths::new_with_root(tmp.path().join("JotPad"));
        paths.ensure_root().unwrap();
        Fixture {
            _tmp: tmp,
            repo: NoteRepository::new(paths.clone()),
            trash: TrashManager::new(paths),
        }
    }

    fn md(title: &str) -> NoteKey {
        NoteKey::new(title, NoteExt::Markdown)
    }

    fn set_mtime(path: &Path, epoch_ms: i64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_millis(epoch_ms as u64))
            .unwrap();
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/n/.trash/A.md")),
            PathBuf::from("/n/.trash/A.md.meta.json")
        );
    }

    #[test]
    fn test_trash_moves_file_and_writes_sidecar() {
        let f = fixture();
        f.repo.write(&md("A"), "alpha").unwrap();
        let before = Utc::now().timestamp_millis();

        f.trash.trash(&md("A")).unwrap();

        let trashed = f.trash.paths.trash_dir().join("A.md");
        assert!(!f.repo.paths().root_dir().join("A.md").exists());
        assert_eq!(fs::read_to_string(&trashed).unwrap(), "alpha");

        let meta: TrashMeta =
            serde_json::from_str(&fs::read_to_string(sidecar_path(&trashed)).unwrap()).unwrap();
        assert!(meta.deleted_at >= before);
        assert!(meta.deleted_at <= Utc::now().timestamp_millis());
    }

    #[test]
    fn test_trash_missing_note_fails() {
        let f = fixture();
        let err = f.trash.trash(&md("ghost")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_trash_clobbers_previous_entry() {
        let f = fixture();
        f.repo.write(&md("A"), "first").unwrap();
        f.trash.trash_at(&md("A"), 1_000).unwrap();
        f.repo.write(&md("A"), "second").unwrap();
        f.trash.trash_at(&md("A"), 2_000).unwrap();

        let entries = f.trash.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].deleted_at, 2_000);
        assert_eq!(
            fs::read_to_string(f.trash.paths.trash_dir().join("A.md")).unwrap(),
            "second"
        );
    }

    #[test]
    fn test_sidecar_write_failure_still_trashes() {
        let f = fixture();
        f.repo.write(&md("A"), "alpha").unwrap();
        f.repo.paths().ensure_trash().unwrap();
        let trashed = f.trash.paths.trash_dir().join("A.md");
        fs::create_dir(sidecar_path(&trashed)).unwrap();

        f.trash.trash(&md("A")).unwrap();

        let entries = f.trash.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].note.key(), md("A"));
        assert_eq!(entries[0].deleted_at, modified_millis(&trashed).unwrap());
        assert_eq!(fs::read_to_string(&trashed).unwrap(), "alpha");
    }

    #[test]
    fn test_retrash_drops_stale_sidecar_when_write_fails() {
        let f = fixture();
        let now = 1_700_000_000_000;
        f.repo.write(&md("A"), "first").unwrap();
        f.trash.trash_at(&md("A"), 0).unwrap();
        f.repo.write(&md("A"), "second").unwrap();

        f.trash
            .trash_with(&md("A"), now, |_, _| Err(StoreError::Host("disk full".into())))
            .unwrap();

        let trashed = f.trash.paths.trash_dir().join("A.md");
        assert!(!sidecar_path(&trashed).exists());
        let entries = f.trash.list().unwrap();
        assert_eq!(entries[0].deleted_at, modified_millis(&trashed).unwrap());
        assert!(f.trash.purge_expired_at(30, now).unwrap().purged.is_empty());
    }

    #[test]
    fn test_list_excludes_sidecars() {
        let f = fixture();
        f.repo.write(&md("A"), "a").unwrap();
        f.repo.write(&NoteKey::new("B", NoteExt::Text), "b").unwrap();
        f.trash.trash_at(&md("A"), 10).unwrap();
        f.trash.trash_at(&NoteKey::new("B", NoteExt::Text), 20).unwrap();

        let mut entries = f.trash.list().unwrap();
        entries.sort_by_key(|e| e.deleted_at);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].note.key(), md("A"));
        assert_eq!(entries[1].note.key(), NoteKey::new("B", NoteExt::Text));
        assert_eq!(entries[1].deleted_at, 20);
    }

    #[test]
    fn test_list_falls_back_to_mtime() {
        let f = fixture();
        f.repo.write(&md("A"), "a").unwrap();
        f.trash.trash(&md("A")).unwrap();

        let trashed = f.trash.paths.trash_dir().join("A.md");
        fs::remove_file(sidecar_path(&trashed)).unwrap();
        set_mtime(&trashed, 1_600_000_000_123);

        let entries = f.trash.list().unwrap();
        assert_eq!(entries[0].deleted_at, 1_600_000_000_123);
        assert_eq!(entries[0].note.last_edit_time, 1_600_000_000_123);
    }

    #[test]
    fn test_list_tolerates_malformed_sidecar() {
        let f = fixture();
        f.repo.write(&md("A"), "a").unwrap();
        f.trash.trash(&md("A")).unwrap();

        let trashed = f.trash.paths.trash_dir().join("A.md");
        fs::write(sidecar_path(&trashed), "{ not json").unwrap();
        set_mtime(&trashed, 1_500_000_000_000);

        assert_eq!(f.trash.list().unwrap()[0].deleted_at, 1_500_000_000_000);

        fs::write(sidecar_path(&trashed), r#"{"other": 1}"#).unwrap();
        assert_eq!(f.trash.list().unwrap()[0].deleted_at, 1_500_000_000_000);
    }

    #[test]
    fn test_list_creates_trash_dir() {
        let f = fixture();
        assert!(f.trash.list().unwrap().is_empty());
        assert!(f.trash.paths.trash_dir().is_dir());
    }

    #[test]
    fn test_round_trip_restores_identical_note() {
        let f = fixture();
        let content = "# Title\n\nbody with unicode: café ✓\n";
        f.repo.write(&md("Round"), content).unwrap();

        f.trash.trash(&md("Round")).unwrap();
        f.trash.restore(&md("Round")).unwrap();

        assert_eq!(f.repo.read(&md("Round")).unwrap(), content);
        assert!(f.trash.list().unwrap().is_empty());
        assert!(!sidecar_path(&f.trash.paths.trash_dir().join("Round.md")).exists());
    }

    #[test]
    fn test_restore_collision_keeps_both() {
        let f = fixture();
        f.repo.write(&md("A"), "old").unwrap();
        f.trash.trash(&md("A")).unwrap();
        f.repo.write(&md("A"), "new").unwrap();

        let err = f.trash.restore(&md("A")).unwrap_err();
        assert!(matches!(err, StoreError::Collision { .. }));
        assert_eq!(f.repo.read(&md("A")).unwrap(), "new");

        let entries = f.trash.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            fs::read_to_string(f.trash.paths.trash_dir().join("A.md")).unwrap(),
            "old"
        );
        assert!(sidecar_path(&f.trash.paths.trash_dir().join("A.md")).exists());
    }

    #[test]
    fn test_restore_without_sidecar() {
        let f = fixture();
        f.repo.write(&md("A"), "a").unwrap();
        f.trash.trash(&md("A")).unwrap();
        fs::remove_file(sidecar_path(&f.trash.paths.trash_dir().join("A.md"))).unwrap();

        f.trash.restore(&md("A")).unwrap();
        assert_eq!(f.repo.read(&md("A")).unwrap(), "a");
    }

    #[test]
    fn test_restore_missing_entry() {
        let f = fixture();
        let err = f.trash.restore(&md("ghost")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_empty_twice() {
        let f = fixture();
        f.repo.write(&md("A"), "a").unwrap();
        f.trash.trash(&md("A")).unwrap();

        f.trash.empty().unwrap();
        f.trash.empty().unwrap();

        assert!(f.trash.paths.trash_dir().is_dir());
        assert_eq!(fs::read_dir(f.trash.paths.trash_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_without_trash_dir() {
        let f = fixture();
        f.trash.empty().unwrap();
        assert!(f.trash.paths.trash_dir().is_dir());
    }

    #[test]
    fn test_purge_boundary() {
        let f = fixture();
        let now = 1_700_000_000_000;
        let window = 30 * DAY_MS;
        f.repo.write(&md("Expired"), "x").unwrap();
        f.repo.write(&md("Kept"), "y").unwrap();
        f.trash.trash_at(&md("Expired"), now - window - 1).unwrap();
        f.trash.trash_at(&md("Kept"), now - window + 1).unwrap();

        let report = f.trash.purge_expired_at(DEFAULT_RETENTION_DAYS, now).unwrap();

        assert_eq!(report.purged, vec![md("Expired")]);
        assert_eq!(report.failed, 0);
        let remaining = f.trash.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].note.key(), md("Kept"));
        let expired = f.trash.paths.trash_dir().join("Expired.md");
        assert!(!expired.exists());
        assert!(!sidecar_path(&expired).exists());
    }

    #[test]
    fn test_purge_exactly_at_window_is_retained() {
        let f = fixture();
        let now = 1_700_000_000_000;
        f.repo.write(&md("Edge"), "x").unwrap();
        f.trash.trash_at(&md("Edge"), now - 30 * DAY_MS).unwrap();

        let report = f.trash.purge_expired_at(30, now).unwrap();
        assert!(report.purged.is_empty());
    }

    #[test]
    fn test_purge_uses_mtime_fallback() {
        let f = fixture();
        let now = Utc::now().timestamp_millis();
        f.repo.write(&md("Orphan"), "x").unwrap();
        f.trash.trash(&md("Orphan")).unwrap();

        let trashed = f.trash.paths.trash_dir().join("Orphan.md");
        fs::remove_file(sidecar_path(&trashed)).unwrap();
        set_mtime(&trashed, now - 31 * DAY_MS);

        let report = f.trash.purge_expired_at(30, now).unwrap();
        assert_eq!(report.purged, vec![md("Orphan")]);
        assert!(!trashed.exists());
    }

    #[test]
    fn test_purge_survives_extreme_sidecar() {
        let f = fixture();
        let now = 1_700_000_000_000;
        f.repo.write(&md("Corrupt"), "x").unwrap();
        f.repo.write(&md("Expired"), "y").unwrap();
        f.trash.trash_at(&md("Corrupt"), i64::MIN).unwrap();
        f.trash.trash_at(&md("Expired"), 0).unwrap();

        let mut report = f.trash.purge_expired_at(30, now).unwrap();
        report.purged.sort_by(|a, b| a.title.cmp(&b.title));

        assert_eq!(report.purged, vec![md("Corrupt"), md("Expired")]);
        assert_eq!(report.failed, 0);
        assert!(f.trash.list().unwrap().is_empty());
    }

    #[test]
    fn test_purge_custom_retention() {
        let f = fixture();
        let now = 1_700_000_000_000;
        f.repo.write(&md("Week"), "x").unwrap();
        f.trash.trash_at(&md("Week"), now - 8 * DAY_MS).unwrap();

        assert!(f.trash.purge_expired_at(30, now).unwrap().purged.is_empty());
        assert_eq!(f.trash.purge_expired_at(7, now).unwrap().purged.len(), 1);
    }
}
