use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use tracing::warn;

use crate::error::CollaboratorError;
use crate::host::{ProgressKind, ProgressReporter};
use crate::store::schema::{ProgressCounters, ProgressData, SessionRecord};

const PROGRESS_FILE: &str = "progress.json";

/// Persisted learning-progress counters. Every report is written through
/// immediately so a crash never loses a completed round.
pub struct ProgressStore {
    base_dir: PathBuf,
    data: ProgressData,
}

impl ProgressStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("poptap");
        Self::with_base_dir(base_dir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        let mut store = Self {
            base_dir,
            data: ProgressData::default(),
        };
        store.data = store.load();
        Ok(store)
    }

    fn file_path(&self) -> PathBuf {
        self.base_dir.join(PROGRESS_FILE)
    }

    pub fn data(&self) -> &ProgressData {
        &self.data
    }

    /// Missing, unreadable or stale-schema files all start from a fresh profile.
    pub fn load(&self) -> ProgressData {
        let path = self.file_path();
        if !path.exists() {
            return ProgressData::default();
        }
        let parsed = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<ProgressData>(&content).ok());
        match parsed {
            Some(data) if !data.needs_reset() => data,
            _ => {
                warn!(path = %path.display(), "progress file unusable, starting fresh");
                ProgressData::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = self.file_path();
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(&self.data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn increment(&mut self, kind: ProgressKind) -> Result<()> {
        self.data.counters.increment(kind);
        self.data.last_played = Some(Utc::now());
        self.save()
    }

    pub fn record_session(&mut self, record: SessionRecord) -> Result<()> {
        self.data.push_session(record);
        self.save()
    }
}

impl ProgressReporter for ProgressStore {
    fn report_progress(&mut self, kind: ProgressKind) -> Result<(), CollaboratorError> {
        self.increment(kind).map_err(CollaboratorError::progress)
    }
}

/// In-memory tally for runs that should not touch the data dir.
impl ProgressReporter for ProgressCounters {
    fn report_progress(&mut self, kind: ProgressKind) -> Result<(), CollaboratorError> {
        self.increment(kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, ProgressStore) {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_report_persists_counter() {
        let (dir, mut store) = make_test_store();
        store.report_progress(ProgressKind::Letter).unwrap();
        store.report_progress(ProgressKind::Letter).unwrap();

        let reopened = ProgressStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.data().counters.letter, 2);
        assert!(reopened.data().last_played.is_some());
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROGRESS_FILE), "{ not json").unwrap();
        let store = ProgressStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.data().counters.total(), 0);
    }

    #[test]
    fn test_stale_schema_starts_fresh() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROGRESS_FILE),
            r#"{"schema_version": 99, "counters": {"color": 7}}"#,
        )
        .unwrap();
        let store = ProgressStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.data().counters.color, 0);
    }

    #[test]
    fn test_save_leaves_no_tmp_file() {
        let (dir, mut store) = make_test_store();
        store.report_progress(ProgressKind::Shape).unwrap();
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty());
    }

    #[test]
    fn test_report_failure_maps_to_collaborator_error() {
        let (dir, mut store) = make_test_store();
        // Removing the directory makes the staged write fail.
        fs::remove_dir_all(dir.path()).unwrap();
        let err = store.report_progress(ProgressKind::Color).unwrap_err();
        assert!(matches!(err, CollaboratorError::Progress(_)));
    }

    #[test]
    fn test_in_memory_counters_report() {
        let mut counters = ProgressCounters::default();
        counters.report_progress(ProgressKind::Shape).unwrap();
        assert_eq!(counters.shape, 1);
    }

    #[test]
    fn test_record_session_round_trip() {
        let (dir, mut store) = make_test_store();
        store
            .record_session(SessionRecord {
                game: "speed".to_string(),
                score: 120,
                rounds: 4,
                accuracy: 92.5,
                best_streak: 9,
                finished_at: Utc::now(),
            })
            .unwrap();
        let reopened = ProgressStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.data().best_score("speed"), Some(120));
        assert_eq!(reopened.data().total_rounds, 4);
    }
}
