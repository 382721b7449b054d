//! On disk bookkeeping shared by every model family.

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::HandlerErr;

const METRIC_RESULTS_SUFFIX: &str = "_metric_results";
const METRIC_SUMMARY_FILE: &str = "summary.json";

/// Creates the directory tree the artifact will be written into.
pub fn prepare_save_dir(save_path: &Path) -> Result<(), HandlerErr> {
    let dir = parent_dir(save_path);
    fs::create_dir_all(dir).map_err(|e| map_io_err(dir, e))
}

/// Maps a failure to write under `path`, permission problems keep their own code.
pub fn map_io_err(path: &Path, e: io::Error) -> HandlerErr {
    match e.kind() {
        io::ErrorKind::PermissionDenied => HandlerErr::PermissionDenied(path.to_path_buf()),
        _ => HandlerErr::TrainingFailed(format!("{}: {e}", path.display())),
    }
}

/// Creates the `<stem>_metric_results` directory next to the artifact.
pub fn metric_results_dir(save_path: &Path) -> Result<PathBuf, HandlerErr> {
    let mut name = save_path.file_stem().map(OsString::from).unwrap_or_default();
    name.push(METRIC_RESULTS_SUFFIX);

    let dir = parent_dir(save_path).join(name);
    fs::create_dir_all(&dir).map_err(|e| map_io_err(&dir, e))?;
    Ok(dir)
}

/// Writes the training summary into a metric results directory.
pub fn write_metric_results<T: Serialize>(dir: &Path, summary: &T) -> Result<(), HandlerErr> {
    let path = dir.join(METRIC_SUMMARY_FILE);
    let bytes = serde_json::to_vec_pretty(summary)
        .map_err(|e| HandlerErr::TrainingFailed(e.to_string()))?;

    fs::write(&path, bytes).map_err(|e| map_io_err(&path, e))
}

/// Persists an artifact, readers never observe a partially written file.
///
/// The artifact is written next to its destination and renamed over it once synced.
pub fn persist<T: Serialize>(save_path: &Path, artifact: &T) -> io::Result<()> {
    let mut tmp_name = save_path.file_name().map(OsString::from).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = save_path.with_file_name(tmp_name);

    let bytes = serde_json::to_vec(artifact)?;
    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, save_path)
    });

    if let Err(e) = written {
        match fs::remove_file(&tmp) {
            Err(cleanup) if cleanup.kind() != io::ErrorKind::NotFound => {
                debug!("failed to remove {}: {cleanup}", tmp.display());
            }
            _ => {}
        }
        return Err(e);
    }

    debug!("persisted model at {}", save_path.display());
    Ok(())
}

/// Reads an artifact back.
///
/// # Returns
/// `None` if nothing was ever persisted at `path`.
pub fn restore<T: DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn permission_errors_keep_their_code() {
        let err = map_io_err(
            Path::new("/root/models"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.code(), "FAIL_PERMISSION_ERROR");

        let err = map_io_err(Path::new("/x"), io::Error::from(io::ErrorKind::Other));
        assert_eq!(err.code(), "FAIL_TRAINING_FAILED");
    }

    #[test]
    fn persist_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");

        prepare_save_dir(&path).unwrap();
        persist(&path, &json!({"weights": [1.5]})).unwrap();

        let restored: Option<Value> = restore(&path).unwrap();
        assert_eq!(restored, Some(json!({"weights": [1.5]})));
        assert!(!dir.path().join("nested").join("model.json.tmp").exists());

        let missing: Option<Value> = restore(&dir.path().join("missing.json")).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn failed_persists_leave_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::create_dir(&path).unwrap();

        persist(&path, &json!({"weights": [1.5]})).unwrap_err();
        assert!(!dir.path().join("model.json.tmp").exists());
        assert!(path.is_dir());
    }

    #[test]
    fn corrupt_artifacts_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "not json").unwrap();

        let err = restore::<Value>(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn metric_results_sit_next_to_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let results = metric_results_dir(&dir.path().join("ou_model.json")).unwrap();

        assert_eq!(results, dir.path().join("ou_model_metric_results"));
        write_metric_results(&results, &json!({"SEQ_SCAN": 0.5})).unwrap();
        assert!(results.join("summary.json").exists());
    }
}
