use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

use super::{Experiment, ExperimentBuilder, ExperimentSnapshot};

impl Experiment {
    /// Saves the experiment state to a JSON file.
    ///
    /// The file is written next to its destination, synced to disk and
    /// renamed into place, so a crash never leaves a truncated document
    /// behind. On failure the temporary file is removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the experiment is not configured
    /// and [`Error::Storage`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot()?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));
        let written = write_snapshot(&tmp_path, &snapshot).and_then(|()| {
            std::fs::rename(&tmp_path, path).map_err(|e| Error::Storage(e.to_string()))
        });
        if written.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
        }
        written?;
        trace_info!(path = %path.display(), n_trials = snapshot.trials.len(), "experiment saved");
        Ok(())
    }

    /// Loads an experiment saved with [`save`](Self::save), using the
    /// default generator and no early stopping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be read or parsed, and
    /// [`Error::Configuration`] if its content is inconsistent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, ExperimentBuilder::new())
    }

    /// Loads an experiment into one built by `builder`, keeping its
    /// generator and early-stopping evaluator.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load).
    pub fn load_with(path: impl AsRef<Path>, builder: ExperimentBuilder) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Error::Storage(e.to_string()))?;
        let snapshot: ExperimentSnapshot = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| Error::Storage(e.to_string()))?;
        let experiment = builder.build();
        experiment.restore(snapshot)?;
        Ok(experiment)
    }
}

/// Writes `snapshot` to `path` and waits until it reaches the disk.
fn write_snapshot(path: &Path, snapshot: &ExperimentSnapshot) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| Error::Storage(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)
        .map_err(|e| Error::Storage(e.to_string()))?;
    writer
        .flush()
        .map_err(|e| Error::Storage(e.to_string()))?;
    let file = writer
        .into_inner()
        .map_err(|e| Error::Storage(e.error().to_string()))?;
    file.sync_all()
        .map_err(|e| Error::Storage(e.to_string()))
}
