use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use roostcore::config::DatasetConfig;
use roostcore::prelude::{BatchPayload, DataSource, ReviewError, ReviewResult};
use roostcore::records::FieldMap;

/// Data directory laid out as `<root>/<dataset>/config.json`,
/// `<root>/<dataset>/batches.txt` and CSV files named by the dataset's
/// patterns, resolved against `<root>`.
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dataset_file(&self, dataset: &str, name: &str) -> PathBuf {
        self.root.join(dataset).join(name)
    }

    fn read_text(path: &Path) -> ReviewResult<String> {
        fs::read_to_string(path)
            .map_err(|err| ReviewError::Source(format!("reading {}: {}", path.display(), err)))
    }

    /// Reads a headed CSV file into rows. Short rows keep only the columns
    /// they carry.
    pub fn read_rows(path: &Path) -> ReviewResult<Vec<FieldMap>> {
        let source_err =
            |err: csv::Error| ReviewError::Source(format!("reading {}: {}", path.display(), err));
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(source_err)?;
        let headers = reader.headers().map_err(source_err)?.clone();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(source_err)?;
            rows.push(FieldMap::from_record(headers.iter(), record.iter()));
        }
        debug!("read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }
}

impl DataSource for FsSource {
    fn dataset_config(&mut self, dataset: &str) -> ReviewResult<DatasetConfig> {
        let text = Self::read_text(&self.dataset_file(dataset, "config.json"))?;
        DatasetConfig::from_json(&text)
    }

    fn batches(&mut self, dataset: &str) -> ReviewResult<Vec<String>> {
        let text = Self::read_text(&self.dataset_file(dataset, "batches.txt"))?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn batch(
        &mut self,
        dataset: &str,
        batch: &str,
        config: &DatasetConfig,
    ) -> ReviewResult<BatchPayload> {
        let boxes = self.root.join(config.boxes_path(dataset, batch));
        let scans = self.root.join(config.scans_path(dataset, batch));
        Ok(BatchPayload {
            detection_rows: Self::read_rows(&boxes)?,
            scan_rows: Self::read_rows(&scans)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "roosts/config.json",
            r#"{"boxes": "roosts/boxes/{batch}.csv", "scans": "roosts/scans/{batch}.csv", "swap": true}"#,
        );
        write(dir.path(), "roosts/batches.txt", "KDOX2019\n\nKDOX2020\n");
        write(
            dir.path(),
            "roosts/boxes/KDOX2019.csv",
            "track_id,filename,local_time,x,y,det_score\n\
             1,KDOX20191001_101000_V06,20191001051000,1,2,0.5\n",
        );
        write(
            dir.path(),
            "roosts/scans/KDOX2019.csv",
            "filename,local_time\nKDOX20191001_101000_V06,20191001051000\n",
        );
        dir
    }

    #[test]
    fn reads_config_batches_and_rows() {
        let dir = data_dir();
        let mut source = FsSource::new(dir.path());
        let config = source.dataset_config("roosts").unwrap();
        assert!(config.swap);
        assert_eq!(
            source.batches("roosts").unwrap(),
            vec!["KDOX2019".to_string(), "KDOX2020".to_string()]
        );
        let payload = source.batch("roosts", "KDOX2019", &config).unwrap();
        assert_eq!(payload.detection_rows.len(), 1);
        assert_eq!(payload.detection_rows[0].get("det_score"), Some("0.5"));
        assert_eq!(payload.scan_rows[0].get("local_time"), Some("20191001051000"));
    }

    #[test]
    fn missing_files_are_source_errors() {
        let dir = data_dir();
        let mut source = FsSource::new(dir.path());
        let config = source.dataset_config("roosts").unwrap();
        let err = source.batch("roosts", "KDOX2020", &config).unwrap_err();
        assert!(matches!(err, ReviewError::Source(message) if message.contains("KDOX2020.csv")));
        assert!(matches!(
            source.dataset_config("other"),
            Err(ReviewError::Source(_))
        ));
    }
}
