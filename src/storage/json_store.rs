//! A directory of JSON data files, one per option type.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{
    domain::{OptionRecord, OptionType},
    storage::{PersistenceGateway, StorageError},
};

/// Stores each catalogue as `<root>/<option type>.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStore {
    root: PathBuf,
    pretty: bool,
}

impl JsonStore {
    /// Opens a store rooted at `root`. The directory is created on first save.
    #[must_use]
    pub const fn new(root: PathBuf, pretty: bool) -> Self {
        Self { root, pretty }
    }

    /// The directory data files are stored in.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The data file of a catalogue.
    #[must_use]
    pub fn path(&self, option_type: OptionType) -> PathBuf {
        self.root.join(format!("{option_type}.json"))
    }

    /// When the catalogue was last saved, if it has been.
    ///
    /// # Errors
    ///
    /// Returns an error if the data file exists but cannot be read or parsed.
    pub fn saved_at(&self, option_type: OptionType) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self.read(option_type)?.map(|file| file.saved))
    }

    fn read(&self, option_type: OptionType) -> Result<Option<DataFile>, StorageError> {
        let path = self.path(option_type);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No data file at {}, starting empty", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let data: DataFile = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(data))
    }

    fn write(&self, option_type: OptionType, data: &DataFile) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.root)?;

        // Dropping the temporary file on an error path deletes it.
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            if self.pretty {
                serde_json::to_writer_pretty(&mut writer, data)?;
            } else {
                serde_json::to_writer(&mut writer, data)?;
            }
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        tmp.persist(self.path(option_type)).map_err(|e| e.error)?;
        Ok(())
    }
}

impl PersistenceGateway for JsonStore {
    fn load(&self, option_type: OptionType) -> Result<Vec<OptionRecord>, StorageError> {
        Ok(self
            .read(option_type)?
            .map(|file| file.options)
            .unwrap_or_default())
    }

    fn save(
        &mut self,
        option_type: OptionType,
        records: &[OptionRecord],
    ) -> Result<(), StorageError> {
        let data = DataFile {
            saved: Utc::now(),
            options: records.to_vec(),
        };
        self.write(option_type, &data)?;
        tracing::debug!(
            "Wrote {} options to {}",
            records.len(),
            self.path(option_type).display()
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DataFileVersion", into = "DataFileVersion")]
struct DataFile {
    saved: DateTime<Utc>,
    options: Vec<OptionRecord>,
}

/// The serialized versions of a data file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum DataFileVersion {
    #[serde(rename = "1")]
    V1 {
        saved: DateTime<Utc>,
        #[serde(default)]
        options: Vec<OptionRecord>,
    },
}

impl From<DataFileVersion> for DataFile {
    fn from(version: DataFileVersion) -> Self {
        match version {
            DataFileVersion::V1 { saved, options } => Self { saved, options },
        }
    }
}

impl From<DataFile> for DataFileVersion {
    fn from(data: DataFile) -> Self {
        let DataFile { saved, options } = data;
        Self::V1 { saved, options }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<OptionRecord> {
        vec![
            OptionRecord::top_level("A", "Sport"),
            OptionRecord::sub_option("B", "Fußball", "A"),
        ]
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonStore::new(tmp.path().to_path_buf(), true);

        assert!(store.load(OptionType::Activities).unwrap().is_empty());
        assert!(store.saved_at(OptionType::Activities).unwrap().is_none());
    }

    #[test]
    fn save_then_load_preserves_records() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(tmp.path().join("data"), false);

        store.save(OptionType::Districts, &records()).unwrap();

        assert_eq!(store.load(OptionType::Districts).unwrap(), records());
        assert!(store.load(OptionType::Activities).unwrap().is_empty());
        assert!(store.saved_at(OptionType::Districts).unwrap().is_some());
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 1);
    }

    #[test]
    fn failed_write_leaves_no_temporary_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(tmp.path().to_path_buf(), true);
        let blocker = store.path(OptionType::Activities);
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), "").unwrap();

        assert!(store.save(OptionType::Activities, &records()).is_err());

        let entries: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![blocker.file_name().unwrap().to_owned()]);
    }

    #[test]
    fn reads_versioned_envelope() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonStore::new(tmp.path().to_path_buf(), true);
        std::fs::write(
            store.path(OptionType::Activities),
            r#"{
                "_version": "1",
                "saved": "2024-05-01T12:00:00Z",
                "options": [
                    {"value": "A", "label": "Sport", "category": null},
                    {"value": "B", "label": "Fußball", "category": "A"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(store.load(OptionType::Activities).unwrap(), records());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonStore::new(tmp.path().to_path_buf(), true);
        std::fs::write(store.path(OptionType::Activities), "not json").unwrap();

        let err = store.load(OptionType::Activities).unwrap_err();
        assert!(matches!(err, StorageError::Json(_)));
    }
}
