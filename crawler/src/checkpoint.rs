use crate::error::CrawlError;
use crate::models::{Record, WorkUnit};
use log::{info, warn};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Durable per-unit CSV snapshot of collected records
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Location of the checkpoint for `unit`
    pub fn path_for(&self, unit: &WorkUnit) -> PathBuf {
        self.dir.join(unit.checkpoint_file_name())
    }

    /// Records persisted for `unit`, in file order. A missing file is an empty checkpoint.
    ///
    /// Rows without a profile link are dropped and repeated links keep their
    /// first occurrence, so the result never violates the no-duplicate invariant.
    pub fn load(&self, unit: &WorkUnit) -> Result<Vec<Record>, CrawlError> {
        let path = self.path_for(unit);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CrawlError::checkpoint(&path, e)),
        };

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for row in reader.deserialize::<Record>() {
            let record = row.map_err(|e| CrawlError::checkpoint(&path, e))?;
            if record.profile_link.is_empty() {
                warn!("Dropping checkpoint row without profile link in {:?}", path);
                continue;
            }
            if !seen.insert(record.profile_link.clone()) {
                warn!("Dropping duplicate checkpoint row {}", record.profile_link);
                continue;
            }
            records.push(record);
        }

        info!("Resuming from existing file {:?} ({} records)", path, records.len());
        Ok(records)
    }

    /// Replace the checkpoint for `unit` with `records`.
    ///
    /// Writes a sibling temp file and renames it over the target, so readers
    /// see either the previous snapshot or the new one.
    pub fn save(&self, unit: &WorkUnit, records: &[Record]) -> Result<(), CrawlError> {
        let path = self.path_for(unit);
        fs::create_dir_all(&self.dir).map_err(|e| CrawlError::checkpoint(&self.dir, e))?;

        let tmp = path.with_extension("csv.tmp");
        write_records(&tmp, records).map_err(|e| CrawlError::checkpoint(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| CrawlError::checkpoint(&path, e))?;
        Ok(())
    }
}

fn write_records(path: &Path, records: &[Record]) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(Record::HEADERS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?.sync_all()?;
    Ok(())
}
