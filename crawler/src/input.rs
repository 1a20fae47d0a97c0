use crate::error::CrawlError;
use crate::models::WorkUnit;
use log::{info, warn};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One row of the city list
#[derive(Debug, Deserialize)]
struct CityRow {
    #[serde(alias = "City", alias = "city_name", alias = "City Name")]
    city: String,
    #[serde(alias = "Contractor URL", alias = "listing_path", alias = "url")]
    contractor_url: String,
}

/// Load the ordered list of work units, skipping the first `skip` entries
pub fn load_work_units<P: AsRef<Path>>(path: P, skip: usize) -> Result<Vec<WorkUnit>, CrawlError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| CrawlError::Input(format!("could not open {:?}: {}", path, e)))?;

    let units = read_work_units(file, skip)?;
    info!("Loaded {} work units from {:?} (skipped first {})", units.len(), path, skip);
    Ok(units)
}

/// Parse work units from any CSV source.
///
/// `skip` counts raw data rows, incomplete ones included, so the offset
/// matches the row numbers of the file.
pub fn read_work_units<R: Read>(reader: R, skip: usize) -> Result<Vec<WorkUnit>, CrawlError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut units = Vec::new();
    for (line, row) in rdr.deserialize::<CityRow>().enumerate().skip(skip) {
        let row = row.map_err(|e| CrawlError::Input(format!("row {}: {}", line + 1, e)))?;
        if row.city.is_empty() || row.contractor_url.is_empty() {
            warn!("Ignoring incomplete city row {}: {:?}", line + 1, row);
            continue;
        }
        units.push(WorkUnit::new(row.city, row.contractor_url));
    }

    Ok(units)
}
