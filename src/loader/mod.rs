use std::{fs::File, io::Read, path::Path};

use csv::StringRecord;
use time::macros::format_description;
use time::Date;

use crate::config::ColumnMap;
use crate::domain::BillingRecord;
use crate::pipeline::AnalysisError;

/// CSV loader for billing records.
///
/// Columns are resolved by header name through a `ColumnMap`, so the raw
/// files may use whatever headers the district exports (e.g. "School ID",
/// "billing date"). Expected cell formats:
/// - date: YYYY-MM-DD
/// - energy use: non-negative number (kWh)
/// - square footage: number (validated downstream when features are derived)
pub fn load_billing_records<R: Read>(
    reader: R,
    columns: &ColumnMap,
) -> Result<Vec<BillingRecord>, AnalysisError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| AnalysisError::Loader(format!("failed to read CSV headers: {e}")))?
        .clone();

    // Surface a missing column before touching any row; no partial loads.
    for required in [
        &columns.building_id,
        &columns.date,
        &columns.energy_use_kwh,
        &columns.square_footage,
    ] {
        if !headers.iter().any(|h| h == required) {
            return Err(AnalysisError::MissingField(required.clone()));
        }
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| AnalysisError::Loader(format!("failed to read CSV record: {e}")))?;
        records.push(record_to_billing(&record, &headers, columns)?);
    }
    Ok(records)
}

/// Load billing records from a CSV file on disk.
pub fn load_billing_file<P: AsRef<Path>>(
    path: P,
    columns: &ColumnMap,
) -> Result<Vec<BillingRecord>, AnalysisError> {
    let file = File::open(path.as_ref()).map_err(|e| {
        AnalysisError::Loader(format!(
            "failed to open CSV file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    load_billing_records(file, columns)
}

fn record_to_billing(
    record: &StringRecord,
    headers: &StringRecord,
    columns: &ColumnMap,
) -> Result<BillingRecord, AnalysisError> {
    let get = |name: &str| -> Result<&str, AnalysisError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| AnalysisError::MissingField(name.to_string()))
    };

    let building_id = get(&columns.building_id)?.trim().to_string();

    let date_str = get(&columns.date)?;
    let format = format_description!("[year]-[month]-[day]");
    let date = Date::parse(date_str.trim(), &format)
        .map_err(|e| AnalysisError::Loader(format!("invalid date '{date_str}': {e}")))?;

    let kwh_str = get(&columns.energy_use_kwh)?;
    let energy_use_kwh: f64 = kwh_str
        .trim()
        .parse()
        .map_err(|e| AnalysisError::Loader(format!("invalid energy use '{kwh_str}': {e}")))?;
    if energy_use_kwh < 0.0 {
        return Err(AnalysisError::Loader(format!(
            "energy use must be non-negative, got {energy_use_kwh}"
        )));
    }

    let sqft_str = get(&columns.square_footage)?;
    let square_footage: f64 = sqft_str
        .trim()
        .parse()
        .map_err(|e| AnalysisError::Loader(format!("invalid square footage '{sqft_str}': {e}")))?;

    Ok(BillingRecord {
        building_id,
        date,
        energy_use_kwh,
        square_footage,
    })
}
