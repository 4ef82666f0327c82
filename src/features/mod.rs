use std::collections::BTreeMap;

use crate::domain::{BillingRecord, DerivedRecord};
use crate::pipeline::AnalysisError;

/// Derive feature columns for one building's billing records.
///
/// Rules:
/// - Output is sorted ascending by billing date.
/// - `month` comes from the record's own date field (1-12).
/// - `usage_intensity` = energy_use_kwh / square_footage; a zero square
///   footage is a `DivisionUndefined` error, never a silent `inf` or `NaN`.
pub fn derive_features(records: &[BillingRecord]) -> Result<Vec<DerivedRecord>, AnalysisError> {
    let mut derived = Vec::with_capacity(records.len());

    for r in records {
        if r.square_footage == 0.0 {
            return Err(AnalysisError::DivisionUndefined(format!(
                "square footage is zero for building '{}' on {}",
                r.building_id, r.date
            )));
        }

        derived.push(DerivedRecord {
            building_id: r.building_id.clone(),
            date: r.date,
            energy_use_kwh: r.energy_use_kwh,
            square_footage: r.square_footage,
            month: u8::from(r.date.month()),
            usage_intensity: r.energy_use_kwh / r.square_footage,
        });
    }

    derived.sort_by_key(|d| d.date);
    Ok(derived)
}

/// Group a multi-building record set by building id and derive each group
/// independently. Group order is deterministic (sorted by building id).
pub fn derive_by_building(
    records: &[BillingRecord],
) -> Result<BTreeMap<String, Vec<DerivedRecord>>, AnalysisError> {
    let mut by_building: BTreeMap<String, Vec<BillingRecord>> = BTreeMap::new();
    for r in records {
        by_building
            .entry(r.building_id.clone())
            .or_default()
            .push(r.clone());
    }

    let mut derived = BTreeMap::new();
    for (id, group) in by_building {
        derived.insert(id, derive_features(&group)?);
    }
    Ok(derived)
}

/// Mean and sample standard deviation of a series' usage intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Compute usage-intensity statistics over a derived series.
///
/// The standard deviation is the sample estimate (n - 1 denominator). Series
/// with fewer than two records get a standard deviation of zero.
pub fn series_stats(series: &[DerivedRecord]) -> SeriesStats {
    let n = series.len();
    if n == 0 {
        return SeriesStats { mean: 0.0, std_dev: 0.0 };
    }

    let mean = series.iter().map(|d| d.usage_intensity).sum::<f64>() / n as f64;
    if n < 2 {
        return SeriesStats { mean, std_dev: 0.0 };
    }

    let var = series
        .iter()
        .map(|d| {
            let dev = d.usage_intensity - mean;
            dev * dev
        })
        .sum::<f64>()
        / (n - 1) as f64;

    SeriesStats { mean, std_dev: var.sqrt() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn record(id: &str, date: time::Date, kwh: f64, sqft: f64) -> BillingRecord {
        BillingRecord {
            building_id: id.to_string(),
            date,
            energy_use_kwh: kwh,
            square_footage: sqft,
        }
    }

    #[test]
    fn derives_intensity_and_month() {
        let records = vec![record("s-1", date!(2024 - 03 - 15), 5000.0, 1000.0)];

        let derived = derive_features(&records).unwrap();
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].month, 3);
        assert!((derived[0].usage_intensity - 5.0).abs() < 1e-12);
    }

    #[test]
    fn sorts_ascending_by_date() {
        let records = vec![
            record("s-1", date!(2024 - 06 - 01), 3.0, 1.0),
            record("s-1", date!(2024 - 01 - 01), 1.0, 1.0),
            record("s-1", date!(2024 - 03 - 01), 2.0, 1.0),
        ];

        let derived = derive_features(&records).unwrap();
        let months: Vec<u8> = derived.iter().map(|d| d.month).collect();
        assert_eq!(months, vec![1, 3, 6]);
    }

    #[test]
    fn zero_square_footage_is_division_undefined() {
        let records = vec![record("s-1", date!(2024 - 01 - 01), 100.0, 0.0)];

        let res = derive_features(&records);
        assert!(matches!(res, Err(AnalysisError::DivisionUndefined(_))));
    }

    #[test]
    fn groups_by_building_id() {
        let records = vec![
            record("s-2", date!(2024 - 01 - 01), 10.0, 10.0),
            record("s-1", date!(2024 - 01 - 01), 20.0, 10.0),
            record("s-2", date!(2024 - 02 - 01), 30.0, 10.0),
        ];

        let grouped = derive_by_building(&records).unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["s-1"].len(), 1);
        assert_eq!(grouped["s-2"].len(), 2);
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let records = vec![
            record("s-1", date!(2024 - 01 - 01), 2.0, 1.0),
            record("s-1", date!(2024 - 02 - 01), 4.0, 1.0),
            record("s-1", date!(2024 - 03 - 01), 6.0, 1.0),
        ];

        let derived = derive_features(&records).unwrap();
        let stats = series_stats(&derived);
        assert!((stats.mean - 4.0).abs() < 1e-12);
        // variance = ((-2)^2 + 0 + 2^2) / 2 = 4
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
    }
}
