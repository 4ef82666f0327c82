use time::Date;

use crate::config::ModelConfig;
use crate::domain::DerivedRecord;
use crate::model::{AnomalyResult, IsolationForest};
use crate::pipeline::AnalysisError;

/// A single record whose (month, usage intensity) features are unusual
/// relative to the rest of the series.
#[derive(Debug, Clone, PartialEq)]
pub struct PointAnomaly {
    pub date: Date,
    pub energy_use_kwh: f64,
    pub score: f64,
}

/// Score every record of one building's derived series against an isolation
/// forest fit on (month, usage_intensity) features.
///
/// Results are in series order, one per record, normal and anomalous alike.
/// Fewer than `MIN_STABLE_SAMPLES` records still fit, but the scores are
/// unstable and a warning is logged; an empty series is a hard error.
pub fn score_series(
    series: &[DerivedRecord],
    cfg: &ModelConfig,
) -> Result<Vec<AnomalyResult>, AnalysisError> {
    if series.len() < MIN_STABLE_SAMPLES {
        tracing::warn!(
            records = series.len(),
            minimum = MIN_STABLE_SAMPLES,
            "short series, point anomaly scores may be unstable"
        );
    }

    let features: Vec<Vec<f64>> = series
        .iter()
        .map(|d| vec![f64::from(d.month), d.usage_intensity])
        .collect();

    let forest = IsolationForest::fit(cfg, &features)?;
    Ok(forest.results(&features))
}

/// Usage precondition for meaningful point scores, roughly a year of monthly
/// billing periods.
pub const MIN_STABLE_SAMPLES: usize = 10;

/// Reduce scored records to the anomalous ones, paired back with their dates
/// and raw energy use for reporting.
pub fn point_anomalies(series: &[DerivedRecord], results: &[AnomalyResult]) -> Vec<PointAnomaly> {
    results
        .iter()
        .filter(|r| r.anomalous)
        .map(|r| {
            let record = &series[r.index];
            PointAnomaly {
                date: record.date,
                energy_use_kwh: record.energy_use_kwh,
                score: r.score,
            }
        })
        .collect()
}
