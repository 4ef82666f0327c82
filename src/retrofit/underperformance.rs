use time::Date;

use crate::config::ModelConfig;
use crate::domain::{BuildingPerformance, DerivedRecord};
use crate::model::IsolationForest;
use crate::pipeline::AnalysisError;

/// Fixed tolerance for the detail scan: post-retrofit records may sit up to
/// 10% above the pre-retrofit annual baseline before being reported.
pub const BASELINE_TOLERANCE: f64 = 1.10;

/// A building whose percent change is an outlier among its peers.
#[derive(Debug, Clone, PartialEq)]
pub struct Underperformer {
    pub building_id: String,
    pub percent_change: f64,
    pub score: f64,
}

/// A post-retrofit record sitting above the tolerated baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Exceedance {
    pub date: Date,
    pub usage_intensity: f64,
}

/// Flag buildings whose retrofit percent change is an outlier relative to
/// the other buildings, by fitting the isolation forest on the 1-D
/// percent-change distribution.
pub fn detect_underperformers(
    performances: &[BuildingPerformance],
    cfg: &ModelConfig,
) -> Result<Vec<Underperformer>, AnalysisError> {
    let features: Vec<Vec<f64>> = performances
        .iter()
        .map(|p| vec![p.percent_change])
        .collect();

    let forest = IsolationForest::fit(cfg, &features)?;
    Ok(forest
        .results(&features)
        .into_iter()
        .filter(|r| r.anomalous)
        .map(|r| {
            let p = &performances[r.index];
            Underperformer {
                building_id: p.building_id.clone(),
                percent_change: p.percent_change,
                score: r.score,
            }
        })
        .collect())
}

/// Scan a flagged building's post-retrofit series against the fixed
/// 10%-above-baseline threshold.
///
/// This is a plain threshold comparison, not a second outlier-model fit.
pub fn exceedance_scan(
    performance: &BuildingPerformance,
    post_series: &[DerivedRecord],
) -> Vec<Exceedance> {
    let threshold = performance.pre_annual_intensity * BASELINE_TOLERANCE;
    post_series
        .iter()
        .filter(|d| d.usage_intensity > threshold)
        .map(|d| Exceedance {
            date: d.date,
            usage_intensity: d.usage_intensity,
        })
        .collect()
}
