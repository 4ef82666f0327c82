use std::collections::BTreeSet;

use time::Date;

use crate::config::ModelConfig;
use crate::detect::{point, trend, PointAnomaly, TrendPeriod};
use crate::domain::{BillingRecord, BuildingPerformance};
use crate::features;
use crate::retrofit::{self, underperformance};

#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("missing field '{0}' in input")]
    MissingField(String),
    #[error("division undefined: {0}")]
    DivisionUndefined(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("square footage mismatch for building '{building_id}': pre={pre}, post={post}")]
    SquareFootageMismatch {
        building_id: String,
        pre: f64,
        post: f64,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("loader error: {0}")]
    Loader(String),
}

/// Output of the single-building scan: point anomalies and merged trend
/// periods.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingScan {
    pub point_anomalies: Vec<PointAnomaly>,
    pub trend_periods: Vec<TrendPeriod>,
}

/// Pipeline A: point- and trend-anomaly detection over one building's
/// billing series.
///
/// Records must all belong to the same building; multi-building input is an
/// `InvalidParameter` error (pre-filtering is the caller's job). Flagged
/// point-anomaly dates feed the trend scan so sustained trends made up
/// entirely of already-reported points are not double-reported.
pub fn scan_building(
    records: &[BillingRecord],
    cfg: &ModelConfig,
) -> Result<BuildingScan, AnalysisError> {
    if let Some(first) = records.first() {
        if records.iter().any(|r| r.building_id != first.building_id) {
            return Err(AnalysisError::InvalidParameter(
                "point/trend scan requires records for a single building".to_string(),
            ));
        }
    }

    let derived = features::derive_features(records)?;
    let results = point::score_series(&derived, cfg)?;
    let point_anomalies = point::point_anomalies(&derived, &results);

    let point_dates: BTreeSet<Date> = point_anomalies.iter().map(|a| a.date).collect();
    let stats = features::series_stats(&derived);
    let trend_periods = trend::detect_trends(&derived, stats, &point_dates);

    tracing::info!(
        records = derived.len(),
        point_anomalies = point_anomalies.len(),
        trend_periods = trend_periods.len(),
        "building scan complete"
    );

    Ok(BuildingScan {
        point_anomalies,
        trend_periods,
    })
}

/// One flagged building with its detail scan.
#[derive(Debug, Clone, PartialEq)]
pub struct UnderperformerReport {
    pub building_id: String,
    pub percent_change: f64,
    pub score: f64,
    /// Post-retrofit records above the 10%-over-baseline threshold.
    pub exceedances: Vec<underperformance::Exceedance>,
}

/// Output of the retrofit evaluation across buildings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrofitEvaluation {
    /// Every building present in both phases, ordered by building id.
    pub performances: Vec<BuildingPerformance>,
    pub underperformers: Vec<UnderperformerReport>,
}

/// Pipeline B: pre/post-retrofit comparison with underperformer flagging.
///
/// Both phases may span multiple buildings; each is grouped, derived and
/// aggregated per building, joined (inner) on building id, and the resulting
/// percent-change distribution is scanned for outliers. Each flagged
/// building's post-retrofit series is then scanned against its tolerated
/// baseline.
pub fn evaluate_retrofits(
    pre: &[BillingRecord],
    post: &[BillingRecord],
    cfg: &ModelConfig,
) -> Result<RetrofitEvaluation, AnalysisError> {
    let pre_derived = features::derive_by_building(pre)?;
    let post_derived = features::derive_by_building(post)?;

    let performances = retrofit::compare(&pre_derived, &post_derived)?;
    let flagged = underperformance::detect_underperformers(&performances, cfg)?;

    let mut underperformers = Vec::with_capacity(flagged.len());
    for u in flagged {
        let exceedances = match (
            performances.iter().find(|p| p.building_id == u.building_id),
            post_derived.get(&u.building_id),
        ) {
            (Some(perf), Some(series)) => underperformance::exceedance_scan(perf, series),
            _ => Vec::new(),
        };
        underperformers.push(UnderperformerReport {
            building_id: u.building_id,
            percent_change: u.percent_change,
            score: u.score,
            exceedances,
        });
    }

    tracing::info!(
        buildings = performances.len(),
        underperformers = underperformers.len(),
        "retrofit evaluation complete"
    );

    Ok(RetrofitEvaluation {
        performances,
        underperformers,
    })
}
