pub mod underperformance;

use std::collections::BTreeMap;

use crate::domain::{BuildingPerformance, DerivedRecord};
use crate::pipeline::AnalysisError;

/// Per-building aggregate of one phase (pre- or post-retrofit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseAggregate {
    pub mean_intensity: f64,
    pub total_kwh: f64,
    /// Constant per building; the first record's value is taken.
    pub square_footage: f64,
}

/// Aggregate each building's derived records for one phase: mean usage
/// intensity, total energy use, and its (constant) square footage.
pub fn aggregate_phase(
    by_building: &BTreeMap<String, Vec<DerivedRecord>>,
) -> BTreeMap<String, PhaseAggregate> {
    let mut aggregates = BTreeMap::new();
    for (id, records) in by_building {
        let Some(first) = records.first() else {
            continue;
        };
        let total_kwh: f64 = records.iter().map(|d| d.energy_use_kwh).sum();
        let mean_intensity =
            records.iter().map(|d| d.usage_intensity).sum::<f64>() / records.len() as f64;
        aggregates.insert(
            id.clone(),
            PhaseAggregate {
                mean_intensity,
                total_kwh,
                square_footage: first.square_footage,
            },
        );
    }
    aggregates
}

/// Build the pre/post summary for one building from its two phase
/// aggregates.
///
/// Rules:
/// - Pre and post square footage must agree; a disagreement is a fatal
///   `SquareFootageMismatch`, never a silent drop.
/// - Annual intensity treats each phase's span as one year:
///   total kWh / square footage.
/// - A zero pre-retrofit annual intensity makes the percent change a
///   `DivisionUndefined` error.
pub fn building_performance(
    building_id: &str,
    pre: PhaseAggregate,
    post: PhaseAggregate,
) -> Result<BuildingPerformance, AnalysisError> {
    if pre.square_footage != post.square_footage {
        return Err(AnalysisError::SquareFootageMismatch {
            building_id: building_id.to_string(),
            pre: pre.square_footage,
            post: post.square_footage,
        });
    }

    let pre_annual = pre.total_kwh / pre.square_footage;
    let post_annual = post.total_kwh / post.square_footage;
    if pre_annual == 0.0 {
        return Err(AnalysisError::DivisionUndefined(format!(
            "pre-retrofit annual intensity is zero for building '{building_id}'"
        )));
    }

    Ok(BuildingPerformance {
        building_id: building_id.to_string(),
        pre_avg_intensity: pre.mean_intensity,
        post_avg_intensity: post.mean_intensity,
        pre_total_kwh: pre.total_kwh,
        post_total_kwh: post.total_kwh,
        square_footage: pre.square_footage,
        pre_annual_intensity: pre_annual,
        post_annual_intensity: post_annual,
        percent_change: (post_annual - pre_annual) / pre_annual * 100.0,
    })
}

/// Join pre- and post-retrofit aggregates per building and compute each
/// building's performance summary, ordered by building id.
///
/// Buildings present in only one phase are excluded (inner-join semantics,
/// documented behavior). A building whose baseline makes the percent change
/// undefined is logged and skipped so the remaining buildings still process;
/// a square-footage mismatch aborts the whole comparison.
pub fn compare(
    pre: &BTreeMap<String, Vec<DerivedRecord>>,
    post: &BTreeMap<String, Vec<DerivedRecord>>,
) -> Result<Vec<BuildingPerformance>, AnalysisError> {
    let pre_agg = aggregate_phase(pre);
    let post_agg = aggregate_phase(post);

    let mut performances = Vec::new();
    for (id, pre_phase) in &pre_agg {
        let Some(post_phase) = post_agg.get(id) else {
            tracing::debug!(building_id = %id, "building missing from post-retrofit set, excluded");
            continue;
        };

        match building_performance(id, *pre_phase, *post_phase) {
            Ok(perf) => performances.push(perf),
            Err(AnalysisError::DivisionUndefined(msg)) => {
                tracing::warn!(building_id = %id, %msg, "skipping building with undefined baseline");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(performances)
}
