/// Per-building pre/post-retrofit summary produced by the comparator.
///
/// One entry per building present in BOTH phases (inner-join semantics: a
/// building with records in only one phase never appears here). The annual
/// intensities treat each phase's record span as one full year; supplying
/// exactly one year of records per phase is the caller's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingPerformance {
    pub building_id: String,
    pub pre_avg_intensity: f64,
    pub post_avg_intensity: f64,
    pub pre_total_kwh: f64,
    pub post_total_kwh: f64,
    pub square_footage: f64,
    pub pre_annual_intensity: f64,
    pub post_annual_intensity: f64,
    /// Positive means usage went up after the retrofit (bad), negative means
    /// it went down.
    pub percent_change: f64,
}
