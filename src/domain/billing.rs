use time::Date;

/// One utility billing row for one building, as supplied by the loader.
///
/// Invariants (enforced upstream):
/// - `energy_use_kwh` is non-negative.
/// - `square_footage` is constant per building and positive; a zero value is
///   rejected when features are derived, never coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingRecord {
    pub building_id: String,
    pub date: Date,
    pub energy_use_kwh: f64,
    pub square_footage: f64,
}

/// A `BillingRecord` augmented with the derived feature columns.
///
/// `month` is the calendar month of the billing date (1-12, cyclical) and
/// `usage_intensity` is kWh normalized by square footage, the comparable
/// metric across buildings of different sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub building_id: String,
    pub date: Date,
    pub energy_use_kwh: f64,
    pub square_footage: f64,
    pub month: u8,
    pub usage_intensity: f64,
}
