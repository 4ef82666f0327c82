use std::collections::BTreeSet;

use time::Date;

use crate::domain::DerivedRecord;
use crate::features::SeriesStats;

/// Rolling-window width for trend scanning: three consecutive billing
/// periods.
pub const WINDOW_SIZE: usize = 3;

/// A sustained elevated-usage period, reported as an inclusive date range.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPeriod {
    pub start: Date,
    pub end: Date,
}

/// Scan a chronologically sorted series for sustained elevated usage.
///
/// Rules:
/// - A window of 3 consecutive records is flagged when its mean intensity
///   exceeds the series mean by more than one standard deviation.
/// - A flagged window whose member dates are ALL already point-anomaly dates
///   is suppressed, so point anomalies are not re-reported as trends.
/// - Overlapping flagged windows are merged greedily: a window is kept only
///   if its dates are disjoint from the most recently kept window. Adjacency
///   is deliberately checked against the last kept window only, not against
///   every kept window.
///
/// Series shorter than one window yield no periods (logged, not an error).
pub fn detect_trends(
    series: &[DerivedRecord],
    stats: SeriesStats,
    point_anomaly_dates: &BTreeSet<Date>,
) -> Vec<TrendPeriod> {
    if series.len() < WINDOW_SIZE {
        tracing::warn!(
            records = series.len(),
            window = WINDOW_SIZE,
            "series shorter than one trend window, skipping trend scan"
        );
        return Vec::new();
    }

    let threshold = stats.mean + stats.std_dev;
    let mut flagged: Vec<[Date; WINDOW_SIZE]> = Vec::new();

    for window in series.windows(WINDOW_SIZE) {
        let window_mean =
            window.iter().map(|d| d.usage_intensity).sum::<f64>() / WINDOW_SIZE as f64;
        if window_mean <= threshold {
            continue;
        }

        let dates = [window[0].date, window[1].date, window[2].date];
        if dates.iter().all(|d| point_anomaly_dates.contains(d)) {
            continue;
        }
        flagged.push(dates);
    }

    merge_overlapping(&flagged)
        .into_iter()
        .map(|dates| TrendPeriod {
            start: dates[0],
            end: dates[WINDOW_SIZE - 1],
        })
        .collect()
}

/// Greedy left-to-right merge over flagged windows in window-start order.
///
/// Keeps a window only when its date set is fully disjoint from the last
/// KEPT window's. This is not a true interval union: a window overlapping an
/// earlier kept window but not the immediately previous kept one would still
/// be kept.
fn merge_overlapping(flagged: &[[Date; WINDOW_SIZE]]) -> Vec<[Date; WINDOW_SIZE]> {
    let mut kept: Vec<[Date; WINDOW_SIZE]> = Vec::new();
    for window in flagged {
        let disjoint = match kept.last() {
            Some(last) => window.iter().all(|d| !last.contains(d)),
            None => true,
        };
        if disjoint {
            kept.push(*window);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::series_stats;
    use time::Month;

    fn monthly_series(intensities: &[f64]) -> Vec<DerivedRecord> {
        intensities
            .iter()
            .enumerate()
            .map(|(i, &intensity)| {
                let month = Month::try_from((i + 1) as u8).unwrap();
                DerivedRecord {
                    building_id: "s-1".to_string(),
                    date: Date::from_calendar_date(2024, month, 1).unwrap(),
                    energy_use_kwh: intensity * 1000.0,
                    square_footage: 1000.0,
                    month: (i + 1) as u8,
                    usage_intensity: intensity,
                }
            })
            .collect()
    }

    fn day(d: u8) -> Date {
        Date::from_calendar_date(2024, Month::January, d).unwrap()
    }

    #[test]
    fn sustained_elevation_is_one_merged_period() {
        // Months 5-7 sit well above mean + std of the full series; every
        // other month sits at the baseline.
        let mut intensities = vec![10.0; 12];
        intensities[4] = 16.0;
        intensities[5] = 16.0;
        intensities[6] = 16.0;
        let series = monthly_series(&intensities);
        let stats = series_stats(&series);

        let periods = detect_trends(&series, stats, &BTreeSet::new());

        assert_eq!(periods.len(), 1);
        assert_eq!(u8::from(periods[0].start.month()), 5);
        assert_eq!(u8::from(periods[0].end.month()), 7);
    }

    #[test]
    fn flat_series_has_no_trends() {
        let series = monthly_series(&[5.0; 12]);
        let stats = series_stats(&series);

        let periods = detect_trends(&series, stats, &BTreeSet::new());
        assert!(periods.is_empty());
    }

    #[test]
    fn short_series_yields_zero_periods() {
        let series = monthly_series(&[5.0, 9.0]);
        let stats = series_stats(&series);

        let periods = detect_trends(&series, stats, &BTreeSet::new());
        assert!(periods.is_empty());
    }

    #[test]
    fn window_of_only_point_anomalies_is_suppressed() {
        let mut intensities = vec![10.0; 12];
        intensities[4] = 16.0;
        intensities[5] = 16.0;
        intensities[6] = 16.0;
        let series = monthly_series(&intensities);
        let stats = series_stats(&series);

        // All three elevated dates already flagged as point anomalies.
        let point_dates: BTreeSet<Date> =
            [series[4].date, series[5].date, series[6].date].into_iter().collect();

        let periods = detect_trends(&series, stats, &point_dates);
        assert!(periods.is_empty());
    }

    #[test]
    fn partially_point_flagged_window_still_reports() {
        let mut intensities = vec![10.0; 12];
        intensities[4] = 16.0;
        intensities[5] = 16.0;
        intensities[6] = 16.0;
        let series = monthly_series(&intensities);
        let stats = series_stats(&series);

        let point_dates: BTreeSet<Date> = [series[5].date].into_iter().collect();

        let periods = detect_trends(&series, stats, &point_dates);
        assert_eq!(periods.len(), 1);
    }

    #[test]
    fn overlapping_windows_keep_only_the_first() {
        let flagged = vec![
            [day(1), day(2), day(3)],
            [day(2), day(3), day(4)],
        ];

        let kept = merge_overlapping(&flagged);
        assert_eq!(kept, vec![[day(1), day(2), day(3)]]);
    }

    #[test]
    fn merge_compares_against_last_kept_window_only() {
        // The third window overlaps the first kept window but not the second
        // kept one; the greedy rule keeps it anyway.
        let flagged = vec![
            [day(1), day(2), day(3)],
            [day(4), day(5), day(6)],
            [day(3), day(7), day(8)],
        ];

        let kept = merge_overlapping(&flagged);
        assert_eq!(kept.len(), 3);
    }
}
