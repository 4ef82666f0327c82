use anyhow::{bail, Result};
use school_energy_analytics::{
    config::AppConfig,
    loader, observability,
    pipeline::scan_building,
};
use std::env;

fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: scan_building <billing_csv_path> [building_id]");
    }
    let file_path = &args[1];
    let building_filter = args.get(2);

    // Configuration can point ANALYTICS_CONFIG at a district-specific file.
    let cfg = AppConfig::load()?;

    let mut records = loader::load_billing_file(file_path, &cfg.columns)?;
    if let Some(id) = building_filter {
        records.retain(|r| &r.building_id == id);
        if records.is_empty() {
            bail!("no records for building '{id}' in {file_path}");
        }
    }

    let scan = scan_building(&records, &cfg.point)?;

    println!("Detected point anomalies:");
    for a in &scan.point_anomalies {
        println!("  {} -> {:.2} kWh (outlier)", a.date, a.energy_use_kwh);
    }
    if scan.point_anomalies.is_empty() {
        println!("  (none)");
    }

    println!("\nDetected anomalous trends:");
    for t in &scan.trend_periods {
        println!("  Anomalous period: {} to {}", t.start, t.end);
    }
    if scan.trend_periods.is_empty() {
        println!("  (none)");
    }

    Ok(())
}
