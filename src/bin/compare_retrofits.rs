use anyhow::{bail, Result};
use school_energy_analytics::{
    config::AppConfig,
    loader, observability,
    pipeline::evaluate_retrofits,
};
use std::env;

fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("usage: compare_retrofits <pre_retrofit_csv> <post_retrofit_csv>");
    }

    let cfg = AppConfig::load()?;

    let pre = loader::load_billing_file(&args[1], &cfg.columns)?;
    let post = loader::load_billing_file(&args[2], &cfg.columns)?;

    let eval = evaluate_retrofits(&pre, &post, &cfg.underperformance)?;

    if eval.underperformers.is_empty() {
        println!(
            "No underperforming buildings detected (all retrofitted buildings within normal performance range)."
        );
        return Ok(());
    }

    println!("Underperforming building(s) detected (post-retrofit anomalies):");
    for u in &eval.underperformers {
        println!(
            "  Building {}: annual intensity change = {:.1}% (anomalous)",
            u.building_id, u.percent_change
        );
    }

    for u in &eval.underperformers {
        if u.exceedances.is_empty() {
            continue;
        }
        println!("\nDetailed anomalies for building {}:", u.building_id);
        for e in &u.exceedances {
            println!(
                "  {} -> {:.4} kWh/sqft (above expected)",
                e.date, e.usage_intensity
            );
        }
    }

    Ok(())
}
