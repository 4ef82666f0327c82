use serde::Deserialize;
use std::fs;

/// Parameters for one isolation-forest fit.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ModelConfig {
    /// Number of trees in the ensemble.
    #[serde(default = "default_trees")]
    pub trees: usize,
    /// Expected fraction of the sample that is anomalous, in (0, 0.5].
    pub contamination: f64,
    /// Seed for the model's internal randomness.
    pub seed: u64,
}

fn default_trees() -> usize {
    100
}

impl ModelConfig {
    /// Defaults for point-anomaly detection over a single building's series.
    pub fn point_defaults() -> Self {
        Self { trees: default_trees(), contamination: 0.05, seed: 42 }
    }

    /// Defaults for underperformer detection over per-building percent
    /// changes. Contamination assumes up to 1 in 5 buildings may be an
    /// outlier.
    pub fn underperformance_defaults() -> Self {
        Self { trees: default_trees(), contamination: 0.2, seed: 0 }
    }
}

/// Header names the CSV loader resolves columns by. Field naming in the raw
/// files is a loader concern only; the analysis core never sees it.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMap {
    #[serde(default = "default_building_id")]
    pub building_id: String,
    #[serde(default = "default_date")]
    pub date: String,
    #[serde(default = "default_energy_use")]
    pub energy_use_kwh: String,
    #[serde(default = "default_square_footage")]
    pub square_footage: String,
}

fn default_building_id() -> String {
    "building_id".to_string()
}

fn default_date() -> String {
    "date".to_string()
}

fn default_energy_use() -> String {
    "energy_use_kwh".to_string()
}

fn default_square_footage() -> String {
    "square_footage".to_string()
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            building_id: default_building_id(),
            date: default_date(),
            energy_use_kwh: default_energy_use(),
            square_footage: default_square_footage(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "ModelConfig::point_defaults")]
    pub point: ModelConfig,
    #[serde(default = "ModelConfig::underperformance_defaults")]
    pub underperformance: ModelConfig,
    #[serde(default)]
    pub columns: ColumnMap,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            point: ModelConfig::point_defaults(),
            underperformance: ModelConfig::underperformance_defaults(),
            columns: ColumnMap::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the path in `ANALYTICS_CONFIG`, falling back
    /// to `analytics-config.toml`. A missing file yields the defaults; a
    /// present but malformed file is an error.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("ANALYTICS_CONFIG").unwrap_or_else(|_| "analytics-config.toml".to_string());
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let cfg: AppConfig = toml::from_str(&contents)?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_parameters() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.point.trees, 100);
        assert!((cfg.point.contamination - 0.05).abs() < 1e-12);
        assert_eq!(cfg.point.seed, 42);
        assert!((cfg.underperformance.contamination - 0.2).abs() < 1e-12);
        assert_eq!(cfg.underperformance.seed, 0);
        assert_eq!(cfg.columns.date, "date");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [point]
            contamination = 0.1
            seed = 7

            [columns]
            building_id = "School ID"
            date = "billing date"
            "#,
        )
        .unwrap();

        assert!((cfg.point.contamination - 0.1).abs() < 1e-12);
        assert_eq!(cfg.point.seed, 7);
        assert_eq!(cfg.point.trees, 100);
        assert_eq!(cfg.columns.building_id, "School ID");
        assert_eq!(cfg.columns.energy_use_kwh, "energy_use_kwh");
        assert!((cfg.underperformance.contamination - 0.2).abs() < 1e-12);
    }
}
