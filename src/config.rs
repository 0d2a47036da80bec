use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GaitError, GaitResult};
use crate::gait_events::GaitEventParams;

/// Column positions of time and the two total-force channels in a table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub time: usize,
    pub left: usize,
    pub right: usize,
}

impl ColumnLayout {
    pub fn width(&self) -> usize {
        self.time.max(self.left).max(self.right) + 1
    }
}

/// Everything a batch run needs: where data lives, which trials exist and
/// how events are detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw recordings, `<subset><group><NN>_<run>.txt`.
    pub raw_root: PathBuf,
    /// BIDS trial files, `sub-<ID>/beh/sub-<ID>_run-<rep>_task-gait_beh.tsv`.
    pub input_root: PathBuf,
    /// Stride tables and reports.
    pub output_root: PathBuf,
    pub subset: String,
    pub groups: Vec<String>,
    pub max_participants: u32,
    pub runs: Vec<String>,
    pub columns: ColumnLayout,
    pub raw_columns: ColumnLayout,
    pub params: GaitEventParams,
    pub lowpass_cutoff_hz: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            raw_root: PathBuf::from("data/00_source-data"),
            input_root: PathBuf::from("data/01_raw-data"),
            output_root: PathBuf::from("results"),
            subset: "Ga".to_string(),
            groups: vec!["Co".to_string(), "Pt".to_string()],
            max_participants: 33,
            runs: vec!["01".to_string(), "02".to_string(), "10".to_string()],
            columns: ColumnLayout { time: 0, left: 1, right: 2 },
            raw_columns: ColumnLayout { time: 0, left: 17, right: 18 },
            params: GaitEventParams::default(),
            lowpass_cutoff_hz: None,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> GaitResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> GaitResult<()> {
        let invalid = |msg: &str| -> GaitResult<()> { Err(GaitError::InvalidConfig(msg.to_string())) };

        if self.params.slope_window == 0 {
            return invalid("slope_window must be at least 1");
        }
        if !(self.params.slope_tolerance > 0.0) {
            return invalid("slope_tolerance must be positive");
        }
        if !self.params.offset_contact.is_finite() {
            return invalid("offset_contact must be finite");
        }
        if !self.params.rise_fall_edge.is_finite() {
            return invalid("rise_fall_edge must be finite");
        }
        if self.subset.is_empty() {
            return invalid("subset must not be empty");
        }
        if self.groups.is_empty() || self.groups.iter().any(|g| g.is_empty()) {
            return invalid("groups must list at least one non-empty group code");
        }
        if self.max_participants == 0 {
            return invalid("max_participants must be at least 1");
        }
        if self.runs.is_empty() || self.runs.iter().any(|r| r.is_empty()) {
            return invalid("runs must list at least one non-empty run label");
        }
        if let Some(cutoff) = self.lowpass_cutoff_hz {
            if !(cutoff > 0.0) {
                return invalid("lowpass_cutoff_hz must be positive");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.params.rise_fall_edge, 500.0);
        assert_eq!(config.params.offset_contact, 10.0);
        assert_eq!(config.raw_columns.width(), 19);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{
            "output_root": "/tmp/strides",
            "max_participants": 2,
            "params": { "slope_window": 33, "direction": "backward" }
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.output_root, PathBuf::from("/tmp/strides"));
        assert_eq!(config.max_participants, 2);
        assert_eq!(config.params.slope_window, 33);
        assert_eq!(config.params.direction, crate::gait_events::SearchDirection::Backward);
        assert_eq!(config.params.slope_tolerance, 0.01);
        assert_eq!(config.groups, vec!["Co", "Pt"]);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut config = PipelineConfig::default();
        config.params.slope_window = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.params.slope_tolerance = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.params.offset_contact = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.runs.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.lowpass_cutoff_hz = Some(-5.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_offset_is_accepted() {
        // level above the plateau: the contact walk waits for force to climb past it
        let mut config = PipelineConfig::default();
        config.params.offset_contact = -50.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_contact_rule_from_json() {
        let json = r#"{ "params": { "offset_contact": 25.0, "contact_rule": "drop_below" } }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.params.contact_rule, crate::gait_events::ContactRule::DropBelow);
        assert_eq!(config.params.offset_contact, 25.0);
        assert_eq!(PipelineConfig::default().params.contact_rule, crate::gait_events::ContactRule::ReachLevel);
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("gait_config_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, r#"{ "subset": "Ju", "lowpass_cutoff_hz": 20.0 }"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.subset, "Ju");
        assert_eq!(config.lowpass_cutoff_hz, Some(20.0));

        fs::remove_dir_all(&dir).unwrap();
    }
}
