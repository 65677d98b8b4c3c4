//! Loading trainer configuration (data directory, mastery targets, exercise bank) from TOML.
//!
//! Example:
//!
//! ```toml
//! data_dir = "./data"
//!
//! [targets]
//! class = 3
//! use_case = 2
//!
//! [[exercises]]
//! id = "uc-include"
//! version = 1
//! chapter = "use_case"
//! max_points = 5
//! hints = ["Mandatory behaviour is always included."]
//! [exercises.key]
//! kind = "multiple_choice"
//! correct_ids = ["include"]
//! ```

use std::{collections::BTreeMap, path::PathBuf};

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{Chapter, ExerciseDefinition};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TrainerConfig {
  /// Where learner snapshots live. Absent: in-memory only.
  #[serde(default)] pub data_dir: Option<PathBuf>,
  /// Mastery targets by chapter name; chapters not listed use the catalogue count.
  #[serde(default)] pub targets: BTreeMap<String, usize>,
  #[serde(default)] pub exercises: Vec<ExerciseDefinition>,
  /// Upper bound on learners kept in memory at once.
  #[serde(default)] pub max_resident_learners: Option<usize>,
}

pub const DEFAULT_MAX_RESIDENT_LEARNERS: usize = 1024;

impl TrainerConfig {
  /// Targets with valid chapter names. Unknown names are logged and skipped.
  pub fn chapter_targets(&self) -> BTreeMap<Chapter, usize> {
    let mut out = BTreeMap::new();
    for (name, target) in &self.targets {
      match name.parse::<Chapter>() {
        Ok(ch) => {
          out.insert(ch, *target);
        }
        Err(e) => warn!(target: "uml_trainer", %name, error = %e, "Ignoring target for unknown chapter"),
      }
    }
    out
  }
}

pub fn parse_config(s: &str) -> Result<TrainerConfig, toml::de::Error> {
  toml::from_str::<TrainerConfig>(s)
}

/// Attempt to load `TrainerConfig` from TRAINER_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_trainer_config_from_env() -> Option<TrainerConfig> {
  let path = std::env::var("TRAINER_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "uml_trainer", %path, exercises = cfg.exercises.len(), "Loaded trainer config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "uml_trainer", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "uml_trainer", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// TRAINER_DATA_DIR wins over `data_dir` from the config file.
pub fn resolve_data_dir(cfg: Option<&TrainerConfig>) -> Option<PathBuf> {
  std::env::var("TRAINER_DATA_DIR")
    .ok()
    .filter(|s| !s.trim().is_empty())
    .map(PathBuf::from)
    .or_else(|| cfg.and_then(|c| c.data_dir.clone()))
}

/// TRAINER_MAX_LEARNERS wins over `max_resident_learners`; zero or garbage falls back.
pub fn resolve_max_resident(cfg: Option<&TrainerConfig>) -> usize {
  max_resident_from(std::env::var("TRAINER_MAX_LEARNERS").ok().as_deref(), cfg)
}

fn max_resident_from(env: Option<&str>, cfg: Option<&TrainerConfig>) -> usize {
  env
    .and_then(|s| s.trim().parse::<usize>().ok())
    .or_else(|| cfg.and_then(|c| c.max_resident_learners))
    .filter(|n| *n > 0)
    .unwrap_or(DEFAULT_MAX_RESIDENT_LEARNERS)
}
