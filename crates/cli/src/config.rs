use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use fieldtally_engine::{EngineConfig, EngineError};

/// Full run-file config: the engine config plus the `[data]` section that
/// tells the CSV gateway where and how to read.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Root directory holding `<estate_id>/<YYYY-MM>.csv` partitions.
    pub dir: PathBuf,
    /// Employee directory CSV (`id,name`), optional.
    #[serde(default)]
    pub employees: Option<PathBuf>,
    pub columns: ColumnMapping,
    /// Measurement field name → CSV column header.
    pub measurements: BTreeMap<String, String>,
    /// Division id → display name; ids fall back to themselves.
    #[serde(default)]
    pub divisions: BTreeMap<String, String>,
}

/// Named source columns for the record fields. The gateway builds typed
/// records from these; nothing downstream ever sees a column position.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    pub record_id: String,
    pub employee_id: String,
    pub tag: String,
    pub transaction_number: String,
    pub date: String,
    pub status: String,
    pub field_id: String,
    pub division_id: String,
}

impl CliConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config: CliConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.engine.validate()?;

        if self.engine.estates.is_empty() {
            return Err(EngineError::ConfigValidation(
                "at least one estate is required".into(),
            ));
        }

        // Every comparison field needs a source column.
        for field in &self.engine.comparison.fields {
            if !self.data.measurements.contains_key(field) {
                return Err(EngineError::ConfigValidation(format!(
                    "comparison field '{field}' has no [data.measurements] column"
                )));
            }
        }

        Ok(())
    }

    /// Paths in the config resolve relative to the config file's directory.
    pub fn resolve_paths(&mut self, config_path: &Path) {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        if self.data.dir.is_relative() {
            self.data.dir = base.join(&self.data.dir);
        }
        if let Some(ref employees) = self.data.employees {
            if employees.is_relative() {
                self.data.employees = Some(base.join(employees));
            }
        }
    }
}
