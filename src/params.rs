use crate::error::AslError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// run parameters, stored on disk as a toml file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AslDenoiseParams {
    /// upper bound on the number of workers. The engine never runs more workers than the detected
    /// core count or the number of acquisitions.
    pub max_workers: Option<usize>,
    /// default tracing filter directive, overridden by RUST_LOG
    pub log_filter: String,
}

impl Default for AslDenoiseParams {
    fn default() -> Self {
        Self {
            max_workers: None,
            log_filter: "info".to_string(),
        }
    }
}

impl AslDenoiseParams {
    /// checks the settings the denoising engine depends on
    pub fn validate_workers(&self) -> Result<(), AslError> {
        if self.max_workers == Some(0) {
            return Err(AslError::Params("max_workers must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AslError> {
        self.validate_workers()?;
        if self.log_filter.trim().is_empty() {
            return Err(AslError::Params("log_filter must not be empty".to_string()));
        }
        Ok(())
    }

    /// loads and validates a parameter file. The extension is always taken to be `.toml`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AslError> {
        let path = path.as_ref().with_extension("toml");
        let mut toml_str = String::new();
        File::open(&path)?.read_to_string(&mut toml_str)?;
        let params: Self = toml::from_str(&toml_str)?;
        params.validate()?;
        Ok(params)
    }

    /// writes the parameters to `path` with a `.toml` extension and returns the written path
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<PathBuf, AslError> {
        let mut toml_string = toml::to_string(self)?;
        toml_string.push('\n');
        let filename = path.as_ref().with_extension("toml");
        let mut f = File::create(&filename)?;
        f.write_all(toml_string.as_bytes())?;
        Ok(filename)
    }
}
