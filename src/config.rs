//! Branding configuration.
//!
//! The letterhead and the names printed on reports belong to the deployment, not to the code.
//! Defaults match the school the renderer was first written for; a TOML file may override any
//! subset of the fields.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading a branding file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read branding file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid branding file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Names and letterhead lines printed on every report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branding {
    /// First header line.
    pub ministry: String,
    /// Regional directorate.
    pub directorate: String,
    /// Local education office.
    pub office: String,
    /// School name, last header line.
    pub school: String,
    /// Region named in the remote-work notice of the rounds report.
    pub region: String,
    /// Document author written to the PDF metadata.
    pub author: String,
    /// Title of the person preparing the reports.
    pub preparer_title: String,
    /// School principal, named in the rounds report body.
    pub principal: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            ministry: "وزارة التعليم".to_string(),
            directorate: "الادارة العامة للتعليم بمنطقة مكة".to_string(),
            office: "مكتب التعليم جنوب مكة".to_string(),
            school: "ابتدائية أم منيع الأنصارية".to_string(),
            region: "مكة المكرمة".to_string(),
            author: "ابتسام الفيفي".to_string(),
            preparer_title: "مساعد الإداري".to_string(),
            principal: "ابتسام محمد القرني".to_string(),
        }
    }
}

impl Branding {
    /// Parses branding from a TOML string; missing keys keep their defaults.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `"<preparer title> / <author>"`, the signature line.
    pub fn signature(&self) -> String {
        format!("إعداد {} / {}", self.preparer_title, self.author)
    }
}
