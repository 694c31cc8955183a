//! AIR tags: `modelId` or `modelId@versionId`.

use std::fmt;
use std::str::FromStr;

/// Compact reference to a catalog artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AirTag {
    pub model_id: u64,
    pub version_id: Option<u64>,
}

impl AirTag {
    pub fn new(model_id: u64, version_id: Option<u64>) -> Self {
        Self {
            model_id,
            version_id,
        }
    }
}

impl fmt::Display for AirTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version_id {
            Some(v) => write!(f, "{}@{}", self.model_id, v),
            None => write!(f, "{}", self.model_id),
        }
    }
}

/// Error parsing an AIR tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid AIR tag `{0}`: expected MODEL_ID or MODEL_ID@VERSION_ID")]
pub struct ParseAirError(String);

impl FromStr for AirTag {
    type Err = ParseAirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAirError(s.to_string());
        let trimmed = s.trim();
        let (model, version) = match trimmed.split_once('@') {
            Some((m, v)) => (m, Some(v)),
            None => (trimmed, None),
        };
        let model_id = model.trim().parse::<u64>().map_err(|_| err())?;
        let version_id = match version.map(str::trim) {
            None | Some("") => None,
            Some(v) => Some(v.parse::<u64>().map_err(|_| err())?),
        };
        Ok(AirTag {
            model_id,
            version_id,
        })
    }
}
