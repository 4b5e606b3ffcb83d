use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Input formats a decoder can be registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileFormat {
    Xml,
    Pbf,
    Opl,
    Json,
    O5m,
    Debug,
    /// Stream of compressed buffer frames, see [`crate::frames`].
    Arena,
}

impl FileFormat {
    pub const ALL: [Self; 7] = [
        Self::Xml,
        Self::Pbf,
        Self::Opl,
        Self::Json,
        Self::O5m,
        Self::Debug,
        Self::Arena,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Pbf => "pbf",
            Self::Opl => "opl",
            Self::Json => "json",
            Self::O5m => "o5m",
            Self::Debug => "debug",
            Self::Arena => "arena",
        }
    }

    /// Guess the format from a file name or bare extension. Only the last
    /// suffix counts, so `planet.osm.pbf` is PBF.
    #[must_use]
    pub fn from_extension(name: &str) -> Option<Self> {
        let ext = name.rsplit('.').next().unwrap_or(name).to_ascii_lowercase();
        match ext.as_str() {
            "osm" | "osc" | "xml" => Some(Self::Xml),
            "pbf" => Some(Self::Pbf),
            "opl" => Some(Self::Opl),
            "json" | "geojson" => Some(Self::Json),
            "o5m" | "o5c" => Some(Self::O5m),
            "debug" => Some(Self::Debug),
            "arena" => Some(Self::Arena),
            _ => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PipelineError::UnsupportedFormat {
                format: s.to_string(),
                available: Self::ALL.map(Self::as_str).join(", "),
            })
    }
}
