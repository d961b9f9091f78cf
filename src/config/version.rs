//! Admin API version identifiers.
//!
//! The Admin API is versioned by release quarter (`YYYY-MM` with month one
//! of `01`, `04`, `07`, `10`) plus a rolling `unstable` channel.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

const RELEASE_MONTHS: [u8; 4] = [1, 4, 7, 10];

/// Admin API version used to build request paths.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::ApiVersion;
///
/// let version: ApiVersion = "2025-01".parse().unwrap();
/// assert_eq!(version.to_string(), "2025-01");
/// assert!(version < ApiVersion::Unstable);
/// assert!("2025-02".parse::<ApiVersion>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiVersion {
    /// A quarterly stable release.
    Stable {
        /// Release year.
        year: u16,
        /// Release month (1, 4, 7 or 10).
        month: u8,
    },
    /// The rolling development channel; sorts after every stable release.
    Unstable,
}

impl ApiVersion {
    /// Returns the latest stable version this crate was written against.
    #[must_use]
    pub const fn latest() -> Self {
        Self::Stable {
            year: 2025,
            month: 10,
        }
    }

    /// Returns `true` for quarterly releases.
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        matches!(self, Self::Stable { .. })
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::latest()
    }
}

impl FromStr for ApiVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("unstable") {
            return Ok(Self::Unstable);
        }

        let invalid = || ConfigError::InvalidApiVersion {
            version: s.to_string(),
        };

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }

        let year: u16 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        if !RELEASE_MONTHS.contains(&month) {
            return Err(invalid());
        }

        Ok(Self::Stable { year, month })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable { year, month } => write!(f, "{year:04}-{month:02}"),
            Self::Unstable => f.write_str("unstable"),
        }
    }
}
