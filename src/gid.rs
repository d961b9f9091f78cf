//! Global IDs (`gid://{namespace}/{type}/{id}[?params]`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// Namespace of platform-issued IDs.
pub const SHOPIFY_NAMESPACE: &str = "shopify";

/// A validated global ID.
///
/// Namespace, type and ID are non-empty runs of `[A-Za-z0-9_-]`; an
/// optional query string carries extra parameters.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::Gid;
///
/// let gid = Gid::shopify("OnlineStoreTheme", 123).unwrap();
/// assert_eq!(gid.as_ref(), "gid://shopify/OnlineStoreTheme/123");
/// assert_eq!(gid.id(), "123");
/// assert_eq!(gid.resource_type(), "OnlineStoreTheme");
///
/// assert!(Gid::parse("gid://shopify/Product/!").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gid {
    value: String,
    type_start: usize,
    id_start: usize,
    id_end: usize,
}

impl Gid {
    /// Parses and validates a global ID.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGid`] if `value` is not
    /// `gid://{namespace}/{type}/{id}[?params]`.
    pub fn parse(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        let invalid = || ConfigError::InvalidGid { gid: value.clone() };

        let rest = value.strip_prefix("gid://").ok_or_else(invalid)?;
        let path = rest.split_once('?').map_or(rest, |(path, _)| path);

        let mut segments = path.split('/');
        let (Some(namespace), Some(resource_type), Some(id), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(invalid());
        };

        if ![namespace, resource_type, id].iter().all(|s| is_segment(s)) {
            return Err(invalid());
        }

        let type_start = "gid://".len() + namespace.len() + 1;
        let id_start = type_start + resource_type.len() + 1;
        let id_end = id_start + id.len();

        Ok(Self {
            value,
            type_start,
            id_start,
            id_end,
        })
    }

    /// Encodes a global ID from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGid`] if a part contains characters
    /// outside `[A-Za-z0-9_-]`.
    pub fn encode(
        namespace: &str,
        resource_type: &str,
        id: impl fmt::Display,
        params: &[(&str, &str)],
    ) -> Result<Self, ConfigError> {
        let mut gid = format!("gid://{namespace}/{resource_type}/{id}");
        if !params.is_empty() {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            gid.push('?');
            gid.push_str(&query);
        }
        Self::parse(gid)
    }

    /// Encodes a `gid://shopify/{type}/{id}` global ID.
    ///
    /// # Errors
    ///
    /// Same as [`Gid::encode`].
    pub fn shopify(resource_type: &str, id: impl fmt::Display) -> Result<Self, ConfigError> {
        Self::encode(SHOPIFY_NAMESPACE, resource_type, id, &[])
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.value["gid://".len()..self.type_start - 1]
    }

    /// Returns the resource type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.value[self.type_start..self.id_start - 1]
    }

    /// Returns the resource ID, the last path segment.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.value[self.id_start..self.id_end]
    }

    /// Returns the query string after `?`, if any.
    #[must_use]
    pub fn params(&self) -> Option<&str> {
        self.value.get(self.id_end + 1..).filter(|params| !params.is_empty())
    }
}

fn is_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl AsRef<str> for Gid {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for Gid {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Gid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de> Deserialize<'de> for Gid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(value).map_err(serde::de::Error::custom)
    }
}
