use std::fmt;

/// Names one cache or loader within a registry.
///
/// Registries key their entries by namespace *and* value type, so the same
/// namespace can never be read back at the wrong type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Assets by theme and key.
    Asset,
    /// Asset metadata lists by theme.
    AssetMeta,
    /// Themes by ID.
    Theme,
    /// The theme list of a shop.
    ThemeList,
    /// An application-defined namespace.
    Custom(&'static str),
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset => f.write_str("asset"),
            Self::AssetMeta => f.write_str("asset_meta"),
            Self::Theme => f.write_str("theme"),
            Self::ThemeList => f.write_str("theme_list"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}
