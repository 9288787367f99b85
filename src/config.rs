use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the browser table reacts to clicks on cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    #[default]
    NoInteraction,
    /// Cells open an editor but edits are never applied.
    Selectable,
    /// Cell edits are forwarded to the mutation gateway.
    Editable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAlignment {
    #[default]
    Start,
    Center,
}

/// Settings applied to every profile unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobalBrowserConfig {
    pub interaction: InteractionMode,
    /// List every note field in one flat sub-menu instead of one sub-menu per note type.
    pub single_field_list: bool,
    pub show_internal_fields: bool,
    pub column_alignment: ColumnAlignment,
    /// Prefix prepended to the host's persisted column/sort keys so the
    /// extended browser does not clobber the stock one.
    pub state_key_prefix: String,
}

impl Default for GlobalBrowserConfig {
    fn default() -> Self {
        Self {
            interaction: InteractionMode::NoInteraction,
            single_field_list: false,
            show_internal_fields: false,
            column_alignment: ColumnAlignment::Start,
            state_key_prefix: "advbrowse_".to_string(),
        }
    }
}

/// Per-profile overrides. Unspecified values inherit from Global.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ProfileConfig {
    pub interaction: Option<InteractionMode>,
    pub single_field_list: Option<bool>,
    pub show_internal_fields: Option<bool>,
    pub column_alignment: Option<ColumnAlignment>,
}

/// Fully resolved config used by a browser session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectiveConfig {
    pub interaction: InteractionMode,
    pub single_field_list: bool,
    pub show_internal_fields: bool,
    pub column_alignment: ColumnAlignment,
    pub state_key_prefix: String,
}

impl EffectiveConfig {
    pub fn from_layers(global: &GlobalBrowserConfig, profile: Option<&ProfileConfig>) -> Self {
        let mut eff = Self {
            interaction: global.interaction,
            single_field_list: global.single_field_list,
            show_internal_fields: global.show_internal_fields,
            column_alignment: global.column_alignment,
            state_key_prefix: global.state_key_prefix.clone(),
        };
        if let Some(p) = profile {
            if let Some(v) = p.interaction { eff.interaction = v; }
            if let Some(v) = p.single_field_list { eff.single_field_list = v; }
            if let Some(v) = p.show_internal_fields { eff.show_internal_fields = v; }
            if let Some(v) = p.column_alignment { eff.column_alignment = v; }
        }
        eff
    }

    pub fn editable(&self) -> bool { self.interaction == InteractionMode::Editable }

    /// Host key under which a piece of browser state is persisted.
    pub fn state_key(&self, base: &str) -> String { format!("{}{}", self.state_key_prefix, base) }
}

impl Default for EffectiveConfig {
    fn default() -> Self { Self::from_layers(&GlobalBrowserConfig::default(), None) }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk shape: `{ "global": {...}, "profile": {...} }`, both optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub global: GlobalBrowserConfig,
    pub profile: Option<ProfileConfig>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        Self::parse(&text)
    }

    pub fn effective(&self) -> EffectiveConfig {
        EffectiveConfig::from_layers(&self.global, self.profile.as_ref())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
