use serde::Deserialize;

use crate::error::{AdError, AdResult};

/// Root configuration. Loaded from an optional TOML file and environment
/// variables with the prefix `ADROTATE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_frontend_prefix")]
    pub frontend_prefix: String,
    #[serde(default)]
    pub label: LabelConfig,
    #[serde(default)]
    pub disable: DisableConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Ad disclosure label prepended to top-level output.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_label_text")]
    pub text: String,
}

/// Global kill switches checked before any entity is resolved.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisableConfig {
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub not_found: bool,
    #[serde(default)]
    pub archives: bool,
    #[serde(default)]
    pub secondary_queries: bool,
    #[serde(default)]
    pub feeds: bool,
    #[serde(default)]
    pub rest_api: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_edit_url_template")]
    pub edit_url_template: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    /// Fixed PRNG seed; sessions draw from OS entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_weight")]
    pub default_weight: u32,
    #[serde(default = "default_max_weight")]
    pub max_weight: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_debug_output")]
    pub debug_output: bool,
}

// Default functions
fn default_frontend_prefix() -> String {
    "adrotate-".to_string()
}
fn default_label_text() -> String {
    "Advertisements".to_string()
}
fn default_edit_url_template() -> String {
    "/wp-admin/post.php?post={id}&action=edit".to_string()
}
fn default_weight() -> u32 {
    5
}
fn default_max_weight() -> u32 {
    10
}
fn default_max_depth() -> usize {
    4
}
fn default_debug_output() -> bool {
    true
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            text: default_label_text(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            edit_url_template: default_edit_url_template(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            seed: None,
            default_weight: default_weight(),
            max_weight: default_max_weight(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            debug_output: default_debug_output(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            frontend_prefix: default_frontend_prefix(),
            label: LabelConfig::default(),
            disable: DisableConfig::default(),
            site: SiteConfig::default(),
            selection: SelectionConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional config file and environment variables.
    /// Environment values win over file values.
    pub fn load(path: Option<&str>) -> AdResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("ADROTATE")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| AdError::Config(e.to_string()))
    }

    /// Expand the edit URL template for an entity id.
    pub fn edit_url(&self, id: u64) -> String {
        self.site.edit_url_template.replace("{id}", &id.to_string())
    }
}
