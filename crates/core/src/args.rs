use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{EntityKind, Position};

/// Entry point a render came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMethod {
    Ad,
    Group,
    Placement,
    Shortcode,
}

impl From<EntityKind> for RenderMethod {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Ad => RenderMethod::Ad,
            EntityKind::Group => RenderMethod::Group,
            EntityKind::Placement => RenderMethod::Placement,
        }
    }
}

/// Placement-level label override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    #[default]
    Default,
    Enabled,
    Disabled,
}

/// Arguments threaded through one render call chain.
///
/// Unknown keys are kept in `extra` so extensions can pass their own data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderArgs {
    pub id: Option<String>,
    pub method: Option<RenderMethod>,
    pub previous_id: Option<String>,
    pub previous_method: Option<RenderMethod>,
    #[serde(rename = "override")]
    pub override_output: Option<String>,
    pub is_top_level: bool,
    pub placement_id: Option<String>,
    pub placement_type: Option<String>,
    pub placement_position: Option<Position>,
    pub placement_clearfix: bool,
    pub wrapper_classes: Vec<String>,
    pub wrapper_attributes: IndexMap<String, String>,
    pub ad_label: LabelMode,
    /// Re-enable wrappers on non-top-level ads.
    pub child_wrappers: bool,
    /// Stats key of the top-level entity this render is nested in.
    pub stats_parent: Option<String>,
    pub suppress_debug: bool,
    #[serde(skip)]
    pub depth: usize,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for RenderArgs {
    fn default() -> Self {
        Self {
            id: None,
            method: None,
            previous_id: None,
            previous_method: None,
            override_output: None,
            is_top_level: true,
            placement_id: None,
            placement_type: None,
            placement_position: None,
            placement_clearfix: false,
            wrapper_classes: Vec::new(),
            wrapper_attributes: IndexMap::new(),
            ad_label: LabelMode::Default,
            child_wrappers: false,
            stats_parent: None,
            suppress_debug: false,
            depth: 0,
            extra: serde_json::Map::new(),
        }
    }
}

impl RenderArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp the entry point. Existing values are kept so nested renders
    /// remember how they were reached.
    pub fn entry(mut self, id: impl Into<String>, method: RenderMethod) -> Self {
        self.id = Some(id.into());
        if self.method.is_none() {
            self.method = Some(method);
        }
        self
    }

    /// Args for a member rendered inside a group.
    pub fn child(&self) -> Self {
        let mut child = self.clone();
        child.is_top_level = false;
        child.override_output = None;
        child.depth = self.depth + 1;
        child
    }

    /// Args for a shortcode render triggered from inside the body of the
    /// `parent` entity currently rendered with these args.
    pub fn nested(&self, parent: EntityKind) -> Self {
        Self {
            previous_id: self.id.clone(),
            previous_method: Some(parent.into()),
            method: Some(RenderMethod::Shortcode),
            is_top_level: false,
            suppress_debug: self.suppress_debug,
            stats_parent: self.stats_parent.clone(),
            depth: self.depth + 1,
            ..Self::default()
        }
    }

    /// The entity of `kind` identified by `id` is being rendered from inside
    /// its own body.
    pub fn is_self_reference(&self, kind: EntityKind) -> bool {
        self.id.is_some()
            && self.previous_id == self.id
            && self.previous_method == Some(RenderMethod::from(kind))
    }
}
