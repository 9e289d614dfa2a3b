//! The architect's structured design draft.

use serde::{Deserialize, Serialize};

/// Fixed enumeration of component types a draft may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Subsystem,
    DataStore,
    Agent,
    #[serde(rename = "API")]
    Api,
    #[serde(rename = "UIComponent")]
    UiComponent,
    Utility,
}

impl ComponentType {
    pub const ALL: [ComponentType; 6] = [
        Self::Subsystem,
        Self::DataStore,
        Self::Agent,
        Self::Api,
        Self::UiComponent,
        Self::Utility,
    ];

    /// Canonical name as it appears in drafts.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subsystem => "Subsystem",
            Self::DataStore => "DataStore",
            Self::Agent => "Agent",
            Self::Api => "API",
            Self::UiComponent => "UIComponent",
            Self::Utility => "Utility",
        }
    }

    /// Strict lookup by canonical name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Map a common model deviation onto the canonical enumeration.
    pub fn from_alias(s: &str) -> Option<Self> {
        if let Some(t) = Self::parse(s) {
            return Some(t);
        }
        let t = match s.trim().to_ascii_lowercase().as_str() {
            "subsystem" | "service" | "module" | "connector" | "adapter" | "provider"
            | "client" => Self::Subsystem,
            "datastore" | "data_store" | "database" | "db" | "storage" => Self::DataStore,
            "agent" => Self::Agent,
            "api" | "interface" | "endpoint" => Self::Api,
            "ui" | "uicomponent" | "component" => Self::UiComponent,
            "utility" | "util" | "helper" | "factory" => Self::Utility,
            _ => return None,
        };
        Some(t)
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed building block of the design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    /// Declared type. Kept as text so the structural checker can reject
    /// values outside [`ComponentType`].
    #[serde(rename = "type")]
    pub kind: String,
    pub purpose: String,
    #[serde(default)]
    pub file_path: String,
    /// Names of other components in the same draft.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Component {
    /// The declared type, if it is one of the fixed enumeration.
    pub fn component_type(&self) -> Option<ComponentType> {
        ComponentType::parse(&self.kind)
    }
}

/// One field of a persistent entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelField {
    pub name: String,
    /// Free-form type, e.g. `int`, `datetime`, `FK:User.id`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

/// A persistent entity of the design.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataModel {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<ModelField>,
}

/// An HTTP endpoint with example payload shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub description: String,
    /// Example request body, `None` when the endpoint takes no body.
    #[serde(default)]
    pub request_body: Option<String>,
    #[serde(default)]
    pub query_params: Option<String>,
    /// Example response shape or status line.
    #[serde(default)]
    pub response: String,
    /// Key error responses, e.g. `400: Invalid input, 404: Not found`.
    #[serde(default)]
    pub errors: String,
}

/// The architect's current structured design.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    /// Tree-format project layout.
    #[serde(default)]
    pub directory_structure: String,
    /// Components in the order the architect listed them.
    pub components: Vec<Component>,
    #[serde(default)]
    pub data_models: Vec<DataModel>,
    #[serde(default)]
    pub api_endpoints: Vec<ApiEndpoint>,
    #[serde(default)]
    pub key_decisions: Vec<String>,
    /// Working field: how the draft answers the last round's challenges.
    #[serde(default)]
    pub rationale: String,
}

impl Draft {
    /// Look up a component by exact name.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Total declared dependency edges.
    pub fn dependency_count(&self) -> usize {
        self.components.iter().map(|c| c.dependencies.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_round_trip_names() {
        for t in ComponentType::ALL {
            assert_eq!(ComponentType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ComponentType::parse("api"), None);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(
            ComponentType::from_alias("database"),
            Some(ComponentType::DataStore)
        );
        assert_eq!(
            ComponentType::from_alias("Service"),
            Some(ComponentType::Subsystem)
        );
        assert_eq!(ComponentType::from_alias("ui"), Some(ComponentType::UiComponent));
        assert_eq!(ComponentType::from_alias("endpoint"), Some(ComponentType::Api));
        assert_eq!(ComponentType::from_alias("Gizmo"), None);
    }

    #[test]
    fn test_optional_sections_default() {
        let draft: Draft = serde_json::from_str(
            r#"{"components": [{"name": "A", "type": "Agent", "purpose": "p"}]}"#,
        )
        .unwrap();
        assert!(draft.directory_structure.is_empty());
        assert!(draft.data_models.is_empty());
        assert!(draft.api_endpoints.is_empty());
    }

    #[test]
    fn test_component_serializes_type_field() {
        let c = Component {
            name: "AuthService".into(),
            kind: "Subsystem".into(),
            purpose: "Issues tokens".into(),
            file_path: String::new(),
            dependencies: vec!["UserStore".into()],
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "Subsystem");
        assert_eq!(c.component_type(), Some(ComponentType::Subsystem));
    }
}
