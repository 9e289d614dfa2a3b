//! Structural acceptance ("buildability"): deterministic, non-LLM checks
//! that a draft's declared references resolve inside the draft.
//!
//! This layer is independent of the response contract: a draft can be
//! well-formed JSON with every required field and still be rejected here.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use super::draft::{ComponentType, Draft};

/// Which structural rule a draft broke, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralRule {
    /// The draft declares no components.
    NoComponents,
    /// Two components share a name.
    DuplicateName,
    /// A dependency names a component absent from the draft.
    UnresolvedDependency,
    /// A component type is outside the fixed enumeration.
    UnknownComponentType,
    /// Dependencies form a cycle.
    CircularDependency,
    /// API endpoints are declared but no data model backs them.
    EndpointsWithoutModels,
}

impl std::fmt::Display for StructuralRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoComponents => write!(f, "no_components"),
            Self::DuplicateName => write!(f, "duplicate_name"),
            Self::UnresolvedDependency => write!(f, "unresolved_dependency"),
            Self::UnknownComponentType => write!(f, "unknown_component_type"),
            Self::CircularDependency => write!(f, "circular_dependency"),
            Self::EndpointsWithoutModels => write!(f, "endpoints_without_models"),
        }
    }
}

/// A structural violation with a pointer for re-prompting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralIssue {
    pub rule: StructuralRule,
    /// Offending component name (empty for draft-level issues).
    pub component: String,
    /// Offending field on that component.
    pub field: String,
    pub detail: String,
}

impl StructuralIssue {
    fn new(rule: StructuralRule, component: &str, field: &str, detail: String) -> Self {
        Self {
            rule,
            component: component.to_string(),
            field: field.to_string(),
            detail,
        }
    }

    /// Human-readable pointer, e.g. `AuthService.dependencies`.
    pub fn pointer(&self) -> String {
        if self.component.is_empty() {
            self.field.clone()
        } else {
            format!("{}.{}", self.component, self.field)
        }
    }
}

impl std::fmt::Display for StructuralIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at '{}': {}", self.rule, self.pointer(), self.detail)
    }
}

impl std::error::Error for StructuralIssue {}

/// Return the first structural violation in the draft, if any.
pub fn check_draft(draft: &Draft) -> Result<(), StructuralIssue> {
    match collect_issues(draft).into_iter().next() {
        Some(issue) => Err(issue),
        None => Ok(()),
    }
}

/// Every structural violation in the draft, ordered by rule then by
/// component declaration order.
///
/// `project_name` and `tech_stack` are not checked here: the document
/// renders without them and neither is a cross-reference.
pub fn collect_issues(draft: &Draft) -> Vec<StructuralIssue> {
    if draft.components.is_empty() {
        return vec![StructuralIssue::new(
            StructuralRule::NoComponents,
            "",
            "components",
            "draft declares no components".to_string(),
        )];
    }

    let mut issues = Vec::new();

    // (a) unique names
    let mut seen = HashSet::new();
    for comp in &draft.components {
        if !seen.insert(comp.name.as_str()) {
            issues.push(StructuralIssue::new(
                StructuralRule::DuplicateName,
                &comp.name,
                "name",
                format!("component name '{}' is declared more than once", comp.name),
            ));
        }
    }

    // (b) every dependency resolves
    for comp in &draft.components {
        for dep in &comp.dependencies {
            if !seen.contains(dep.as_str()) {
                issues.push(StructuralIssue::new(
                    StructuralRule::UnresolvedDependency,
                    &comp.name,
                    "dependencies",
                    format!(
                        "component '{}' depends on '{}' which is not defined",
                        comp.name, dep
                    ),
                ));
            }
        }
    }

    // (c) type drawn from the fixed enumeration
    for comp in &draft.components {
        if comp.component_type().is_none() {
            let allowed: Vec<&str> = ComponentType::ALL.iter().map(|t| t.as_str()).collect();
            issues.push(StructuralIssue::new(
                StructuralRule::UnknownComponentType,
                &comp.name,
                "type",
                format!(
                    "type '{}' is not one of: {}",
                    comp.kind,
                    allowed.join(" | ")
                ),
            ));
        }
    }

    // (d) no cycles among resolved edges
    issues.extend(find_cycles(draft));

    // (e) endpoints need data models
    if !draft.api_endpoints.is_empty() && draft.data_models.is_empty() {
        issues.push(StructuralIssue::new(
            StructuralRule::EndpointsWithoutModels,
            "",
            "data_models",
            format!(
                "{} API endpoint(s) defined but no data_models",
                draft.api_endpoints.len()
            ),
        ));
    }

    issues
}

fn find_cycles(draft: &Draft) -> Vec<StructuralIssue> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for (pos, comp) in draft.components.iter().enumerate() {
        index
            .entry(comp.name.as_str())
            .or_insert_with(|| graph.add_node(pos));
    }
    for comp in &draft.components {
        let from = index[comp.name.as_str()];
        for dep in &comp.dependencies {
            if let Some(&to) = index.get(dep.as_str()) {
                graph.update_edge(from, to, ());
            }
        }
    }

    let mut cycles: Vec<Vec<usize>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut members: Vec<usize> = scc.into_iter().map(|n| graph[n]).collect();
            members.sort_unstable();
            members
        })
        .collect();
    cycles.sort();

    cycles
        .into_iter()
        .map(|members| {
            let names: Vec<&str> = members
                .iter()
                .map(|&pos| draft.components[pos].name.as_str())
                .collect();
            let head = names[0];
            let path = if names.len() == 1 {
                format!("{} -> {}", head, head)
            } else {
                format!("{} -> {}", names.join(" -> "), head)
            };
            StructuralIssue::new(
                StructuralRule::CircularDependency,
                head,
                "dependencies",
                format!("circular dependency: {}", path),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::draft::{ApiEndpoint, Component, DataModel};

    fn comp(name: &str, kind: &str, deps: &[&str]) -> Component {
        Component {
            name: name.to_string(),
            kind: kind.to_string(),
            purpose: format!("{} purpose", name),
            file_path: String::new(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn draft(components: Vec<Component>) -> Draft {
        Draft {
            components,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolving_dependencies_accepted() {
        let d = draft(vec![
            comp("Api", "API", &["AuthService", "TaskStore"]),
            comp("AuthService", "Subsystem", &["TaskStore"]),
            comp("TaskStore", "DataStore", &[]),
        ]);
        assert!(check_draft(&d).is_ok());
        assert!(collect_issues(&d).is_empty());
    }

    #[test]
    fn test_dangling_dependency_rejected() {
        let d = draft(vec![
            comp("Api", "API", &["AuthService"]),
            comp("TaskStore", "DataStore", &[]),
        ]);
        let issue = check_draft(&d).unwrap_err();
        assert_eq!(issue.rule, StructuralRule::UnresolvedDependency);
        assert_eq!(issue.pointer(), "Api.dependencies");
        assert!(issue.detail.contains("'AuthService'"));
    }

    #[test]
    fn test_duplicate_name_reported_first() {
        let d = draft(vec![
            comp("Store", "DataStore", &["Missing"]),
            comp("Store", "DataStore", &[]),
        ]);
        let issue = check_draft(&d).unwrap_err();
        assert_eq!(issue.rule, StructuralRule::DuplicateName);
        assert_eq!(collect_issues(&d).len(), 2);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let d = draft(vec![comp("Widget", "Gizmo", &[])]);
        let issue = check_draft(&d).unwrap_err();
        assert_eq!(issue.rule, StructuralRule::UnknownComponentType);
        assert_eq!(issue.pointer(), "Widget.type");
    }

    #[test]
    fn test_cycle_rejected() {
        let d = draft(vec![
            comp("A", "Subsystem", &["B"]),
            comp("B", "Subsystem", &["C"]),
            comp("C", "Subsystem", &["A"]),
            comp("D", "Utility", &[]),
        ]);
        let issue = check_draft(&d).unwrap_err();
        assert_eq!(issue.rule, StructuralRule::CircularDependency);
        assert_eq!(issue.detail, "circular dependency: A -> B -> C -> A");
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let d = draft(vec![comp("A", "Agent", &["A"])]);
        let issue = check_draft(&d).unwrap_err();
        assert_eq!(issue.rule, StructuralRule::CircularDependency);
        assert_eq!(issue.detail, "circular dependency: A -> A");
    }

    #[test]
    fn test_endpoints_need_data_models() {
        let mut d = draft(vec![comp("TaskApi", "API", &[])]);
        d.api_endpoints.push(ApiEndpoint {
            method: "GET".into(),
            path: "/api/tasks".into(),
            ..Default::default()
        });
        let issue = check_draft(&d).unwrap_err();
        assert_eq!(issue.rule, StructuralRule::EndpointsWithoutModels);
        assert_eq!(issue.pointer(), "data_models");

        d.data_models.push(DataModel {
            name: "Task".into(),
            fields: vec![],
        });
        assert!(check_draft(&d).is_ok());
    }

    #[test]
    fn test_endpoint_rule_reported_after_cycles() {
        let mut d = draft(vec![comp("A", "Subsystem", &["A"])]);
        d.api_endpoints.push(ApiEndpoint::default());
        let rules: Vec<StructuralRule> = collect_issues(&d).iter().map(|i| i.rule).collect();
        assert_eq!(
            rules,
            vec![
                StructuralRule::CircularDependency,
                StructuralRule::EndpointsWithoutModels
            ]
        );
    }

    #[test]
    fn test_empty_draft_rejected() {
        let issue = check_draft(&Draft::default()).unwrap_err();
        assert_eq!(issue.rule, StructuralRule::NoComponents);
        assert_eq!(issue.pointer(), "components");
    }
}
