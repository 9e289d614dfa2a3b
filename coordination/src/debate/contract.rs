//! Response contract validator — checks and normalizes raw role output.
//!
//! Both roles answer with JSON text, optionally wrapped in a Markdown code
//! fence. Malformed input is an expected case: every function here returns
//! a [`ContractViolation`] instead of panicking, and never inspects the
//! semantic content of a draft or challenge.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::challenge::{Alternative, Challenge, ChallengeCategory, Severity, Verdict};
use super::draft::{ApiEndpoint, Component, ComponentType, DataModel, Draft, ModelField};

/// Why a response failed its contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationReason {
    /// A required field is absent.
    MissingField,
    /// A field has the wrong JSON type.
    WrongType,
    /// Fields are well-typed but break a schema rule.
    InvariantViolated,
    /// The response is not JSON at all.
    Unparseable,
}

impl std::fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField => write!(f, "missing_field"),
            Self::WrongType => write!(f, "wrong_type"),
            Self::InvariantViolated => write!(f, "invariant_violated"),
            Self::Unparseable => write!(f, "unparseable"),
        }
    }
}

/// A contract violation with a pointer to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractViolation {
    pub reason: ViolationReason,
    /// JSON path of the offending field (e.g. `components[1].purpose`).
    pub field: String,
    pub detail: String,
}

impl ContractViolation {
    fn new(reason: ViolationReason, field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            reason,
            field: field.into(),
            detail: detail.into(),
        }
    }

    fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        let detail = format!("required field '{}' is absent", field);
        Self::new(ViolationReason::MissingField, field, detail)
    }

    fn wrong_type(field: impl Into<String>, expected: &str) -> Self {
        let field = field.into();
        let detail = format!("field '{}' must be {}", field, expected);
        Self::new(ViolationReason::WrongType, field, detail)
    }

    fn invariant(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ViolationReason::InvariantViolated, field, detail)
    }
}

impl std::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at '{}': {}", self.reason, self.field, self.detail)
    }
}

impl std::error::Error for ContractViolation {}

/// A normalized reviewer response, before it is numbered into a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerResponse {
    pub verdict: Verdict,
    pub challenges: Vec<Challenge>,
}

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?\s*```").unwrap());

/// Strip the first Markdown code fence, if any, and trim.
pub fn strip_fences(text: &str) -> &str {
    match FENCE_RE.captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim(),
        None => text.trim(),
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, ContractViolation> {
    let body = strip_fences(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| {
        ContractViolation::new(ViolationReason::Unparseable, "$", e.to_string())
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ContractViolation::wrong_type("$", "an object")),
    }
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a str, ContractViolation> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(ContractViolation::missing(path)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ContractViolation::wrong_type(path, "a string")),
    }
}

fn non_empty_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a str, ContractViolation> {
    let s = required_str(obj, key, path)?;
    if s.trim().is_empty() {
        return Err(ContractViolation::invariant(path, "must not be empty"));
    }
    Ok(s)
}

fn optional_str(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<String, ContractViolation> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ContractViolation::wrong_type(path, "a string")),
    }
}

fn optional_str_list(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Vec<String>, ContractViolation> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::String(s) => Ok(s.clone()),
                _ => Err(ContractViolation::wrong_type(
                    format!("{}[{}]", path, i),
                    "a string",
                )),
            })
            .collect(),
        Some(_) => Err(ContractViolation::wrong_type(path, "an array of strings")),
    }
}

fn required_array<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Vec<Value>, ContractViolation> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(ContractViolation::missing(key)),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ContractViolation::wrong_type(key, "an array")),
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ContractViolation> {
    value
        .as_object()
        .ok_or_else(|| ContractViolation::wrong_type(path, "an object"))
}

fn optional_array<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a [Value], ContractViolation> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ContractViolation::wrong_type(path, "an array")),
    }
}

/// A payload example. Models often send the example as a JSON object
/// instead of a string; either is kept as text.
fn example_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn parse_data_models(obj: &Map<String, Value>) -> Result<Vec<DataModel>, ContractViolation> {
    let mut models = Vec::new();
    for (i, item) in optional_array(obj, "data_models", "data_models")?.iter().enumerate() {
        let path = format!("data_models[{}]", i);
        let model = as_object(item, &path)?;
        let name = non_empty_str(model, "name", &format!("{}.name", path))?;

        let mut fields = Vec::new();
        let fields_path = format!("{}.fields", path);
        for (j, field) in optional_array(model, "fields", &fields_path)?.iter().enumerate() {
            let field_path = format!("{}[{}]", fields_path, j);
            let field = as_object(field, &field_path)?;
            fields.push(ModelField {
                name: non_empty_str(field, "name", &format!("{}.name", field_path))?.to_string(),
                kind: optional_str(field, "type", &format!("{}.type", field_path))?,
                description: optional_str(field, "description", &format!("{}.description", field_path))?,
            });
        }

        models.push(DataModel {
            name: name.trim().to_string(),
            fields,
        });
    }
    Ok(models)
}

fn parse_api_endpoints(obj: &Map<String, Value>) -> Result<Vec<ApiEndpoint>, ContractViolation> {
    let mut endpoints = Vec::new();
    for (i, item) in optional_array(obj, "api_endpoints", "api_endpoints")?.iter().enumerate() {
        let path = format!("api_endpoints[{}]", i);
        let ep = as_object(item, &path)?;
        endpoints.push(ApiEndpoint {
            method: non_empty_str(ep, "method", &format!("{}.method", path))?
                .trim()
                .to_ascii_uppercase(),
            path: non_empty_str(ep, "path", &format!("{}.path", path))?.trim().to_string(),
            description: optional_str(ep, "description", &format!("{}.description", path))?,
            request_body: example_text(ep, "request_body"),
            query_params: example_text(ep, "query_params"),
            response: example_text(ep, "response").unwrap_or_default(),
            errors: example_text(ep, "errors").unwrap_or_default(),
        });
    }
    Ok(endpoints)
}

/// Validate and normalize an architect response into a [`Draft`].
///
/// Normalization maps common component-type aliases onto the fixed
/// enumeration and defaults the optional fields. Unknown types are kept
/// verbatim; rejecting them is the structural checker's job.
pub fn validate_architect(raw: &str) -> Result<Draft, ContractViolation> {
    let obj = parse_object(raw)?;
    let items = required_array(&obj, "components")?;

    let mut components = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = format!("components[{}]", i);
        let comp = as_object(item, &path)?;
        let name = non_empty_str(comp, "name", &format!("{}.name", path))?;
        let kind = non_empty_str(comp, "type", &format!("{}.type", path))?;
        let purpose = non_empty_str(comp, "purpose", &format!("{}.purpose", path))?;
        let kind = ComponentType::from_alias(kind)
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| kind.to_string());

        components.push(Component {
            name: name.trim().to_string(),
            kind,
            purpose: purpose.to_string(),
            file_path: optional_str(comp, "file_path", &format!("{}.file_path", path))?,
            dependencies: optional_str_list(
                comp,
                "dependencies",
                &format!("{}.dependencies", path),
            )?,
        });
    }

    let rationale = if obj.contains_key("rationale") {
        optional_str(&obj, "rationale", "rationale")?
    } else {
        optional_str(&obj, "design_rationale", "design_rationale")?
    };

    Ok(Draft {
        project_name: optional_str(&obj, "project_name", "project_name")?,
        tech_stack: optional_str_list(&obj, "tech_stack", "tech_stack")?,
        directory_structure: optional_str(&obj, "directory_structure", "directory_structure")?,
        components,
        data_models: parse_data_models(&obj)?,
        api_endpoints: parse_api_endpoints(&obj)?,
        key_decisions: optional_str_list(&obj, "key_decisions", "key_decisions")?,
        rationale,
    })
}

/// Candidate resolutions attached to a challenge.
///
/// Lenient: a set that is not an array, or holds an entry without a label,
/// comes back empty. The human decision gate then declines to open for it
/// and the challenge is handled as an ordinary critical revision.
fn parse_alternatives(chal: &Map<String, Value>) -> Vec<Alternative> {
    let Some(Value::Array(items)) = chal.get("alternatives") else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            let alt = item.as_object()?;
            let label = alt.get("label")?.as_str()?.trim();
            if label.is_empty() {
                return None;
            }
            Some(Alternative {
                label: label.to_string(),
                description: alt
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                recommended: alt.get("recommended").and_then(Value::as_bool).unwrap_or(false),
            })
        })
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

fn parse_challenge(item: &Value, index: usize) -> Result<Challenge, ContractViolation> {
    let path = format!("challenges[{}]", index);
    let chal = as_object(item, &path)?;

    let id_path = format!("{}.id", path);
    let id = match chal.get("id") {
        None | Some(Value::Null) => return Err(ContractViolation::missing(id_path)),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| ContractViolation::wrong_type(&id_path, "a positive integer"))?,
        Some(_) => return Err(ContractViolation::wrong_type(id_path, "a positive integer")),
    };
    let id = u32::try_from(id)
        .ok()
        .filter(|id| *id >= 1)
        .ok_or_else(|| ContractViolation::invariant(&id_path, "ids are 1-indexed"))?;

    let cat_path = format!("{}.category", path);
    let category = required_str(chal, "category", &cat_path)?;
    let category = ChallengeCategory::parse(category).ok_or_else(|| {
        ContractViolation::invariant(
            &cat_path,
            format!("unknown category '{}'", category),
        )
    })?;

    let sev_path = format!("{}.severity", path);
    let severity = match chal.get("severity") {
        None | Some(Value::Null) => Severity::Minor,
        Some(Value::String(s)) => Severity::parse(s).ok_or_else(|| {
            ContractViolation::invariant(&sev_path, format!("unknown severity '{}'", s))
        })?,
        Some(_) => return Err(ContractViolation::wrong_type(sev_path, "a string")),
    };

    let description =
        non_empty_str(chal, "description", &format!("{}.description", path))?.to_string();

    let behavioral = match chal.get("behavioral") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(ContractViolation::wrong_type(
                format!("{}.behavioral", path),
                "a boolean",
            ))
        }
    };

    // The size of the choice set is the gate's concern, not the contract's.
    Ok(Challenge {
        id,
        category,
        severity,
        description,
        behavioral,
        alternatives: parse_alternatives(chal),
    })
}

/// Validate and normalize a reviewer response.
///
/// Challenges are returned sorted by id. A missing severity defaults to
/// `minor`. The verdict/challenge-count invariant is enforced separately by
/// [`check_verdict_invariant`] so the orchestrator never trusts it.
pub fn validate_reviewer(raw: &str) -> Result<ReviewerResponse, ContractViolation> {
    let obj = parse_object(raw)?;

    let status = required_str(&obj, "status", "status")?;
    let verdict = Verdict::parse(status).ok_or_else(|| {
        ContractViolation::invariant("status", format!("unknown status '{}'", status))
    })?;

    let items = required_array(&obj, "challenges")?;
    let mut challenges = items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_challenge(item, i))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    for c in &challenges {
        if !seen.insert(c.id) {
            return Err(ContractViolation::invariant(
                "challenges",
                format!("duplicate challenge id {}", c.id),
            ));
        }
    }
    challenges.sort_by_key(|c| c.id);

    Ok(ReviewerResponse {
        verdict,
        challenges,
    })
}

/// `verified` must carry no challenges; `needs_revision` must carry some.
pub fn check_verdict_invariant(response: &ReviewerResponse) -> Result<(), ContractViolation> {
    match (response.verdict, response.challenges.is_empty()) {
        (Verdict::Verified, false) => Err(ContractViolation::invariant(
            "challenges",
            format!(
                "status 'verified' with {} challenge(s)",
                response.challenges.len()
            ),
        )),
        (Verdict::NeedsRevision, true) => Err(ContractViolation::invariant(
            "challenges",
            "status 'needs_revision' with no challenges",
        )),
        _ => Ok(()),
    }
}
