use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Declared type of a contract field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    /// Whether a JSON value has this type. Integers are also numbers.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Whether a field produced as `self` can be consumed as `consumer`
    pub fn satisfies(&self, consumer: FieldType) -> bool {
        *self == consumer || (*self == Self::Integer && consumer == Self::Number)
    }

    /// Name of the JSON type a value actually has
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        };
        write!(f, "{name}")
    }
}

/// Optional constraints on a produced field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConstraints {
    #[serde(alias = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(alias = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(alias = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(alias = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<String>>,
}

impl FieldConstraints {
    /// Check a value already known to have the right type.
    /// Returns `(constraint, detail)` pairs for every failed constraint.
    pub fn check(&self, value: &Value) -> Vec<(String, String)> {
        let mut failures = Vec::new();

        if let Value::String(s) = value {
            let length = s.chars().count();
            if let Some(min) = self.min_length {
                if length < min {
                    failures.push((
                        "min_length".to_string(),
                        format!("length {length} is below minimum {min}"),
                    ));
                }
            }
            if let Some(max) = self.max_length {
                if length > max {
                    failures.push((
                        "max_length".to_string(),
                        format!("length {length} exceeds maximum {max}"),
                    ));
                }
            }
            if let Some(allowed) = &self.one_of {
                if !allowed.iter().any(|candidate| candidate == s) {
                    failures.push((
                        "one_of".to_string(),
                        format!("'{s}' is not one of {allowed:?}"),
                    ));
                }
            }
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum {
                if n < min {
                    failures.push(("minimum".to_string(), format!("{n} is below minimum {min}")));
                }
            }
            if let Some(max) = self.maximum {
                if n > max {
                    failures.push(("maximum".to_string(), format!("{n} exceeds maximum {max}")));
                }
            }
        }

        if let (Value::Array(items), Some(min)) = (value, self.min_items) {
            if items.len() < min {
                failures.push((
                    "min_items".to_string(),
                    format!("{} items is below minimum {min}", items.len()),
                ));
            }
        }

        failures
    }
}

/// Keys `FieldConstraints` understands, aliases included
const CONSTRAINT_KEYS: [&str; 10] = [
    "min_length",
    "minLength",
    "max_length",
    "maxLength",
    "minimum",
    "maximum",
    "min_items",
    "minItems",
    "one_of",
    "oneOf",
];

/// A field a stage guarantees to produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducedField {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(flatten)]
    pub constraints: FieldConstraints,
    /// Everything else declared on the field, e.g. a misspelt constraint
    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

impl ProducedField {
    pub fn new(field_type: FieldType, constraints: FieldConstraints) -> Self {
        Self {
            field_type,
            constraints,
            unknown: BTreeMap::new(),
        }
    }

    /// Declared keys that are not a recognised constraint
    pub fn unknown_constraints(&self) -> impl Iterator<Item = &str> {
        // Aliased keys can be left in the catch-all map by the flattened parse
        self.unknown
            .keys()
            .map(String::as_str)
            .filter(|key| !CONSTRAINT_KEYS.contains(key))
    }
}

/// A field a stage reads from an earlier stage's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumedField {
    pub stage: u32,
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// One stage as written in the contract file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub name: String,
    #[serde(default)]
    pub consumes: Vec<ConsumedField>,
    #[serde(default)]
    pub produces: BTreeMap<String, ProducedField>,
}

/// Top-level shape of the contract file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractFile {
    #[serde(default = "default_version")]
    pub version: String,
    pub stages: BTreeMap<u32, StageDefinition>,
}

fn default_version() -> String {
    "unversioned".to_string()
}

/// Integrity-checked, read-only contract for one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageContract {
    pub stage_number: u32,
    pub name: String,
    pub consumes: Vec<ConsumedField>,
    pub produces: BTreeMap<String, ProducedField>,
}

/// What went wrong with one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// No contract exists for the stage
    UnknownStage,
    /// The upstream stage's output was not supplied at all
    MissingUpstreamOutput,
    /// Output is not a JSON object
    NotAnObject,
    MissingField,
    TypeMismatch { expected: String, actual: String },
    ConstraintViolated { constraint: String, detail: String },
}

/// A single pre- or post-condition failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractViolation {
    pub stage: u32,
    pub field: String,
    /// Stage the field is consumed from (pre-stage checks only)
    pub source_stage: Option<u32>,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl ContractViolation {
    pub fn message(&self) -> String {
        let origin = self
            .source_stage
            .map(|source| format!(" (from stage {source})"))
            .unwrap_or_default();
        match &self.kind {
            ViolationKind::UnknownStage => format!("no contract for stage {}", self.stage),
            ViolationKind::MissingUpstreamOutput => format!(
                "stage {}: output of stage {} was not supplied",
                self.stage,
                self.source_stage.unwrap_or_default()
            ),
            ViolationKind::NotAnObject => {
                format!("stage {}: output must be an object", self.stage)
            }
            ViolationKind::MissingField => {
                format!("stage {}: missing field '{}'{origin}", self.stage, self.field)
            }
            ViolationKind::TypeMismatch { expected, actual } => format!(
                "stage {}: field '{}'{origin} expected {expected}, got {actual}",
                self.stage, self.field
            ),
            ViolationKind::ConstraintViolated { constraint, detail } => format!(
                "stage {}: field '{}' violates {constraint}: {detail}",
                self.stage, self.field
            ),
        }
    }
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_matching() {
        assert!(FieldType::Number.matches(&json!(3)));
        assert!(FieldType::Number.matches(&json!(3.5)));
        assert!(FieldType::Integer.matches(&json!(3)));
        assert!(!FieldType::Integer.matches(&json!(3.5)));
        assert!(!FieldType::String.matches(&Value::Null));
        assert_eq!(FieldType::describe(&json!([1])), "array");
        assert_eq!(FieldType::describe(&json!(1.25)), "number");
    }

    #[test]
    fn test_integer_producer_satisfies_number_consumer() {
        assert!(FieldType::Integer.satisfies(FieldType::Number));
        assert!(!FieldType::Number.satisfies(FieldType::Integer));
        assert!(!FieldType::String.satisfies(FieldType::Object));
    }

    #[test]
    fn test_constraint_checks() {
        let constraints = FieldConstraints {
            min_length: Some(5),
            one_of: Some(vec!["alpha".to_string(), "bravo".to_string()]),
            ..Default::default()
        };
        assert!(constraints.check(&json!("alpha")).is_empty());
        let failures = constraints.check(&json!("abc"));
        let names: Vec<&str> = failures.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["min_length", "one_of"]);

        let bounds = FieldConstraints {
            minimum: Some(0.0),
            maximum: Some(10.0),
            ..Default::default()
        };
        assert!(bounds.check(&json!(10)).is_empty());
        assert_eq!(bounds.check(&json!(11)).len(), 1);

        let items = FieldConstraints {
            min_items: Some(2),
            ..Default::default()
        };
        assert_eq!(items.check(&json!(["one"])).len(), 1);
    }

    #[test]
    fn test_produced_field_accepts_camel_case_constraints() {
        let field: ProducedField =
            serde_yaml::from_str("type: string\nminLength: 12\n").unwrap();
        assert_eq!(field.field_type, FieldType::String);
        assert_eq!(field.constraints.min_length, Some(12));
        assert_eq!(field.unknown_constraints().count(), 0);
    }

    #[test]
    fn test_produced_field_keeps_unrecognised_keys() {
        let field: ProducedField =
            serde_yaml::from_str("type: string
min_length: 3
minLenght: 12
").unwrap();
        assert_eq!(field.constraints.min_length, Some(3));
        assert_eq!(field.unknown_constraints().collect::<Vec<_>>(), vec!["minLenght"]);
    }

    #[test]
    fn test_consumed_field_defaults_to_required() {
        let field: ConsumedField =
            serde_yaml::from_str("stage: 1\nfield: summary\ntype: string\n").unwrap();
        assert!(field.required);
    }
}
