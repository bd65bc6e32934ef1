use serde_json::{Map, Value};

/// Generation parameters as stored on a job: a JSON object whose keys are
/// provider specific.
pub type Parameters = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRule {
    /// Field must be present and hold something: not null, not a blank
    /// string, not an empty list.
    Required(String),
    /// At least one of the listed fields must be present. The first name is
    /// the canonical one; the rest are accepted aliases.
    OneOf(Vec<String>),
    /// Field holds an array whose length lies within `min..=max`. Any other
    /// value counts as zero items.
    ListLength {
        field: String,
        min: usize,
        max: usize,
    },
}

impl FieldRule {
    pub fn field(&self) -> &str {
        match self {
            FieldRule::Required(field) => field,
            FieldRule::OneOf(fields) => fields.first().map(String::as_str).unwrap_or_default(),
            FieldRule::ListLength { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub fields: Vec<String>,
    pub message: String,
}

/// Per-model parameter schema published by a provider adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    rules: Vec<FieldRule>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, field: &str) -> Self {
        self.rules.push(FieldRule::Required(field.to_string()));
        self
    }

    pub fn require_one_of(mut self, fields: &[&str]) -> Self {
        self.rules.push(FieldRule::OneOf(
            fields.iter().map(|f| (*f).to_string()).collect(),
        ));
        self
    }

    pub fn list_length(mut self, field: &str, min: usize, max: usize) -> Self {
        self.rules.push(FieldRule::ListLength {
            field: field.to_string(),
            min,
            max,
        });
        self
    }

    /// Checks every rule and reports all offending fields at once.
    pub fn check(&self, parameters: &Parameters) -> Result<(), SchemaViolation> {
        let mut fields = Vec::new();
        let mut reasons = Vec::new();

        for rule in &self.rules {
            match rule {
                FieldRule::Required(field) => {
                    if !is_present(parameters.get(field)) {
                        fields.push(field.clone());
                        reasons.push(format!("missing required parameter '{}'", field));
                    }
                }
                FieldRule::OneOf(names) => {
                    if !names.iter().any(|n| is_present(parameters.get(n))) {
                        fields.push(rule.field().to_string());
                        reasons.push(format!("one of [{}] is required", names.join(", ")));
                    }
                }
                FieldRule::ListLength { field, min, max } => {
                    let len = list_len(parameters.get(field));
                    if len < *min || len > *max {
                        fields.push(field.clone());
                        reasons.push(if min == max {
                            format!("'{}' must contain exactly {} item(s), got {}", field, min, len)
                        } else if *max == usize::MAX {
                            format!("'{}' must contain at least {} item(s), got {}", field, min, len)
                        } else {
                            format!(
                                "'{}' must contain between {} and {} item(s), got {}",
                                field, min, max, len
                            )
                        });
                    }
                }
            }
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolation {
                fields,
                message: reasons.join("; "),
            })
        }
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn list_len(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Array(items)) => items.iter().filter(|v| is_present(Some(v))).count(),
        _ => 0,
    }
}
