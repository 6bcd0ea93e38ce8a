//! Output schemas for structured model calls
//!
//! A schema is an ordered list of named, typed fields. It produces the JSON
//! example sent to the model, the type-driven default used after retry
//! exhaustion, and the per-field repair applied to partially valid output.

use serde_json::{Map, Value};

/// Placeholder text for fields the model never produced
pub fn placeholder_text(name: &str) -> String {
    format!("Unable to generate {}", name.replace('_', " "))
}

// ─────────────────────────────────────────────────────────────────
// Field Types
// ─────────────────────────────────────────────────────────────────

/// Value type of a schema field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Number clamped into [0, 1]
    Score,
    /// Free text
    Text,
    /// List of strings
    List,
    /// Boolean
    Flag,
    /// Nested record
    Object(OutputSchema),
}

/// A single named field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
}

impl FieldSpec {
    fn example(&self) -> Value {
        match &self.kind {
            FieldKind::Score => Value::from(0.5),
            FieldKind::Text => Value::String(self.description.clone()),
            FieldKind::List => Value::Array(vec![Value::String(self.description.clone())]),
            FieldKind::Flag => Value::Bool(true),
            FieldKind::Object(inner) => inner.example(),
        }
    }

    fn default_value(&self) -> Value {
        match &self.kind {
            FieldKind::Score => Value::from(0.0),
            FieldKind::Text => Value::String(placeholder_text(&self.name)),
            FieldKind::List => Value::Array(vec![Value::String(placeholder_text(&self.name))]),
            FieldKind::Flag => Value::Bool(false),
            FieldKind::Object(inner) => inner.default_value(),
        }
    }

    /// Coerce a present value into this field's type; `None` when unusable
    fn coerce(&self, value: Value) -> Option<(Value, Vec<String>)> {
        match (&self.kind, value) {
            (_, Value::Null) => None,

            (FieldKind::Score, Value::Number(n)) => {
                n.as_f64().map(|f| (Value::from(clamp_score(f)), Vec::new()))
            }
            (FieldKind::Score, Value::String(s)) => s
                .trim()
                .trim_end_matches('%')
                .parse::<f64>()
                .ok()
                .map(|f| if s.trim().ends_with('%') { f / 100.0 } else { f })
                .map(|f| (Value::from(clamp_score(f)), Vec::new())),

            (FieldKind::Text, Value::String(s)) if !s.trim().is_empty() => {
                Some((Value::String(s), Vec::new()))
            }
            (FieldKind::Text, v @ (Value::Number(_) | Value::Bool(_))) => {
                Some((Value::String(v.to_string()), Vec::new()))
            }
            (FieldKind::Text, Value::Array(items)) if !items.is_empty() => {
                let joined = items.iter().map(stringify).collect::<Vec<_>>().join("\n");
                Some((Value::String(joined), Vec::new()))
            }

            (FieldKind::List, Value::Array(items)) => {
                let items: Vec<Value> = items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| Value::String(stringify(v)))
                    .collect();
                Some((Value::Array(items), Vec::new()))
            }
            (FieldKind::List, Value::String(s)) if !s.trim().is_empty() => {
                Some((Value::Array(vec![Value::String(s)]), Vec::new()))
            }

            (FieldKind::Flag, Value::Bool(b)) => Some((Value::Bool(b), Vec::new())),
            (FieldKind::Flag, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" => Some((Value::Bool(true), Vec::new())),
                "false" | "no" | "n" => Some((Value::Bool(false), Vec::new())),
                _ => None,
            },
            (FieldKind::Flag, Value::Number(n)) => {
                n.as_f64().map(|f| (Value::Bool(f != 0.0), Vec::new()))
            }

            (FieldKind::Object(inner), v @ Value::Object(_)) => {
                let repaired = inner.fill_missing(v);
                let filled = repaired
                    .filled
                    .into_iter()
                    .map(|f| format!("{}.{}", self.name, f))
                    .collect();
                Some((repaired.value, filled))
            }

            _ => None,
        }
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────
// Output Schema
// ─────────────────────────────────────────────────────────────────

/// Result of repairing a parsed value against a schema
#[derive(Debug, Clone)]
pub struct Repaired {
    /// Value with every declared field present and typed
    pub value: Value,
    /// Dotted names of fields that had to be default-filled
    pub filled: Vec<String>,
}

impl Repaired {
    /// Top-level fields replaced wholesale by their defaults
    ///
    /// Gaps inside a nested object that was otherwise present do not count.
    pub fn top_level_filled(&self) -> usize {
        self.filled.iter().filter(|name| !name.contains('.')).count()
    }
}

/// Ordered set of typed fields describing the expected JSON object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSchema {
    fields: Vec<FieldSpec>,
}

impl OutputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field
    pub fn field(
        mut self,
        name: impl Into<String>,
        kind: FieldKind,
        description: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            description: description.into(),
        });
        self
    }

    pub fn score(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.field(name, FieldKind::Score, description)
    }

    pub fn text(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.field(name, FieldKind::Text, description)
    }

    pub fn list(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.field(name, FieldKind::List, description)
    }

    pub fn flag(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.field(name, FieldKind::Flag, description)
    }

    pub fn object(
        self,
        name: impl Into<String>,
        inner: OutputSchema,
        description: impl Into<String>,
    ) -> Self {
        self.field(name, FieldKind::Object(inner), description)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON example with representative values for every field
    pub fn example(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.example()))
                .collect(),
        )
    }

    /// Pretty-printed example, used as the format hint
    pub fn example_string(&self) -> String {
        serde_json::to_string_pretty(&self.example()).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line per field with its type and meaning
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, "");
        out
    }

    fn describe_into(&self, out: &mut String, prefix: &str) {
        for f in &self.fields {
            let kind = match f.kind {
                FieldKind::Score => "number between 0 and 1",
                FieldKind::Text => "string",
                FieldKind::List => "list of strings",
                FieldKind::Flag => "boolean",
                FieldKind::Object(_) => "object",
            };
            out.push_str(&format!("- {}{} ({}): {}\n", prefix, f.name, kind, f.description));
            if let FieldKind::Object(inner) = &f.kind {
                inner.describe_into(out, &format!("{}{}.", prefix, f.name));
            }
        }
    }

    /// Type-driven default for the whole record
    pub fn default_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.default_value()))
                .collect(),
        )
    }

    /// Coerce every declared field, default-filling the unusable ones
    ///
    /// Keys outside the schema are kept untouched. A bare array is accepted
    /// for a schema whose only field is a list.
    pub fn fill_missing(&self, value: Value) -> Repaired {
        let mut object = match value {
            Value::Object(map) => map,
            Value::Array(items) if self.single_list_field().is_some() => {
                let mut map = Map::new();
                if let Some(name) = self.single_list_field() {
                    map.insert(name.to_string(), Value::Array(items));
                }
                map
            }
            _ => {
                return Repaired {
                    value: self.default_value(),
                    filled: self.fields.iter().map(|f| f.name.clone()).collect(),
                }
            }
        };

        let mut filled = Vec::new();
        for field in &self.fields {
            let coerced = object.remove(&field.name).and_then(|v| field.coerce(v));
            let value = match coerced {
                Some((value, nested)) => {
                    filled.extend(nested);
                    value
                }
                None => {
                    filled.push(field.name.clone());
                    field.default_value()
                }
            };
            object.insert(field.name.clone(), value);
        }

        Repaired {
            value: Value::Object(object),
            filled,
        }
    }

    fn single_list_field(&self) -> Option<&str> {
        match self.fields.as_slice() {
            [only] if only.kind == FieldKind::List => Some(&only.name),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
