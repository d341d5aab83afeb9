//! FHIR resource shapes returned by the terminology server
//!
//! Only the parts the tools read are modelled. Expansion entries stay as raw JSON
//! because they are passed through to the caller untouched.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueSet {
    #[serde(default)]
    pub expansion: Option<ValueSetExpansion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueSetExpansion {
    #[serde(default)]
    pub contains: Option<Vec<Value>>,
}

impl ValueSet {
    /// First entry of the expansion, in the order the server ranked them.
    pub fn first_match(&self) -> Option<&Value> {
        self.expansion
            .as_ref()
            .and_then(|expansion| expansion.contains.as_deref())
            .and_then(|contains| contains.first())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Parameters {
    #[serde(default)]
    pub parameter: Vec<Parameter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub value_boolean: Option<bool>,
    #[serde(default)]
    pub value_string: Option<String>,
    #[serde(default)]
    pub value_code: Option<String>,
    #[serde(default)]
    pub value_uri: Option<String>,
    #[serde(default)]
    pub value_canonical: Option<String>,
    #[serde(default)]
    pub value_integer: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Boolean(bool),
    String(String),
    Code(String),
    Uri(String),
    Canonical(String),
    Integer(i64),
}

impl Parameter {
    pub fn value(&self) -> Option<ParameterValue> {
        if let Some(value) = self.value_boolean {
            return Some(ParameterValue::Boolean(value));
        }
        if let Some(value) = &self.value_string {
            return Some(ParameterValue::String(value.clone()));
        }
        if let Some(value) = &self.value_code {
            return Some(ParameterValue::Code(value.clone()));
        }
        if let Some(value) = &self.value_uri {
            return Some(ParameterValue::Uri(value.clone()));
        }
        if let Some(value) = &self.value_canonical {
            return Some(ParameterValue::Canonical(value.clone()));
        }
        self.value_integer.map(ParameterValue::Integer)
    }
}

impl ParameterValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(value) | Self::Code(value) | Self::Uri(value) | Self::Canonical(value) => {
                Some(value.as_str())
            }
            Self::Boolean(_) | Self::Integer(_) => None,
        }
    }
}

/// Name-indexed view over a `Parameters` resource. The first occurrence of a name wins.
#[derive(Debug, Clone, Default)]
pub struct ParameterMap {
    values: HashMap<String, ParameterValue>,
}

impl ParameterMap {
    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(ParameterValue::as_bool)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(ParameterValue::as_text)
    }
}

impl From<&Parameters> for ParameterMap {
    fn from(parameters: &Parameters) -> Self {
        let mut values = HashMap::new();
        for parameter in &parameters.parameter {
            if let Some(value) = parameter.value() {
                values.entry(parameter.name.clone()).or_insert(value);
            }
        }
        Self { values }
    }
}
