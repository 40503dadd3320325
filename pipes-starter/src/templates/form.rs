// Schema-driven parameter form
//
// Holds one text value per schema field and converts them back into a typed parameter object on
// submit. Array fields are edited as comma-separated text.

use serde_json::{Number, Value};
use thiserror::Error;

use super::{get_template_metadata, ParamField, ParamKind};
use crate::models::config::{TemplateId, TemplateParams};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{label}: expected a number, got '{value}'")]
    InvalidNumber { label: String, value: String },
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub spec: ParamField,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamForm {
    template_id: TemplateId,
    fields: Vec<FormField>,
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let t = text.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Some(Number::from(i));
    }
    t.parse::<f64>().ok().and_then(Number::from_f64)
}

impl ParamForm {
    /// Build the form for a schema template. Recorded params win over schema defaults.
    ///
    /// Returns `None` for templates without a schema (including the custom-contracts template).
    pub fn for_template(template_id: TemplateId, existing: Option<&TemplateParams>) -> Option<Self> {
        let meta = get_template_metadata(template_id)?;
        let schema = meta.params_schema.as_ref()?;

        let fields = schema
            .iter()
            .map(|spec| {
                let value = existing
                    .and_then(|p| p.get(spec.name))
                    .or(spec.default.as_ref())
                    .map(value_to_text)
                    .unwrap_or_default();
                FormField {
                    spec: spec.clone(),
                    value,
                }
            })
            .collect();

        Some(Self {
            template_id,
            fields,
        })
    }

    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn value_mut(&mut self, index: usize) -> Option<&mut String> {
        self.fields.get_mut(index).map(|f| &mut f.value)
    }

    #[cfg(test)]
    pub fn set_value(&mut self, index: usize, value: impl Into<String>) {
        if let Some(v) = self.value_mut(index) {
            *v = value.into();
        }
    }

    /// Convert the text values into a parameter object, keys in schema order.
    pub fn submit(&self) -> Result<TemplateParams, FormError> {
        let mut out = TemplateParams::new();
        for field in &self.fields {
            let value = match field.spec.kind {
                ParamKind::String => Value::String(field.value.clone()),
                ParamKind::Number => match parse_number(&field.value) {
                    Some(n) => Value::Number(n),
                    None => {
                        return Err(FormError::InvalidNumber {
                            label: field.spec.label.to_string(),
                            value: field.value.clone(),
                        })
                    }
                },
                ParamKind::StringArray => Value::Array(
                    field
                        .value
                        .split(',')
                        .map(|v| v.trim())
                        .filter(|v| !v.is_empty())
                        .map(|v| Value::String(v.to_string()))
                        .collect(),
                ),
            };
            out.insert(field.spec.name.to_string(), value);
        }
        Ok(out)
    }
}
