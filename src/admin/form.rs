use std::collections::BTreeMap;

use crate::{
    admin::schema::{FormField, InputKind},
    configuration::AdminSettings,
    domain::CostPolicy,
};

/// Raw `application/x-www-form-urlencoded` pairs, repeated keys included.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(transparent)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// An HTML checkbox is only submitted when ticked.
    pub fn is_checked(&self, name: &str) -> bool {
        matches!(self.get(name), Some(v) if !v.is_empty() && v != "0" && v != "false")
    }

    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.0.push((name.to_string(), value.into()));
    }

    /// Replaces every value of `name` with a single one.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.retain(|(k, _)| k != name);
        self.push(name, value);
    }
}

impl<const N: usize> From<[(&str, &str); N]> for FormFields {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl ToString) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl ToString) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, message)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// What form parsing may consult besides the submission itself.
#[derive(Debug, Clone, Default)]
pub struct FormContext {
    pub settings: AdminSettings,
    pub choices: Vec<(&'static str, Vec<Choice>)>,
}

impl FormContext {
    pub fn cost_policy(&self) -> CostPolicy {
        CostPolicy::from_flag(self.settings.allow_negative_cost)
    }

    pub fn choices_for(&self, field: &str) -> &[Choice] {
        self.choices
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, choices)| choices.as_slice())
            .unwrap_or(&[])
    }
}

/// A form field ready for the template.
#[derive(Debug, serde::Serialize)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub input: InputKind,
    pub value: String,
    pub checked: bool,
    pub options: Vec<OptionView>,
    pub error: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub fn field_views(
    fields: &[FormField],
    values: &FormFields,
    context: &FormContext,
    errors: &FieldErrors,
) -> Vec<FieldView> {
    fields
        .iter()
        .map(|field| {
            let selected = values.get_all(field.name);
            let value = match field.input {
                // Never echo a password back.
                InputKind::Password => String::new(),
                _ => values.get(field.name).unwrap_or_default().to_string(),
            };

            FieldView {
                name: field.name,
                label: field.label,
                input: field.input,
                value,
                checked: values.is_checked(field.name),
                options: context
                    .choices_for(field.name)
                    .iter()
                    .map(|c| OptionView {
                        value: c.value.clone(),
                        label: c.label.clone(),
                        selected: selected.contains(&c.value.as_str()),
                    })
                    .collect(),
                error: errors.get(field.name).map(str::to_string),
            }
        })
        .collect()
}
