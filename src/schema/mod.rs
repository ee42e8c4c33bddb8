//! Configuration schemas and the generic configuration form.
//!
//! A schema is a static table of [`FieldSpec`]s plus a pure `validate`
//! function turning raw string fields (as submitted by an admin form, CLI or
//! API call) into a typed record. [`ConfigForm`] is implemented once on top of
//! any schema and provides the form definition with current values and the
//! submission path.

mod error;
mod idp;

use std::collections::BTreeMap;

pub use error::*;
pub use idp::*;
use serde::Serialize;

/// Raw field values keyed by field name.
pub type RawFields = BTreeMap<String, String>;

/// Input widget used to edit a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum FieldKind {
    /// Boolean, submitted as `1` or `0`
    YesNo,
    /// One of a fixed set of values
    Select { options: &'static [&'static str] },
    /// Free text with a maximum length in characters
    Text { max_length: usize },
    /// Absolute http(s) URL
    Url,
    /// Identifier carried through the form but not edited
    Hidden,
}

/// Static description of one configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub help: &'static str,
    pub kind: FieldKind,
    /// Value used when the field is not submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

/// A set of recognised configuration keys and how to validate them.
pub trait ConfigSchema: Send + Sync {
    /// Typed record produced by a successful validation.
    type Record;

    /// Field table, in display order.
    fn fields(&self) -> &'static [FieldSpec];

    /// Validate raw fields into a record.
    ///
    /// Unknown keys are ignored and missing optional keys take their default.
    /// All field errors are reported together.
    fn validate(&self, raw: &RawFields) -> Result<Self::Record, ValidationErrors>;

    /// Serialize a record back to raw fields accepted by [`ConfigSchema::validate`].
    fn to_raw_fields(&self, record: &Self::Record) -> RawFields;

    /// Defaults for every field that has one.
    fn defaults(&self) -> RawFields {
        self.fields()
            .iter()
            .filter_map(|spec| spec.default.map(|d| (spec.key.to_string(), d.to_string())))
            .collect()
    }
}

/// Configuration form over a schema.
#[derive(Debug, Clone, Default)]
pub struct ConfigForm<S> {
    schema: S,
}

impl<S: ConfigSchema> ConfigForm<S> {
    pub fn new(schema: S) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// Form fields with their current values.
    ///
    /// Values start from the schema defaults and are overlaid with the
    /// existing record, if any.
    pub fn definition(&self, existing: Option<&S::Record>) -> FormDefinition {
        let mut values = self.schema.defaults();
        if let Some(record) = existing {
            values.extend(self.schema.to_raw_fields(record));
        }

        let fields = self
            .schema
            .fields()
            .iter()
            .map(|spec| FormField {
                spec: *spec,
                value: values.get(spec.key).cloned().unwrap_or_default(),
            })
            .collect();

        FormDefinition { fields }
    }

    /// Validate a submission. Nothing is persisted here.
    pub fn submit(&self, raw: &RawFields) -> Result<S::Record, ValidationErrors> {
        self.schema.validate(raw)
    }
}

/// Rendered form: every field with its current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormDefinition {
    pub fields: Vec<FormField>,
}

impl FormDefinition {
    pub fn value(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.spec.key == key)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    #[serde(flatten)]
    pub spec: FieldSpec,
    pub value: String,
}
