use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::FormError;
use crate::spec::question::QuestionType;

/// A base (workspace) exposed by the table provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    pub id: String,
    pub name: String,
}

/// One option of a select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Choice {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawFieldOptions {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// Field definition exactly as the provider returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RawFieldOptions>,
}

/// Table metadata as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<RawField>,
}

/// Body of the provider's table listing for one base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TableListing {
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// Normalized field limited to the supported question types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
}

impl CatalogField {
    /// Choice labels in provider order; empty for non-select fields.
    pub fn choice_names(&self) -> Vec<&str> {
        self.choices
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|choice| choice.name.as_str())
            .collect()
    }

    pub fn has_choice(&self, name: &str) -> bool {
        self.choices
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|choice| choice.name == name)
    }
}

/// Maps a raw provider field into the supported subset, dropping anything else.
pub fn normalize_field(raw: &RawField) -> Option<CatalogField> {
    let kind = QuestionType::from_provider(&raw.kind)?;
    let choices = if kind.is_select() {
        Some(
            raw.options
                .as_ref()
                .map(|options| options.choices.clone())
                .unwrap_or_default(),
        )
    } else {
        None
    };
    Some(CatalogField {
        id: raw.id.clone(),
        name: raw.name.clone(),
        kind,
        choices,
    })
}

pub fn normalize_fields(raw: &[RawField]) -> Vec<CatalogField> {
    raw.iter().filter_map(normalize_field).collect()
}

/// Supported fields of one upstream table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub table_id: String,
    pub fields: Vec<CatalogField>,
}

impl Catalog {
    pub fn new(table_id: impl Into<String>, fields: Vec<CatalogField>) -> Self {
        Self {
            table_id: table_id.into(),
            fields,
        }
    }

    /// An empty catalog used when the selected table is missing upstream.
    pub fn empty(table_id: impl Into<String>) -> Self {
        Self::new(table_id, Vec::new())
    }

    /// Picks `table_id` out of a provider listing and normalizes its fields.
    pub fn from_tables(tables: &[Table], table_id: &str) -> Result<Self, FormError> {
        let table = tables
            .iter()
            .find(|table| table.id == table_id)
            .ok_or_else(|| FormError::TableNotFound(table_id.to_string()))?;
        Ok(Self::new(table_id, normalize_fields(&table.fields)))
    }

    pub fn field(&self, field_id: &str) -> Option<&CatalogField> {
        self.fields.iter().find(|field| field.id == field_id)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
