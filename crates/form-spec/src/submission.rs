use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::encode::{PartBody, TransportPayload};
use crate::spec::form::Form;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SubmissionStatus {
    #[default]
    Active,
    Deleted,
}

/// A stored response row; never edited once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: Uuid,
    pub form_id: String,
    pub answers: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: SubmissionStatus,
}

impl Submission {
    /// Builds the stored row for an encoded payload of `form`.
    ///
    /// Multi-select and attachment questions always store an array, even
    /// with a single element. Other names store a string for one text part
    /// and an array for repeated parts.
    pub fn record(form: &Form, payload: &TransportPayload) -> Self {
        let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for part in payload.parts() {
            let value = match &part.body {
                PartBody::Text(text) => Value::String(text.clone()),
                PartBody::File(file) => json!({
                    "fileName": file.file_name,
                    "contentType": file.content_type,
                    "size": file.size(),
                }),
            };
            grouped.entry(part.name.clone()).or_default().push(value);
        }

        let answers = grouped
            .into_iter()
            .map(|(name, mut values)| {
                let multi = form
                    .question(&name)
                    .is_some_and(|question| question.kind.is_multi_valued());
                let single_text = !multi && values.len() == 1 && values[0].is_string();
                let value = if single_text {
                    values.remove(0)
                } else {
                    Value::Array(values)
                };
                (name, value)
            })
            .collect();

        Self {
            submission_id: Uuid::new_v4(),
            form_id: form.id.clone(),
            answers,
            created_at: Utc::now(),
            status: SubmissionStatus::Active,
        }
    }

    /// Short one-line rendering of the answers for listings.
    pub fn preview(&self) -> String {
        self.answers
            .iter()
            .map(|(key, value)| match value {
                Value::String(text) => format!("{}: {}", key, text),
                other => format!("{}: {}", key, other),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
