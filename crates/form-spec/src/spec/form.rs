use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FormError;
use crate::spec::question::Question;

/// A form bound to one upstream table, owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "owner")]
    pub owner_id: String,
    #[serde(alias = "airtableBaseId")]
    pub base_id: String,
    #[serde(alias = "airtableTableId")]
    pub table_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Form {
    /// Creates an empty form for the selected base and table.
    pub fn new(
        owner_id: impl Into<String>,
        base_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            base_id: base_id.into(),
            table_id: table_id.into(),
            created_at: Utc::now(),
            questions: Vec::new(),
        }
    }

    pub fn question(&self, key: &str) -> Option<&Question> {
        self.questions
            .iter()
            .find(|question| question.question_key == key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.questions
            .iter()
            .position(|question| question.question_key == key)
    }

    /// Appends a question, keeping question keys unique.
    pub fn push_question(&mut self, question: Question) -> Result<(), FormError> {
        if self.question(&question.question_key).is_some() {
            return Err(FormError::DuplicateQuestion(question.question_key));
        }
        self.questions.push(question);
        Ok(())
    }

    pub fn summary(&self) -> FormSummary {
        FormSummary {
            id: self.id.clone(),
            base_id: self.base_id.clone(),
            table_id: self.table_id.clone(),
            created_at: self.created_at,
            question_count: self.questions.len(),
        }
    }
}

/// Listing entry for the owner's forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub id: String,
    pub base_id: String,
    pub table_id: String,
    pub created_at: DateTime<Utc>,
    pub question_count: usize,
}
