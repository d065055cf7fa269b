use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::condition::ConditionalRules;

/// Field types a question can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    SingleLineText,
    MultilineText,
    SingleSelect,
    MultipleSelects,
    MultipleAttachments,
}

impl QuestionType {
    pub const ALL: [QuestionType; 5] = [
        QuestionType::SingleLineText,
        QuestionType::MultilineText,
        QuestionType::SingleSelect,
        QuestionType::MultipleSelects,
        QuestionType::MultipleAttachments,
    ];

    /// Provider type name, e.g. `singleSelect`.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleLineText => "singleLineText",
            QuestionType::MultilineText => "multilineText",
            QuestionType::SingleSelect => "singleSelect",
            QuestionType::MultipleSelects => "multipleSelects",
            QuestionType::MultipleAttachments => "multipleAttachments",
        }
    }

    /// Returns `None` for provider types outside the supported subset.
    pub fn from_provider(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == kind)
    }

    pub fn is_select(&self) -> bool {
        matches!(self, QuestionType::SingleSelect | QuestionType::MultipleSelects)
    }

    /// Types whose answers are sequences rather than a single text.
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            QuestionType::MultipleSelects | QuestionType::MultipleAttachments
        )
    }
}

/// A form element bound to one catalog field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_key: String,
    #[serde(alias = "airtableFieldId")]
    pub field_id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub conditional_rules: Option<ConditionalRules>,
}

impl Question {
    pub fn is_conditional(&self) -> bool {
        self.conditional_rules.is_some()
    }
}
