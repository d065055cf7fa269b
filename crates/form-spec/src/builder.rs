use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{Catalog, CatalogField};
use crate::error::FormError;
use crate::spec::condition::{Condition, ConditionalRules, Logic, Operator};
use crate::spec::form::Form;
use crate::spec::question::Question;

/// Composes a question from a selected catalog field.
///
/// This is the only place a [`ConditionalRules`] value is created, so rules
/// built here never carry an empty condition list.
pub fn build_question(
    selected: Option<&CatalogField>,
    label: Option<&str>,
    required: bool,
    conditions: Vec<Condition>,
    logic: Logic,
) -> Result<Question, FormError> {
    let field = selected.ok_or(FormError::InvalidSelection)?;
    let label = label
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or(field.name.as_str());
    let conditional_rules = if conditions.is_empty() {
        None
    } else {
        Some(ConditionalRules { logic, conditions })
    };

    Ok(Question {
        question_key: field.id.clone(),
        field_id: field.id.clone(),
        label: label.to_string(),
        kind: field.kind,
        required,
        conditional_rules,
    })
}

/// Working list of conditions for the question being authored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionBuilder {
    conditions: Vec<Condition>,
}

impl ConditionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the add when the question key or value is empty.
    pub fn add(
        &mut self,
        question_key: &str,
        operator: Operator,
        value: &str,
    ) -> Result<(), FormError> {
        if question_key.is_empty() || value.is_empty() {
            return Err(FormError::IncompleteCondition);
        }
        self.conditions
            .push(Condition::new(question_key, operator, value));
        Ok(())
    }

    /// Removes by position; out-of-range indexes leave the list untouched.
    pub fn remove(&mut self, index: usize) -> Option<Condition> {
        (index < self.conditions.len()).then(|| self.conditions.remove(index))
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn into_conditions(self) -> Vec<Condition> {
        self.conditions
    }
}

/// State of the "add question" dialog.
#[derive(Debug, Clone, Default)]
pub struct QuestionDraft {
    pub field_id: Option<String>,
    pub label: String,
    pub required: bool,
    pub logic: Logic,
    pub conditions: ConditionBuilder,
}

impl QuestionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a field; the label is prefilled with the field name when known.
    pub fn select_field(&mut self, catalog: &Catalog, field_id: &str) {
        self.field_id = Some(field_id.to_string());
        if let Some(field) = catalog.field(field_id) {
            self.label = field.name.clone();
        }
    }

    pub fn finish(self, catalog: &Catalog) -> Result<Question, FormError> {
        let selected = self
            .field_id
            .as_deref()
            .and_then(|field_id| catalog.field(field_id));
        build_question(
            selected,
            Some(self.label.as_str()),
            self.required,
            self.conditions.into_conditions(),
            self.logic,
        )
    }
}

/// Schema smell found in a condition; never blocks saving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LintWarning {
    UnknownReference { question_key: String, target: String },
    ForwardReference { question_key: String, target: String },
    SelfReference { question_key: String },
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintWarning::UnknownReference {
                question_key,
                target,
            } => write!(
                f,
                "question '{}' depends on unknown question '{}'",
                question_key, target
            ),
            LintWarning::ForwardReference {
                question_key,
                target,
            } => write!(
                f,
                "question '{}' depends on later question '{}'",
                question_key, target
            ),
            LintWarning::SelfReference { question_key } => {
                write!(f, "question '{}' depends on itself", question_key)
            }
        }
    }
}

/// Reports conditions whose dependency cannot have been answered yet.
pub fn lint(form: &Form) -> Vec<LintWarning> {
    let mut warnings = Vec::new();
    for (idx, question) in form.questions.iter().enumerate() {
        let Some(rules) = &question.conditional_rules else {
            continue;
        };
        for condition in &rules.conditions {
            let target = &condition.question_key;
            let warning = match form.position(target) {
                None => LintWarning::UnknownReference {
                    question_key: question.question_key.clone(),
                    target: target.clone(),
                },
                Some(pos) if pos == idx => LintWarning::SelfReference {
                    question_key: question.question_key.clone(),
                },
                Some(pos) if pos > idx => LintWarning::ForwardReference {
                    question_key: question.question_key.clone(),
                    target: target.clone(),
                },
                Some(_) => continue,
            };
            warn!(form = %form.id, "{}", warning);
            warnings.push(warning);
        }
    }
    warnings
}
