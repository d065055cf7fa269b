use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::answers::{AnswerSet, AnswerValue};
use crate::catalog::Catalog;
use crate::error::FormError;
use crate::spec::form::Form;
use crate::spec::question::{Question, QuestionType};
use crate::visibility::is_visible;

/// Why a visible question blocks submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FailureReason {
    MissingRequired,
    UnknownChoice { value: String },
    NotAChoiceList,
    ExpectedSingleChoice,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::MissingRequired => f.write_str("answer is required"),
            FailureReason::UnknownChoice { value } => {
                write!(f, "'{}' is not one of the field's choices", value)
            }
            FailureReason::NotAChoiceList => f.write_str("expected a list of choices"),
            FailureReason::ExpectedSingleChoice => f.write_str("expected a single choice"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub question_key: String,
    pub reason: FailureReason,
}

/// Outcome of validating an answer set against a form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_for(&self, question_key: &str) -> Option<&ValidationFailure> {
        self.failures
            .iter()
            .find(|failure| failure.question_key == question_key)
    }

    pub fn into_result(self) -> Result<(), FormError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(FormError::ValidationFailed(self))
        }
    }
}

/// Collects every failing visible question, in form order.
pub fn validate(form: &Form, answers: &AnswerSet, catalog: &Catalog) -> ValidationReport {
    let failures = form
        .questions
        .iter()
        .filter_map(|question| check_question(question, answers, catalog))
        .collect::<Vec<_>>();
    for failure in &failures {
        debug!(
            question = %failure.question_key,
            reason = %failure.reason,
            "question blocks submission"
        );
    }
    ValidationReport { failures }
}

/// Boolean gate that stops at the first failing question.
pub fn can_submit(form: &Form, answers: &AnswerSet, catalog: &Catalog) -> bool {
    form.questions
        .iter()
        .all(|question| check_question(question, answers, catalog).is_none())
}

/// Checks a single question; hidden questions never fail.
pub fn check_question(
    question: &Question,
    answers: &AnswerSet,
    catalog: &Catalog,
) -> Option<ValidationFailure> {
    if !is_visible(question.conditional_rules.as_ref(), answers) {
        return None;
    }
    let fail = |reason| {
        Some(ValidationFailure {
            question_key: question.question_key.clone(),
            reason,
        })
    };

    let answer = answers.get(&question.question_key);
    if question.required && answer.is_none_or(AnswerValue::is_empty) {
        return fail(FailureReason::MissingRequired);
    }
    let answer = answer?;

    match question.kind {
        QuestionType::SingleSelect => match answer {
            // an empty string counts as "no answer" for optional selects
            AnswerValue::Text(text) if text.is_empty() => None,
            AnswerValue::Text(text) if has_current_choice(catalog, question, text) => None,
            AnswerValue::Text(text) => fail(FailureReason::UnknownChoice {
                value: text.clone(),
            }),
            // a sequence is never a single choice, even an empty one
            AnswerValue::Choices(_) | AnswerValue::Files(_) => {
                fail(FailureReason::ExpectedSingleChoice)
            }
        },
        QuestionType::MultipleSelects => match answer {
            _ if answer.is_empty() => None,
            AnswerValue::Choices(values) => values
                .iter()
                .find(|value| !has_current_choice(catalog, question, value))
                .and_then(|value| {
                    fail(FailureReason::UnknownChoice {
                        value: value.clone(),
                    })
                }),
            AnswerValue::Text(_) | AnswerValue::Files(_) => fail(FailureReason::NotAChoiceList),
        },
        QuestionType::SingleLineText
        | QuestionType::MultilineText
        | QuestionType::MultipleAttachments => None,
    }
}

/// Choices come from the live catalog, not from authoring time.
fn has_current_choice(catalog: &Catalog, question: &Question, value: &str) -> bool {
    catalog
        .field(&question.field_id)
        .is_some_and(|field| field.has_choice(value))
}
