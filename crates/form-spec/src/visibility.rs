use std::collections::BTreeMap;

use crate::answers::{AnswerSet, AnswerValue};
use crate::spec::condition::{Condition, ConditionalRules, Operator};
use crate::spec::form::Form;

pub type VisibilityMap = BTreeMap<String, bool>;

/// Decides whether a question guarded by `rules` is shown for `answers`.
pub fn is_visible(rules: Option<&ConditionalRules>, answers: &AnswerSet) -> bool {
    let Some(rules) = rules else {
        return true;
    };
    rules
        .conditions
        .iter()
        .fold(rules.logic.seed(), |acc, condition| {
            rules
                .logic
                .combine(acc, condition_matches(condition, answers))
        })
}

/// An unanswered dependency never matches, whatever the operator.
pub fn condition_matches(condition: &Condition, answers: &AnswerSet) -> bool {
    let Some(answer) = answers.get(&condition.question_key) else {
        return false;
    };
    match condition.operator {
        Operator::Equals => answer_equals(answer, &condition.value),
        Operator::NotEquals => !answer_equals(answer, &condition.value),
        Operator::Contains => answer_contains(answer, &condition.value),
    }
}

fn answer_equals(answer: &AnswerValue, value: &str) -> bool {
    match answer {
        AnswerValue::Text(text) => text == value,
        AnswerValue::Choices(values) => values.iter().any(|candidate| candidate == value),
        // attachments never compare equal to a literal
        AnswerValue::Files(_) => false,
    }
}

fn answer_contains(answer: &AnswerValue, value: &str) -> bool {
    match answer {
        AnswerValue::Text(text) => text.contains(value),
        AnswerValue::Choices(values) => values.iter().any(|candidate| candidate == value),
        AnswerValue::Files(_) => false,
    }
}

/// Visibility of every question of `form`, keyed by question key.
pub fn resolve_visibility(form: &Form, answers: &AnswerSet) -> VisibilityMap {
    form.questions
        .iter()
        .map(|question| {
            (
                question.question_key.clone(),
                is_visible(question.conditional_rules.as_ref(), answers),
            )
        })
        .collect()
}
