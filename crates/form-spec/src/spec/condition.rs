use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Contains => "contains",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "equals" | "eq" | "=" => Ok(Operator::Equals),
            "notequals" | "not_equals" | "ne" | "!=" => Ok(Operator::NotEquals),
            "contains" => Ok(Operator::Contains),
            _ => Err(format!("unknown operator '{}'", value)),
        }
    }
}

/// How the conditions of a rule combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Logic {
    /// Identity element of the combinator; the fold starts here.
    pub fn seed(&self) -> bool {
        matches!(self, Logic::And)
    }

    pub fn combine(&self, acc: bool, next: bool) -> bool {
        match self {
            Logic::And => acc && next,
            Logic::Or => acc || next,
        }
    }
}

impl std::str::FromStr for Logic {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "and" => Ok(Logic::And),
            "or" => Ok(Logic::Or),
            _ => Err(format!("unknown logic '{}'", value)),
        }
    }
}

/// Compares the answer of another question against a literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub question_key: String,
    pub operator: Operator,
    pub value: String,
}

impl Condition {
    pub fn new(
        question_key: impl Into<String>,
        operator: Operator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            question_key: question_key.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.question_key, self.operator, self.value)
    }
}

/// Visibility rule attached to a question.
///
/// Only constructed by the question builder with a non-empty condition list;
/// deserialized forms may still carry an empty list, which evaluates to the
/// logic's seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRules {
    pub logic: Logic,
    pub conditions: Vec<Condition>,
}
