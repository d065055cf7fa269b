pub mod condition;
pub mod form;
pub mod question;

pub use condition::{Condition, ConditionalRules, Logic, Operator};
pub use form::{Form, FormSummary};
pub use question::{Question, QuestionType};
