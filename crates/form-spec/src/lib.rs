#![allow(missing_docs)]

pub mod answers;
pub mod builder;
pub mod catalog;
pub mod encode;
pub mod error;
pub mod provider;
pub mod render;
pub mod session;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod visibility;

pub use answers::{AnswerSet, AnswerValue, FileBlob};
pub use builder::{ConditionBuilder, LintWarning, QuestionDraft, build_question, lint};
pub use catalog::{
    Base, Catalog, CatalogField, Choice, RawField, Table, TableListing, normalize_fields,
};
pub use encode::{PartBody, PayloadPart, TransportPayload, encode, generate_boundary};
pub use error::FormError;
pub use provider::{CatalogProvider, FormStore, Identity};
pub use render::{
    RenderPayload, RenderQuestion, RenderStatus, build_render_payload, render_json_ui,
    render_text,
};
pub use session::{
    CatalogSlot, CatalogState, CommitOutcome, FetchTicket, FillSession, FormEditor,
};
pub use spec::{
    Condition, ConditionalRules, Form, FormSummary, Logic, Operator, Question, QuestionType,
};
pub use submission::{Submission, SubmissionStatus};
pub use validate::{FailureReason, ValidationFailure, ValidationReport, can_submit, validate};
pub use visibility::{VisibilityMap, condition_matches, is_visible, resolve_visibility};
