use serde_json::{Map, Value, json};

use crate::answers::AnswerValue;
use crate::session::FillSession;
use crate::spec::question::QuestionType;
use crate::validate::ValidationReport;
use crate::visibility::is_visible;

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Field metadata has not arrived; nothing can be shown yet.
    CatalogPending,
    /// Some visible question still blocks submission.
    Incomplete,
    /// The form may be submitted.
    Ready,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::CatalogPending => "catalog_pending",
            RenderStatus::Incomplete => "incomplete",
            RenderStatus::Ready => "ready",
        }
    }
}

/// Describes a single question for render outputs.
#[derive(Debug, Clone)]
pub struct RenderQuestion {
    pub key: String,
    pub label: String,
    pub kind: QuestionType,
    pub required: bool,
    pub visible: bool,
    pub current_value: Option<AnswerValue>,
    pub choices: Option<Vec<String>>,
    pub problem: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub catalog_state: &'static str,
    pub status: RenderStatus,
    pub questions: Vec<RenderQuestion>,
}

impl RenderPayload {
    pub fn visible_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|question| question.visible)
            .count()
    }
}

/// Build the renderer payload from the session state.
///
/// No questions are listed until the catalog is loaded.
pub fn build_render_payload(session: &FillSession) -> RenderPayload {
    let form = session.form();
    let Some(catalog) = session.catalog() else {
        return RenderPayload {
            form_id: form.id.clone(),
            catalog_state: session.catalog_state().as_str(),
            status: RenderStatus::CatalogPending,
            questions: Vec::new(),
        };
    };

    let answers = session.answers();
    let report = session.validate().unwrap_or_default();
    let questions = form
        .questions
        .iter()
        .map(|question| RenderQuestion {
            key: question.question_key.clone(),
            label: question.label.clone(),
            kind: question.kind,
            required: question.required,
            visible: is_visible(question.conditional_rules.as_ref(), answers),
            current_value: answers.get(&question.question_key).cloned(),
            choices: question.kind.is_select().then(|| {
                catalog
                    .field(&question.field_id)
                    .map(|field| {
                        field
                            .choice_names()
                            .into_iter()
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default()
            }),
            problem: problem_for(&report, &question.question_key),
        })
        .collect::<Vec<_>>();

    RenderPayload {
        form_id: form.id.clone(),
        catalog_state: session.catalog_state().as_str(),
        status: if report.is_valid() {
            RenderStatus::Ready
        } else {
            RenderStatus::Incomplete
        },
        questions,
    }
}

fn problem_for(report: &ValidationReport, key: &str) -> Option<String> {
    report
        .failure_for(key)
        .map(|failure| failure.reason.to_string())
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let questions = payload
        .questions
        .iter()
        .map(|question| {
            let mut map = Map::new();
            map.insert("key".into(), Value::String(question.key.clone()));
            map.insert("label".into(), Value::String(question.label.clone()));
            map.insert(
                "type".into(),
                Value::String(question.kind.as_str().to_string()),
            );
            map.insert("required".into(), Value::Bool(question.required));
            map.insert("visible".into(), Value::Bool(question.visible));
            if let Some(current_value) = &question.current_value {
                map.insert("current_value".into(), value_to_json(current_value));
            }
            if let Some(choices) = &question.choices {
                map.insert(
                    "choices".into(),
                    Value::Array(
                        choices
                            .iter()
                            .map(|choice| Value::String(choice.clone()))
                            .collect(),
                    ),
                );
            }
            if let Some(problem) = &question.problem {
                map.insert("problem".into(), Value::String(problem.clone()));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "catalog": payload.catalog_state,
        "status": payload.status.as_str(),
        "visible": payload.visible_count(),
        "questions": questions,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {}", payload.form_id));
    lines.push(format!("Status: {}", payload.status.as_str()));

    if payload.status == RenderStatus::CatalogPending {
        lines.push(format!(
            "Table fields are not available (catalog {}).",
            payload.catalog_state
        ));
        return lines.join("\n");
    }

    for question in payload.questions.iter().filter(|question| question.visible) {
        let mut entry = format!(" - {} ({})", question.label, question.kind.as_str());
        if question.required {
            entry.push_str(" *");
        }
        if let Some(value) = &question.current_value {
            entry.push_str(&format!(" = {}", value_to_display(value)));
        }
        lines.push(entry);
        if let Some(choices) = &question.choices {
            lines.push(format!("   choices: {}", choices.join(", ")));
        }
        if let Some(problem) = &question.problem {
            lines.push(format!("   ! {}", problem));
        }
    }

    lines.join("\n")
}

fn value_to_json(value: &AnswerValue) -> Value {
    match value {
        AnswerValue::Text(text) => Value::String(text.clone()),
        AnswerValue::Choices(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        AnswerValue::Files(files) => Value::Array(
            files
                .iter()
                .map(|file| json!({ "fileName": file.file_name, "size": file.size() }))
                .collect(),
        ),
    }
}

fn value_to_display(value: &AnswerValue) -> String {
    match value {
        AnswerValue::Text(text) => text.clone(),
        AnswerValue::Choices(values) => values.join(", "),
        AnswerValue::Files(files) => files
            .iter()
            .map(|file| file.file_name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}
