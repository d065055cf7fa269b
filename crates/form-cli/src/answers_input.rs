use std::fs;
use std::path::Path;

use form_spec::{AnswerSet, AnswerValue, FileBlob};
use serde_json::Value;

type InputResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Reads an answers JSON file.
///
/// Strings become text answers and string arrays choice lists. Arrays of
/// objects are attachments: either `{"path": ..., "contentType"?: ...}`
/// resolved next to the answers file, or inline `{"fileName", "data"}` with
/// base64 data.
pub fn load_answers(path: &Path) -> InputResult<AnswerSet> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_answers(&value, base_dir)
}

pub fn parse_answers(value: &Value, base_dir: &Path) -> InputResult<AnswerSet> {
    let map = value
        .as_object()
        .ok_or("answers file must contain a JSON object")?;
    let mut answers = AnswerSet::new();
    for (key, entry) in map {
        answers.set(key.clone(), parse_value(key, entry, base_dir)?);
    }
    Ok(answers)
}

fn parse_value(key: &str, value: &Value, base_dir: &Path) -> InputResult<AnswerValue> {
    match value {
        Value::String(text) => Ok(AnswerValue::Text(text.clone())),
        Value::Array(items) if items.iter().all(Value::is_string) => Ok(AnswerValue::Choices(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        )),
        Value::Array(items) if items.iter().all(Value::is_object) => items
            .iter()
            .map(|item| parse_file(key, item, base_dir))
            .collect::<InputResult<Vec<_>>>()
            .map(AnswerValue::Files),
        other => Err(format!(
            "answer '{}' must be a string, a list of strings or a list of files (got {})",
            key, other
        )
        .into()),
    }
}

fn parse_file(key: &str, item: &Value, base_dir: &Path) -> InputResult<FileBlob> {
    if let Some(path) = item.get("path").and_then(Value::as_str) {
        let full_path = base_dir.join(path);
        let data = fs::read(&full_path)
            .map_err(|err| format!("answer '{}': {}: {}", key, full_path.display(), err))?;
        let file_name = full_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path)
            .to_string();
        let content_type = item
            .get("contentType")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(&file_name).to_string());
        return Ok(FileBlob::new(file_name, content_type, data));
    }
    serde_json::from_value(item.clone())
        .map_err(|err| format!("answer '{}' has an invalid file entry: {}", key, err).into())
}

fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
