use std::collections::BTreeMap;

use tracing::trace;
use uuid::Uuid;

use crate::answers::{AnswerSet, AnswerValue, FileBlob};
use crate::error::FormError;
use crate::spec::form::Form;
use crate::spec::question::QuestionType;

/// Content of one part of the transport payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    Text(String),
    File(FileBlob),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPart {
    pub name: String,
    pub body: PartBody,
}

/// Ordered multi-part container; a name may carry several parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportPayload {
    parts: Vec<PayloadPart>,
}

/// Flattens an answer set into parts, one per scalar or sequence element.
///
/// Empty sequences contribute no parts.
pub fn encode(answers: &AnswerSet) -> TransportPayload {
    let mut payload = TransportPayload::default();
    for (key, value) in answers.iter() {
        match value {
            AnswerValue::Text(text) => payload.push_text(key, text.clone()),
            AnswerValue::Choices(values) => {
                for value in values {
                    payload.push_text(key, value.clone());
                }
            }
            AnswerValue::Files(files) => {
                for file in files {
                    payload.push_file(key, file.clone());
                }
            }
        }
    }
    trace!(parts = payload.len(), "encoded answers");
    payload
}

/// Fresh boundary for a multipart body.
pub fn generate_boundary() -> String {
    format!("----tablefill{}", Uuid::new_v4().simple())
}

impl TransportPayload {
    pub fn push_text(&mut self, name: &str, value: String) {
        self.parts.push(PayloadPart {
            name: name.to_string(),
            body: PartBody::Text(value),
        });
    }

    pub fn push_file(&mut self, name: &str, file: FileBlob) {
        self.parts.push(PayloadPart {
            name: name.to_string(),
            body: PartBody::File(file),
        });
    }

    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    /// Parts stored under `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PartBody> + 'a {
        self.parts
            .iter()
            .filter(move |part| part.name == name)
            .map(|part| &part.body)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn content_type(boundary: &str) -> String {
        format!("multipart/form-data; boundary={}", boundary)
    }

    /// Renders the payload as a `multipart/form-data` body.
    pub fn to_multipart(&self, boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for part in &self.parts {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            match &part.body {
                PartBody::Text(text) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                            escape_quoted(&part.name)
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(text.as_bytes());
                }
                PartBody::File(file) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            escape_quoted(&part.name),
                            escape_quoted(&file.file_name),
                            file.content_type
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(&file.data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        body
    }

    /// Parses a body produced by [`TransportPayload::to_multipart`].
    pub fn from_multipart(body: &[u8], boundary: &str) -> Result<Self, FormError> {
        let opening = format!("--{}", boundary);
        let separator = format!("\r\n--{}", boundary);
        if !body.starts_with(opening.as_bytes()) {
            return Err(malformed("body does not start with the boundary"));
        }

        let mut payload = TransportPayload::default();
        let mut cursor = opening.len();
        loop {
            let rest = &body[cursor..];
            if rest.starts_with(b"--") {
                return Ok(payload);
            }
            if !rest.starts_with(b"\r\n") {
                return Err(malformed("missing line break after boundary"));
            }
            cursor += 2;
            let end = find(body, separator.as_bytes(), cursor)
                .ok_or_else(|| malformed("unterminated part"))?;
            payload.parts.push(parse_part(&body[cursor..end])?);
            cursor = end + separator.len();
        }
    }

    /// Rebuilds an answer set from the parts.
    ///
    /// With a form, question types decide between text and sequence answers;
    /// without one, a single text part becomes text and repeated parts a
    /// sequence.
    pub fn to_answers(&self, form: Option<&Form>) -> Result<AnswerSet, FormError> {
        let mut grouped: BTreeMap<&str, Vec<&PartBody>> = BTreeMap::new();
        for part in &self.parts {
            grouped.entry(part.name.as_str()).or_default().push(&part.body);
        }

        let mut answers = AnswerSet::new();
        for (name, bodies) in grouped {
            let kind = form
                .and_then(|form| form.question(name))
                .map(|question| question.kind);
            answers.set(name, collect_value(name, kind, bodies)?);
        }
        Ok(answers)
    }
}

fn collect_value(
    name: &str,
    kind: Option<QuestionType>,
    bodies: Vec<&PartBody>,
) -> Result<AnswerValue, FormError> {
    let files = bodies
        .iter()
        .filter_map(|body| match body {
            PartBody::File(file) => Some(file.clone()),
            PartBody::Text(_) => None,
        })
        .collect::<Vec<_>>();
    if !files.is_empty() {
        if files.len() != bodies.len() {
            return Err(malformed(&format!(
                "field '{}' mixes file and text parts",
                name
            )));
        }
        return Ok(AnswerValue::Files(files));
    }

    let mut texts = bodies
        .into_iter()
        .filter_map(|body| match body {
            PartBody::Text(text) => Some(text.clone()),
            PartBody::File(_) => None,
        })
        .collect::<Vec<_>>();
    let multi = kind.map(|kind| kind.is_multi_valued()).unwrap_or(false);
    if !multi && texts.len() == 1 {
        Ok(AnswerValue::Text(texts.remove(0)))
    } else {
        Ok(AnswerValue::Choices(texts))
    }
}

fn parse_part(raw: &[u8]) -> Result<PayloadPart, FormError> {
    let header_end =
        find(raw, b"\r\n\r\n", 0).ok_or_else(|| malformed("part has no header block"))?;
    let headers = std::str::from_utf8(&raw[..header_end])
        .map_err(|_| malformed("part headers are not utf-8"))?;
    let content = &raw[header_end + 4..];

    let mut name = None;
    let mut file_name = None;
    let mut content_type = None;
    for line in headers.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        match header.trim().to_ascii_lowercase().as_str() {
            "content-disposition" => {
                name = disposition_param(value, "name");
                file_name = disposition_param(value, "filename");
            }
            "content-type" => content_type = Some(value.trim().to_string()),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| malformed("part is missing a name"))?;
    let body = match file_name {
        Some(file_name) => PartBody::File(FileBlob {
            file_name,
            content_type: content_type.unwrap_or_else(|| "application/octet-stream".into()),
            data: content.to_vec(),
        }),
        None => PartBody::Text(
            String::from_utf8(content.to_vec())
                .map_err(|_| malformed(&format!("text part '{}' is not utf-8", name)))?,
        ),
    };
    Ok(PayloadPart { name, body })
}

fn disposition_param(header: &str, key: &str) -> Option<String> {
    split_params(header).into_iter().skip(1).find_map(|param| {
        let (param_key, param_value) = param.trim().split_once('=')?;
        if param_key.trim() != key {
            return None;
        }
        let quoted = param_value.trim();
        let inner = quoted
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .unwrap_or(quoted);
        Some(unescape_quoted(inner))
    })
}

/// Splits header parameters on `;` outside quoted strings.
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (idx, ch) in header.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&header[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    params.push(&header[start..]);
    params
}

/// Percent-escapes the characters browsers escape in multipart names.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn unescape_quoted(value: &str) -> String {
    value
        .replace("%0A", "\n")
        .replace("%0D", "\r")
        .replace("%22", "\"")
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn malformed(message: &str) -> FormError {
    FormError::MalformedPayload(message.to_string())
}
