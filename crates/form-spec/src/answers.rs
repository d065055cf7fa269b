use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A file picked for an attachment question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBlob {
    pub file_name: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(serialize_with = "encode_data", deserialize_with = "decode_data")]
    pub data: Vec<u8>,
}

fn default_content_type() -> String {
    "application/octet-stream".into()
}

fn encode_data<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

fn decode_data<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

impl FileBlob {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// One answer held by the answer store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choices(Vec<String>),
    Files(Vec<FileBlob>),
}

impl AnswerValue {
    /// Empty text and empty sequences count as "not answered" for required checks.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(text) => text.is_empty(),
            AnswerValue::Choices(values) => values.is_empty(),
            AnswerValue::Files(files) => files.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            AnswerValue::Choices(_) | AnswerValue::Files(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnswerValue::Text(_) => "text",
            AnswerValue::Choices(_) => "choices",
            AnswerValue::Files(_) => "files",
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(values: Vec<String>) -> Self {
        AnswerValue::Choices(values)
    }
}

impl From<Vec<FileBlob>> for AnswerValue {
    fn from(files: Vec<FileBlob>) -> Self {
        AnswerValue::Files(files)
    }
}

/// In-progress answers keyed by question key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    values: BTreeMap<String, AnswerValue>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AnswerValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Replaces the answer for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AnswerValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn set_text(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.set(key, AnswerValue::Text(text.into()));
    }

    pub fn set_choices(&mut self, key: impl Into<String>, choices: Vec<String>) {
        self.set(key, AnswerValue::Choices(choices));
    }

    /// A `None` file list (nothing picked) stores an empty sequence.
    pub fn set_files(&mut self, key: impl Into<String>, files: Option<Vec<FileBlob>>) {
        self.set(key, AnswerValue::Files(files.unwrap_or_default()));
    }

    /// Adds `choice` to a multi-select answer, or removes it when already picked.
    ///
    /// Any non-sequence answer under `key` is replaced by a fresh sequence.
    pub fn toggle_choice(&mut self, key: &str, choice: &str) {
        let entry = self
            .values
            .entry(key.to_string())
            .or_insert_with(|| AnswerValue::Choices(Vec::new()));
        match entry {
            AnswerValue::Choices(values) => {
                if let Some(idx) = values.iter().position(|value| value == choice) {
                    values.remove(idx);
                } else {
                    values.push(choice.to_string());
                }
            }
            AnswerValue::Text(_) | AnswerValue::Files(_) => {
                *entry = AnswerValue::Choices(vec![choice.to_string()]);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<AnswerValue> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Swaps in a whole new answer map at once.
    pub fn replace(&mut self, other: AnswerSet) {
        self.values = other.values;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl FromIterator<(String, AnswerValue)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (String, AnswerValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
