use std::fs;
use std::path::{Path, PathBuf};

use form_spec::{
    Base, CatalogProvider, Form, FormError, FormStore, FormSummary, Identity, Question,
    Submission, Table, TransportPayload,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Directory-backed form storage.
///
/// Layout: `forms/<id>.form.json` and `submissions/<form>/<submission>.json`.
pub struct FileFormStore {
    root: PathBuf,
}

impl FileFormStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, FormError> {
        let root = root.into();
        fs::create_dir_all(root.join("forms")).map_err(storage)?;
        fs::create_dir_all(root.join("submissions")).map_err(storage)?;
        Ok(Self { root })
    }

    fn form_path(&self, form_id: &str) -> PathBuf {
        self.root
            .join("forms")
            .join(format!("{}.form.json", sanitize_file_name(form_id)))
    }

    fn submissions_dir(&self, form_id: &str) -> PathBuf {
        self.root
            .join("submissions")
            .join(sanitize_file_name(form_id))
    }

    fn write_form(&self, form: &Form) -> Result<(), FormError> {
        write_json(&self.form_path(&form.id), form)
    }

    /// Someone else's form is reported as missing.
    fn owned_form(&self, owner_id: &str, form_id: &str) -> Result<Form, FormError> {
        let form = self.get_form(form_id)?;
        if form.owner_id != owner_id {
            return Err(FormError::FormNotFound(form_id.to_string()));
        }
        Ok(form)
    }
}

impl FormStore for FileFormStore {
    fn create_form(
        &mut self,
        owner_id: &str,
        base_id: &str,
        table_id: &str,
    ) -> Result<Form, FormError> {
        let form = Form::new(owner_id, base_id, table_id);
        self.write_form(&form)?;
        debug!(form = %form.id, "form created");
        Ok(form)
    }

    fn get_form(&self, form_id: &str) -> Result<Form, FormError> {
        let path = self.form_path(form_id);
        if !path.exists() {
            return Err(FormError::FormNotFound(form_id.to_string()));
        }
        read_json(&path)
    }

    fn put_questions(
        &mut self,
        owner_id: &str,
        form_id: &str,
        questions: &[Question],
    ) -> Result<(), FormError> {
        let mut form = self.owned_form(owner_id, form_id)?;
        form.questions = questions.to_vec();
        self.write_form(&form)
    }

    fn forms_by_owner(&self, owner_id: &str) -> Result<Vec<FormSummary>, FormError> {
        let mut forms = Vec::new();
        for entry in fs::read_dir(self.root.join("forms")).map_err(storage)? {
            let path = entry.map_err(storage)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let form: Form = read_json(&path)?;
            if form.owner_id == owner_id {
                forms.push(form.summary());
            }
        }
        forms.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(forms)
    }

    fn post_submission(
        &mut self,
        respondent_id: &str,
        form: &Form,
        payload: &TransportPayload,
    ) -> Result<Submission, FormError> {
        let stored = self.get_form(&form.id)?;
        let submission = Submission::record(&stored, payload);
        let dir = self.submissions_dir(&stored.id);
        fs::create_dir_all(&dir).map_err(submission_failed)?;
        let path = dir.join(format!("{}.json", submission.submission_id));
        let contents = serde_json::to_string_pretty(&submission)?;
        fs::write(path, contents).map_err(submission_failed)?;
        debug!(
            form = %stored.id,
            respondent = %respondent_id,
            submission = %submission.submission_id,
            "submission stored"
        );
        Ok(submission)
    }

    fn submissions(&self, owner_id: &str, form_id: &str) -> Result<Vec<Submission>, FormError> {
        self.owned_form(owner_id, form_id)?;
        let dir = self.submissions_dir(form_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut submissions = Vec::new();
        for entry in fs::read_dir(dir).map_err(storage)? {
            let path = entry.map_err(storage)?.path();
            submissions.push(read_json::<Submission>(&path)?);
        }
        submissions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(submissions)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogBase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// Catalog file holding every base with its tables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogFile {
    #[serde(default)]
    pub bases: Vec<CatalogBase>,
}

/// Provider that answers from a JSON snapshot of the upstream API.
pub struct FileCatalogProvider {
    path: PathBuf,
}

impl FileCatalogProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self, identity: &Identity) -> Result<CatalogFile, FormError> {
        if identity.access_token.trim().is_empty() {
            return Err(FormError::catalog_status(401));
        }
        let contents =
            fs::read_to_string(&self.path).map_err(|err| FormError::CatalogUnavailable {
                status: None,
                message: format!("{}: {}", self.path.display(), err),
            })?;
        serde_json::from_str(&contents).map_err(|err| FormError::CatalogUnavailable {
            status: None,
            message: format!("{}: {}", self.path.display(), err),
        })
    }
}

impl CatalogProvider for FileCatalogProvider {
    fn list_bases(&self, identity: &Identity) -> Result<Vec<Base>, FormError> {
        Ok(self
            .load(identity)?
            .bases
            .into_iter()
            .map(|base| Base {
                id: base.id,
                name: base.name,
            })
            .collect())
    }

    fn list_tables(&self, identity: &Identity, base_id: &str) -> Result<Vec<Table>, FormError> {
        self.load(identity)?
            .bases
            .into_iter()
            .find(|base| base.id == base_id)
            .map(|base| base.tables)
            .ok_or_else(|| FormError::catalog_status(404))
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, FormError> {
    let contents = fs::read_to_string(path).map_err(storage)?;
    serde_json::from_str(&contents)
        .map_err(|err| FormError::Storage(format!("{}: {}", path.display(), err)))
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<(), FormError> {
    let contents = serde_json::to_string_pretty(value)?;
    fs::write(path, contents).map_err(storage)
}

fn sanitize_file_name(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "form".into()
    } else {
        cleaned
    }
}

fn storage(err: std::io::Error) -> FormError {
    FormError::Storage(err.to_string())
}

fn submission_failed(err: std::io::Error) -> FormError {
    FormError::SubmissionFailed(err.to_string())
}
