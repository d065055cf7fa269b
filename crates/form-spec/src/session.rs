use tracing::{debug, info, warn};

use crate::answers::{AnswerSet, AnswerValue};
use crate::builder::{LintWarning, QuestionDraft, lint};
use crate::catalog::{Catalog, Table};
use crate::encode::{TransportPayload, encode};
use crate::error::FormError;
use crate::provider::{CatalogProvider, FormStore, Identity};
use crate::spec::form::Form;
use crate::spec::question::Question;
use crate::submission::Submission;
use crate::validate::{ValidationReport, can_submit, validate};
use crate::visibility::{VisibilityMap, is_visible, resolve_visibility};

/// Where the catalog of the selected table currently stands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CatalogState {
    #[default]
    NotLoaded,
    Loading,
    Loaded(Catalog),
    Failed(FormError),
}

impl CatalogState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogState::NotLoaded => "not_loaded",
            CatalogState::Loading => "loading",
            CatalogState::Loaded(_) => "loaded",
            CatalogState::Failed(_) => "failed",
        }
    }
}

/// Handle for one in-flight catalog fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    table_id: String,
}

impl FetchTicket {
    pub fn table_id(&self) -> &str {
        &self.table_id
    }
}

/// What happened when a fetch result was handed back.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Applied,
    /// The table was missing upstream; an empty catalog was committed.
    AppliedEmpty(FormError),
    /// A newer fetch started after this one; the result was dropped.
    Stale,
}

/// Catalog holder where only the latest fetch may commit.
#[derive(Debug, Clone, Default)]
pub struct CatalogSlot {
    generation: u64,
    state: CatalogState,
}

impl CatalogSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fetch for `table_id`, invalidating every earlier ticket.
    pub fn begin(&mut self, table_id: &str) -> FetchTicket {
        self.generation += 1;
        self.state = CatalogState::Loading;
        debug!(generation = self.generation, table = %table_id, "catalog fetch started");
        FetchTicket {
            generation: self.generation,
            table_id: table_id.to_string(),
        }
    }

    /// Commits a provider response, replacing the state in one step.
    pub fn commit(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Table>, FormError>,
    ) -> Result<CommitOutcome, FormError> {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "dropping stale catalog response"
            );
            return Ok(CommitOutcome::Stale);
        }

        let tables = match result {
            Ok(tables) => tables,
            Err(err) => {
                warn!(table = %ticket.table_id, error = %err, "catalog fetch failed");
                self.state = CatalogState::Failed(err.clone());
                return Err(err);
            }
        };

        match Catalog::from_tables(&tables, &ticket.table_id) {
            Ok(catalog) => {
                debug!(fields = catalog.fields.len(), "catalog loaded");
                self.state = CatalogState::Loaded(catalog);
                Ok(CommitOutcome::Applied)
            }
            Err(FormError::TableNotFound(table_id)) => {
                warn!(table = %table_id, "table missing upstream, using empty catalog");
                self.state = CatalogState::Loaded(Catalog::empty(table_id.clone()));
                Ok(CommitOutcome::AppliedEmpty(FormError::TableNotFound(table_id)))
            }
            Err(err) => {
                self.state = CatalogState::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Runs a whole fetch against `provider`.
    pub fn fetch(
        &mut self,
        provider: &impl CatalogProvider,
        identity: &Identity,
        base_id: &str,
        table_id: &str,
    ) -> Result<CommitOutcome, FormError> {
        let ticket = self.begin(table_id);
        let result = provider.list_tables(identity, base_id);
        self.commit(ticket, result)
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        match &self.state {
            CatalogState::Loaded(catalog) => Some(catalog),
            CatalogState::NotLoaded | CatalogState::Loading | CatalogState::Failed(_) => None,
        }
    }
}

/// Controller for one person filling one form.
#[derive(Debug, Clone)]
pub struct FillSession {
    form: Form,
    catalog: CatalogSlot,
    answers: AnswerSet,
}

impl FillSession {
    pub fn new(form: Form) -> Self {
        Self {
            form,
            catalog: CatalogSlot::new(),
            answers: AnswerSet::new(),
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn catalog_state(&self) -> &CatalogState {
        self.catalog.state()
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.catalog()
    }

    pub fn begin_catalog_fetch(&mut self) -> FetchTicket {
        let table_id = self.form.table_id.clone();
        self.catalog.begin(&table_id)
    }

    pub fn commit_catalog(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Table>, FormError>,
    ) -> Result<CommitOutcome, FormError> {
        self.catalog.commit(ticket, result)
    }

    pub fn load_catalog(
        &mut self,
        provider: &impl CatalogProvider,
        identity: &Identity,
    ) -> Result<CommitOutcome, FormError> {
        let base_id = self.form.base_id.clone();
        let table_id = self.form.table_id.clone();
        self.catalog.fetch(provider, identity, &base_id, &table_id)
    }

    pub fn visibility(&self) -> VisibilityMap {
        resolve_visibility(&self.form, &self.answers)
    }

    pub fn is_visible(&self, question_key: &str) -> Result<bool, FormError> {
        let question = self.question(question_key)?;
        Ok(is_visible(
            question.conditional_rules.as_ref(),
            &self.answers,
        ))
    }

    pub fn visible_questions(&self) -> impl Iterator<Item = &Question> {
        self.form
            .questions
            .iter()
            .filter(|question| is_visible(question.conditional_rules.as_ref(), &self.answers))
    }

    /// Records input for a visible question.
    pub fn set_answer(
        &mut self,
        question_key: &str,
        value: impl Into<AnswerValue>,
    ) -> Result<(), FormError> {
        self.ensure_accepts_input(question_key)?;
        self.answers.set(question_key, value);
        Ok(())
    }

    pub fn toggle_choice(&mut self, question_key: &str, choice: &str) -> Result<(), FormError> {
        self.ensure_accepts_input(question_key)?;
        self.answers.toggle_choice(question_key, choice);
        Ok(())
    }

    pub fn clear_answer(&mut self, question_key: &str) -> Option<AnswerValue> {
        self.answers.remove(question_key)
    }

    /// Replaces every answer at once, e.g. from a restored draft file.
    pub fn replace_answers(&mut self, answers: AnswerSet) {
        self.answers.replace(answers);
    }

    pub fn validate(&self) -> Result<ValidationReport, FormError> {
        let catalog = self.catalog().ok_or(FormError::CatalogNotLoaded)?;
        Ok(validate(&self.form, &self.answers, catalog))
    }

    /// False while the catalog is missing: choices cannot be checked yet.
    pub fn can_submit(&self) -> bool {
        self.catalog()
            .is_some_and(|catalog| can_submit(&self.form, &self.answers, catalog))
    }

    /// Validates and encodes without touching the answers.
    pub fn prepare_submission(&self) -> Result<TransportPayload, FormError> {
        self.validate()?.into_result()?;
        Ok(encode(&self.answers))
    }

    /// Sends the payload to `store`; answers are discarded only on success.
    pub fn submit(
        &mut self,
        store: &mut impl FormStore,
        identity: &Identity,
    ) -> Result<Submission, FormError> {
        let payload = self.prepare_submission()?;
        let submission = store
            .post_submission(&identity.user_id, &self.form, &payload)
            .map_err(|err| match err {
                FormError::SubmissionFailed(_) => err,
                other => FormError::SubmissionFailed(other.to_string()),
            })?;
        info!(
            form = %self.form.id,
            submission = %submission.submission_id,
            parts = payload.len(),
            "form submitted"
        );
        self.answers.clear();
        Ok(submission)
    }

    fn question(&self, question_key: &str) -> Result<&Question, FormError> {
        self.form
            .question(question_key)
            .ok_or_else(|| FormError::UnknownQuestion(question_key.to_string()))
    }

    fn ensure_accepts_input(&self, question_key: &str) -> Result<(), FormError> {
        if self.is_visible(question_key)? {
            Ok(())
        } else {
            Err(FormError::QuestionHidden(question_key.to_string()))
        }
    }
}

/// Controller for the owner editing a form's questions.
#[derive(Debug, Clone)]
pub struct FormEditor {
    form: Form,
    catalog: CatalogSlot,
    dirty: bool,
}

impl FormEditor {
    pub fn new(form: Form) -> Self {
        Self {
            form,
            catalog: CatalogSlot::new(),
            dirty: false,
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.catalog()
    }

    pub fn catalog_state(&self) -> &CatalogState {
        self.catalog.state()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn begin_catalog_fetch(&mut self) -> FetchTicket {
        let table_id = self.form.table_id.clone();
        self.catalog.begin(&table_id)
    }

    pub fn commit_catalog(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Table>, FormError>,
    ) -> Result<CommitOutcome, FormError> {
        self.catalog.commit(ticket, result)
    }

    pub fn load_catalog(
        &mut self,
        provider: &impl CatalogProvider,
        identity: &Identity,
    ) -> Result<CommitOutcome, FormError> {
        let base_id = self.form.base_id.clone();
        let table_id = self.form.table_id.clone();
        self.catalog.fetch(provider, identity, &base_id, &table_id)
    }

    /// Builds the drafted question and appends it to the form.
    pub fn add_question(&mut self, draft: QuestionDraft) -> Result<&Question, FormError> {
        let catalog = self.catalog().ok_or(FormError::CatalogNotLoaded)?;
        let question = draft.finish(catalog)?;
        self.form.push_question(question)?;
        self.dirty = true;
        self.form
            .questions
            .last()
            .ok_or_else(|| FormError::Storage("question list empty after append".into()))
    }

    pub fn lint(&self) -> Vec<LintWarning> {
        lint(&self.form)
    }

    /// Persists the question list.
    pub fn save(
        &mut self,
        store: &mut impl FormStore,
        identity: &Identity,
    ) -> Result<(), FormError> {
        store.put_questions(&identity.user_id, &self.form.id, &self.form.questions)?;
        info!(
            form = %self.form.id,
            questions = self.form.questions.len(),
            "form saved"
        );
        self.dirty = false;
        Ok(())
    }
}
