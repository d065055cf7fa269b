use serde::{Deserialize, Serialize};

use crate::catalog::{Base, Table};
use crate::encode::TransportPayload;
use crate::error::FormError;
use crate::spec::form::{Form, FormSummary};
use crate::spec::question::Question;
use crate::submission::Submission;

/// Signed-in user as handed over by the identity provider.
///
/// Only `user_id` and `access_token` are read by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    pub access_token: String,
}

/// Upstream table API that owns the field definitions.
pub trait CatalogProvider {
    fn list_bases(&self, identity: &Identity) -> Result<Vec<Base>, FormError>;

    fn list_tables(&self, identity: &Identity, base_id: &str) -> Result<Vec<Table>, FormError>;
}

/// Backend that persists forms and submissions.
pub trait FormStore {
    fn create_form(&mut self, owner_id: &str, base_id: &str, table_id: &str)
    -> Result<Form, FormError>;

    /// Fetches a form by id for anyone signed in; respondents are rarely the owner.
    fn get_form(&self, form_id: &str) -> Result<Form, FormError>;

    /// Replaces the question list of a form owned by `owner_id`.
    fn put_questions(
        &mut self,
        owner_id: &str,
        form_id: &str,
        questions: &[Question],
    ) -> Result<(), FormError>;

    fn forms_by_owner(&self, owner_id: &str) -> Result<Vec<FormSummary>, FormError>;

    fn post_submission(
        &mut self,
        respondent_id: &str,
        form: &Form,
        payload: &TransportPayload,
    ) -> Result<Submission, FormError>;

    /// Responses of a form; only its owner may read them.
    fn submissions(&self, owner_id: &str, form_id: &str) -> Result<Vec<Submission>, FormError>;
}
