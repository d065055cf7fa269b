mod answers_input;
mod logging;
mod store;

use clap::{Parser, Subcommand, ValueEnum};
use form_spec::{
    CatalogProvider, CatalogSlot, CommitOutcome, FillSession, Form, FormEditor, FormError,
    FormStore, Identity, Logic, Operator, QuestionDraft, TransportPayload, ValidationReport,
    build_render_payload, encode, generate_boundary, render_json_ui, render_text,
};
use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing::{info, warn};

use answers_input::load_answers;
use logging::{LogConfig, init_logging};
use store::{FileCatalogProvider, FileFormStore};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Table-bound form helper",
    long_about = "Author forms over table fields, check answers against conditional rules and submit them as multipart payloads",
    args_override_self = true
)]
struct Cli {
    /// Storage directory (defaults to TABLEFILL_HOME or ./.tablefill).
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Acting user id (defaults to TABLEFILL_USER_ID or "local").
    #[arg(long, global = true, value_name = "USER")]
    user: Option<String>,
    /// Access token for the table provider (defaults to TABLEFILL_ACCESS_TOKEN).
    #[arg(long, global = true, value_name = "TOKEN")]
    token: Option<String>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogicArg {
    And,
    Or,
}

impl From<LogicArg> for Logic {
    fn from(value: LogicArg) -> Self {
        match value {
            LogicArg::And => Logic::And,
            LogicArg::Or => Logic::Or,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List the bases available in a catalog file.
    Bases {
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
    },
    /// Print the supported fields of a table.
    Fields {
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
        #[arg(long)]
        base: String,
        #[arg(long)]
        table: String,
    },
    /// Create an empty form bound to a base and table.
    Create {
        #[arg(long)]
        base: String,
        #[arg(long)]
        table: String,
    },
    /// Append a question bound to a table field and save the form.
    AddQuestion {
        #[arg(long)]
        form: String,
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
        /// Field id the question binds to.
        #[arg(long)]
        field: String,
        /// Label override (defaults to the field name).
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        required: bool,
        /// Visibility condition as KEY:OPERATOR:VALUE (repeatable).
        #[arg(long = "when", value_name = "CONDITION")]
        conditions: Vec<String>,
        #[arg(long, value_enum, default_value_t = LogicArg::And)]
        logic: LogicArg,
    },
    /// Print a stored form.
    Show {
        #[arg(long)]
        form: String,
    },
    /// List the forms owned by the acting user.
    Forms,
    /// Show the fill view for a set of answers.
    Render {
        #[arg(long)]
        form: String,
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Validate answers against a stored form.
    Validate {
        #[arg(long)]
        form: String,
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Validate, encode and record a submission.
    Submit {
        #[arg(long)]
        form: String,
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Write the multipart body for an answers file to stdout.
    Encode {
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        #[arg(long)]
        boundary: Option<String>,
    },
    /// List recorded submissions of a form.
    Responses {
        #[arg(long)]
        form: String,
    },
    /// Print the JSON schema of the form document.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose).with_ansi(io::stderr().is_terminal()));
    let identity = resolve_identity(cli.user, cli.token);

    match cli.command {
        Command::Bases { catalog } => run_bases(catalog, &identity),
        Command::Fields {
            catalog,
            base,
            table,
        } => run_fields(catalog, &identity, &base, &table),
        Command::Create { base, table } => {
            run_create(open_store(cli.root)?, &identity, &base, &table)
        }
        Command::AddQuestion {
            form,
            catalog,
            field,
            label,
            required,
            conditions,
            logic,
        } => {
            let draft = build_draft(&field, label, required, &conditions, logic.into())?;
            run_add_question(open_store(cli.root)?, &identity, &form, catalog, draft)
        }
        Command::Show { form } => run_show(open_store(cli.root)?, &identity, &form),
        Command::Forms => run_forms(open_store(cli.root)?, &identity),
        Command::Render {
            form,
            catalog,
            answers,
            format,
        } => run_render(open_store(cli.root)?, &identity, &form, catalog, answers, format),
        Command::Validate {
            form,
            catalog,
            answers,
        } => run_validate(open_store(cli.root)?, &identity, &form, catalog, answers),
        Command::Submit {
            form,
            catalog,
            answers,
        } => run_submit(open_store(cli.root)?, &identity, &form, catalog, answers),
        Command::Encode { answers, boundary } => run_encode(answers, boundary),
        Command::Responses { form } => run_responses(open_store(cli.root)?, &identity, &form),
        Command::Schema => run_schema(),
    }
}

fn resolve_identity(user: Option<String>, token: Option<String>) -> Identity {
    let user_id = user
        .or_else(|| env::var("TABLEFILL_USER_ID").ok())
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "local".to_string());
    let access_token = token
        .or_else(|| env::var("TABLEFILL_ACCESS_TOKEN").ok())
        .unwrap_or_default();
    Identity {
        user_id,
        email: String::new(),
        access_token,
    }
}

fn resolve_root(root: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match root {
        Some(path) => path,
        None => env::var_os("TABLEFILL_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".tablefill")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("storage directory cannot be empty".into());
    }
    Ok(candidate)
}

fn open_store(root: Option<PathBuf>) -> CliResult<FileFormStore> {
    let root = resolve_root(root)?;
    FileFormStore::open(root).map_err(notify)
}

/// Prints the user-facing notification and keeps the error for the exit code.
fn notify(err: FormError) -> Box<dyn std::error::Error> {
    eprintln!("{}", err.user_message());
    Box::new(err)
}

fn report_outcome(outcome: &CommitOutcome) {
    if let CommitOutcome::AppliedEmpty(notice) = outcome {
        warn!(notice = %notice, "continuing with an empty field list");
        eprintln!("{}", notice.user_message());
    }
}

fn run_bases(catalog: PathBuf, identity: &Identity) -> CliResult<()> {
    let provider = FileCatalogProvider::new(catalog);
    let bases = provider.list_bases(identity).map_err(notify)?;
    println!("{}", serde_json::to_string_pretty(&bases)?);
    Ok(())
}

fn run_fields(catalog: PathBuf, identity: &Identity, base: &str, table: &str) -> CliResult<()> {
    let provider = FileCatalogProvider::new(catalog);
    let mut slot = CatalogSlot::new();
    let outcome = slot
        .fetch(&provider, identity, base, table)
        .map_err(notify)?;
    report_outcome(&outcome);
    let fields = slot
        .catalog()
        .map(|catalog| catalog.fields.clone())
        .unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

fn run_create(
    mut store: FileFormStore,
    identity: &Identity,
    base: &str,
    table: &str,
) -> CliResult<()> {
    let form = store
        .create_form(&identity.user_id, base, table)
        .map_err(notify)?;
    info!(form = %form.id, "created form");
    println!("{}", form.id);
    Ok(())
}

fn build_draft(
    field: &str,
    label: Option<String>,
    required: bool,
    conditions: &[String],
    logic: Logic,
) -> CliResult<QuestionDraft> {
    let mut draft = QuestionDraft::new();
    draft.field_id = Some(field.to_string());
    draft.required = required;
    draft.logic = logic;
    if let Some(label) = label {
        draft.label = label;
    }
    for raw in conditions {
        let mut pieces = raw.splitn(3, ':');
        let (key, operator, value) = match (pieces.next(), pieces.next(), pieces.next()) {
            (Some(key), Some(operator), Some(value)) => (key, operator, value),
            _ => {
                return Err(format!("condition '{}' must look like KEY:OPERATOR:VALUE", raw).into());
            }
        };
        let operator: Operator = operator.parse()?;
        draft
            .conditions
            .add(key.trim(), operator, value)
            .map_err(notify)?;
    }
    Ok(draft)
}

fn run_add_question(
    mut store: FileFormStore,
    identity: &Identity,
    form_id: &str,
    catalog: PathBuf,
    mut draft: QuestionDraft,
) -> CliResult<()> {
    let form = store.get_form(form_id).map_err(notify)?;
    if form.owner_id != identity.user_id {
        return Err(notify(FormError::FormNotFound(form_id.to_string())));
    }
    let mut editor = FormEditor::new(form);
    let outcome = editor
        .load_catalog(&FileCatalogProvider::new(catalog), identity)
        .map_err(notify)?;
    report_outcome(&outcome);

    // an explicit label wins over the field name prefilled by selection
    let label = std::mem::take(&mut draft.label);
    if let (Some(catalog), Some(field_id)) = (editor.catalog(), draft.field_id.clone()) {
        draft.select_field(catalog, &field_id);
    }
    if !label.is_empty() {
        draft.label = label;
    }

    let question = editor.add_question(draft).map_err(notify)?.clone();
    for warning in editor.lint() {
        eprintln!("warning: {}", warning);
    }
    editor.save(&mut store, identity).map_err(notify)?;
    println!("{}", serde_json::to_string_pretty(&question)?);
    Ok(())
}

fn run_show(store: FileFormStore, identity: &Identity, form_id: &str) -> CliResult<()> {
    let form = store.get_form(form_id).map_err(notify)?;
    println!("{}", serde_json::to_string_pretty(&form)?);
    Ok(())
}

fn run_forms(store: FileFormStore, identity: &Identity) -> CliResult<()> {
    let forms = store.forms_by_owner(&identity.user_id).map_err(notify)?;
    if forms.is_empty() {
        println!("No forms yet.");
    }
    for form in forms {
        println!(
            "{}  base={} table={} questions={} created={}",
            form.id,
            form.base_id,
            form.table_id,
            form.question_count,
            form.created_at.to_rfc3339()
        );
    }
    Ok(())
}

fn open_session(
    store: &FileFormStore,
    identity: &Identity,
    form_id: &str,
    catalog: PathBuf,
) -> CliResult<FillSession> {
    let form: Form = store.get_form(form_id).map_err(notify)?;
    let mut session = FillSession::new(form);
    let outcome = session
        .load_catalog(&FileCatalogProvider::new(catalog), identity)
        .map_err(notify)?;
    report_outcome(&outcome);
    Ok(session)
}

fn run_render(
    store: FileFormStore,
    identity: &Identity,
    form_id: &str,
    catalog: PathBuf,
    answers: Option<PathBuf>,
    format: RenderMode,
) -> CliResult<()> {
    let mut session = open_session(&store, identity, form_id, catalog)?;
    if let Some(path) = answers {
        session.replace_answers(load_answers(&path)?);
    }
    let payload = build_render_payload(&session);
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => {
            let view = render_json_ui(&payload);
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }
    Ok(())
}

fn run_validate(
    store: FileFormStore,
    identity: &Identity,
    form_id: &str,
    catalog: PathBuf,
    answers: PathBuf,
) -> CliResult<()> {
    let mut session = open_session(&store, identity, form_id, catalog)?;
    session.replace_answers(load_answers(&answers)?);
    let report = session.validate().map_err(notify)?;
    println!(
        "Validation result: {}",
        if report.is_valid() { "valid" } else { "invalid" }
    );
    describe_validation(&report);

    if report.is_valid() {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(report: &ValidationReport) {
    if report.failures.is_empty() {
        return;
    }
    println!("Failures:");
    for failure in &report.failures {
        println!("  {} - {}", failure.question_key, failure.reason);
    }
}

fn run_submit(
    mut store: FileFormStore,
    identity: &Identity,
    form_id: &str,
    catalog: PathBuf,
    answers: PathBuf,
) -> CliResult<()> {
    let mut session = open_session(&store, identity, form_id, catalog)?;
    session.replace_answers(load_answers(&answers)?);
    match session.submit(&mut store, identity) {
        Ok(submission) => {
            println!("Form submitted successfully!");
            println!("{}", submission.submission_id);
            Ok(())
        }
        Err(FormError::ValidationFailed(report)) => {
            eprintln!("{}", FormError::ValidationFailed(report.clone()).user_message());
            describe_validation(&report);
            Err("validation failed".into())
        }
        Err(err) => Err(notify(err)),
    }
}

fn run_encode(answers: PathBuf, boundary: Option<String>) -> CliResult<()> {
    let answers = load_answers(&answers)?;
    let boundary = boundary.unwrap_or_else(generate_boundary);
    let body = encode(&answers).to_multipart(&boundary);
    info!(content_type = %TransportPayload::content_type(&boundary), bytes = body.len(), "encoded");
    let mut stdout = io::stdout().lock();
    stdout.write_all(&body)?;
    stdout.flush()?;
    Ok(())
}

fn run_responses(store: FileFormStore, identity: &Identity, form_id: &str) -> CliResult<()> {
    let submissions = store
        .submissions(&identity.user_id, form_id)
        .map_err(notify)?;
    if submissions.is_empty() {
        println!("No responses yet.");
    }
    for submission in submissions {
        println!(
            "{}  {}  {:?}  {}",
            submission.submission_id,
            submission.created_at.to_rfc3339(),
            submission.status,
            submission.preview()
        );
    }
    Ok(())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(Form);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
