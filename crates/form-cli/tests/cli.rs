use assert_cmd::Command;
use assert_fs::TempDir;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;

const USER: &str = "usr-1";
const TOKEN: &str = "token-1";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let catalog = json!({
            "bases": [{
                "id": "appPets",
                "name": "Pets",
                "tables": [{
                    "id": "tblPets",
                    "name": "Pets",
                    "fields": [
                        { "id": "fldName", "name": "Name", "type": "singleLineText" },
                        {
                            "id": "fldHasPet",
                            "name": "Has pet",
                            "type": "singleSelect",
                            "options": { "choices": [
                                { "id": "selYes", "name": "yes" },
                                { "id": "selNo", "name": "no" }
                            ] }
                        },
                        {
                            "id": "fldColors",
                            "name": "Colors",
                            "type": "multipleSelects",
                            "options": { "choices": [
                                { "id": "selRed", "name": "Red" },
                                { "id": "selGreen", "name": "Green" }
                            ] }
                        },
                        { "id": "fldPhotos", "name": "Photos", "type": "multipleAttachments" },
                        { "id": "fldCount", "name": "Count", "type": "number" }
                    ]
                }]
            }]
        });
        fs::write(
            dir.path().join("catalog.json"),
            serde_json::to_string_pretty(&catalog).expect("catalog json"),
        )
        .expect("write catalog");
        Self { dir }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    fn catalog(&self) -> PathBuf {
        self.dir.path().join("catalog.json")
    }

    fn answers(&self, name: &str, value: Value) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, value.to_string()).expect("write answers");
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tablefill").expect("binary");
        cmd.env_remove("TABLEFILL_HOME")
            .env_remove("TABLEFILL_USER_ID")
            .env_remove("TABLEFILL_ACCESS_TOKEN")
            .env_remove("RUST_LOG")
            .arg("--root")
            .arg(self.root())
            .arg("--user")
            .arg(USER)
            .arg("--token")
            .arg(TOKEN);
        cmd
    }

    /// Creates the pet form: name and pet flag required, colours only once a pet exists.
    fn pet_form(&self) -> String {
        let output = self
            .cmd()
            .args(["create", "--base", "appPets", "--table", "tblPets"])
            .output()
            .expect("run create");
        assert!(output.status.success());
        let form_id = String::from_utf8(output.stdout).expect("utf8").trim().to_string();

        self.add_question(&form_id, &["--field", "fldName", "--required"]);
        self.add_question(&form_id, &["--field", "fldHasPet", "--required"]);
        self.add_question(
            &form_id,
            &[
                "--field",
                "fldColors",
                "--required",
                "--when",
                "fldHasPet:equals:yes",
            ],
        );
        form_id
    }

    fn add_question(&self, form_id: &str, args: &[&str]) {
        self.cmd()
            .args(["add-question", "--form", form_id, "--catalog"])
            .arg(self.catalog())
            .args(args)
            .assert()
            .success();
    }
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("run command");
    String::from_utf8(output.stdout).expect("utf8")
}

fn stderr_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("run command");
    String::from_utf8(output.stderr).expect("utf8")
}

#[test]
fn fields_lists_supported_fields_only() {
    let ws = Workspace::new();
    let stdout = stdout_of(
        ws.cmd()
            .args(["fields", "--base", "appPets", "--table", "tblPets", "--catalog"])
            .arg(ws.catalog()),
    );
    let fields: Value = serde_json::from_str(&stdout).expect("fields json");
    let ids: Vec<&str> = fields
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|field| field["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["fldName", "fldHasPet", "fldColors", "fldPhotos"]);
    assert_eq!(fields[1]["type"], "singleSelect");
}

#[test]
fn missing_table_yields_empty_fields_with_notice() {
    let ws = Workspace::new();
    let mut cmd = ws.cmd();
    cmd.args(["fields", "--base", "appPets", "--table", "tblGone", "--catalog"])
        .arg(ws.catalog());
    let output = cmd.output().expect("run fields");
    assert!(output.status.success());
    let fields: Value = serde_json::from_slice(&output.stdout).expect("fields json");
    assert_eq!(fields, json!([]));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Table not found in this base"));
}

#[test]
fn missing_token_asks_to_sign_in() {
    let ws = Workspace::new();
    let mut cmd = ws.cmd();
    cmd.args(["--token", "", "bases", "--catalog"]).arg(ws.catalog());
    cmd.assert().failure();
    assert!(stderr_of(&mut cmd).contains("Sign in and try again"));
}

#[test]
fn authoring_persists_questions_and_rules() {
    let ws = Workspace::new();
    let form_id = ws.pet_form();

    let stdout = stdout_of(ws.cmd().args(["show", "--form", &form_id]));
    let form: Value = serde_json::from_str(&stdout).expect("form json");
    let questions = form["questions"].as_array().expect("questions");
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[0]["label"], "Name");
    assert_eq!(questions[2]["conditionalRules"]["logic"], "AND");
    assert_eq!(
        questions[2]["conditionalRules"]["conditions"][0]["questionKey"],
        "fldHasPet"
    );

    let listing = stdout_of(ws.cmd().arg("forms"));
    assert!(listing.contains(&form_id));
    assert!(listing.contains("questions=3"));
}

#[test]
fn duplicate_question_is_rejected() {
    let ws = Workspace::new();
    let form_id = ws.pet_form();
    ws.cmd()
        .args(["add-question", "--form", &form_id, "--field", "fldName", "--catalog"])
        .arg(ws.catalog())
        .assert()
        .failure();
}

#[test]
fn validate_reports_visible_failures_only() {
    let ws = Workspace::new();
    let form_id = ws.pet_form();

    let missing = ws.answers("missing.json", json!({ "fldName": "Ann", "fldHasPet": "yes" }));
    let mut cmd = ws.cmd();
    cmd.args(["validate", "--form", &form_id, "--catalog"])
        .arg(ws.catalog())
        .arg("--answers")
        .arg(&missing);
    cmd.assert().failure();
    let stdout = stdout_of(&mut cmd);
    assert!(stdout.contains("Validation result: invalid"));
    assert!(stdout.contains("fldColors"));

    let hidden = ws.answers("hidden.json", json!({ "fldName": "Ann", "fldHasPet": "no" }));
    ws.cmd()
        .args(["validate", "--form", &form_id, "--catalog"])
        .arg(ws.catalog())
        .arg("--answers")
        .arg(&hidden)
        .assert()
        .success();
}

#[test]
fn submit_records_a_response() {
    let ws = Workspace::new();
    let form_id = ws.pet_form();
    let answers = ws.answers(
        "answers.json",
        json!({ "fldName": "Ann", "fldHasPet": "yes", "fldColors": ["Red", "Green"] }),
    );

    let stdout = stdout_of(
        ws.cmd()
            .args(["submit", "--form", &form_id, "--catalog"])
            .arg(ws.catalog())
            .arg("--answers")
            .arg(&answers),
    );
    assert!(stdout.contains("Form submitted successfully!"));

    let responses = stdout_of(ws.cmd().args(["responses", "--form", &form_id]));
    assert_eq!(responses.lines().count(), 1);
    assert!(responses.contains("Active"));
    assert!(responses.contains("Ann"));

    let stored = fs::read_dir(ws.root().join("submissions").join(&form_id))
        .expect("submissions dir")
        .count();
    assert_eq!(stored, 1);
}

#[test]
fn submit_with_invalid_answers_keeps_store_empty() {
    let ws = Workspace::new();
    let form_id = ws.pet_form();
    let answers = ws.answers("bad.json", json!({ "fldName": "Ann", "fldHasPet": "maybe" }));

    let mut cmd = ws.cmd();
    cmd.args(["submit", "--form", &form_id, "--catalog"])
        .arg(ws.catalog())
        .arg("--answers")
        .arg(&answers);
    cmd.assert().failure();
    assert!(stderr_of(&mut cmd).contains("Please fill all required fields correctly"));

    let responses = stdout_of(ws.cmd().args(["responses", "--form", &form_id]));
    assert!(responses.contains("No responses yet."));
}

#[test]
fn render_json_marks_hidden_questions() {
    let ws = Workspace::new();
    let form_id = ws.pet_form();
    let answers = ws.answers("render.json", json!({ "fldHasPet": "no" }));

    let stdout = stdout_of(
        ws.cmd()
            .args(["render", "--format", "json", "--form", &form_id, "--catalog"])
            .arg(ws.catalog())
            .arg("--answers")
            .arg(&answers),
    );
    let view: Value = serde_json::from_str(&stdout).expect("render json");
    assert_eq!(view["status"], "incomplete");
    assert_eq!(view["visible"], 2);
    let colours = view["questions"]
        .as_array()
        .expect("questions")
        .iter()
        .find(|question| question["key"] == "fldColors")
        .expect("colours question");
    assert_eq!(colours["visible"], false);
}

#[test]
fn encode_writes_one_part_per_choice() {
    let ws = Workspace::new();
    fs::write(ws.dir.path().join("cat.png"), [7u8, 8, 9]).expect("write photo");
    let answers = ws.answers(
        "encode.json",
        json!({
            "fldColors": ["Red", "Green"],
            "fldName": "Ann",
            "fldPhotos": [{ "path": "cat.png" }]
        }),
    );

    let output = ws
        .cmd()
        .args(["encode", "--boundary", "XYZ", "--answers"])
        .arg(&answers)
        .output()
        .expect("run encode");
    assert!(output.status.success());
    let body = String::from_utf8_lossy(&output.stdout);
    assert_eq!(body.matches("name=\"fldColors\"").count(), 2);
    assert!(body.find("Red").expect("red") < body.find("Green").expect("green"));
    assert!(body.contains("filename=\"cat.png\""));
    assert!(body.contains("Content-Type: image/png"));
    assert!(body.ends_with("--XYZ--\r\n"));
}

#[test]
fn unknown_form_reports_fetch_failure() {
    let ws = Workspace::new();
    let mut cmd = ws.cmd();
    cmd.args(["show", "--form", "nope"]);
    cmd.assert().failure();
    assert!(stderr_of(&mut cmd).contains("Could not fetch form"));
}

#[test]
fn respondents_submit_but_only_the_owner_reads_responses() {
    let ws = Workspace::new();
    let form_id = ws.pet_form();
    let answers = ws.answers(
        "respondent.json",
        json!({ "fldName": "Bo", "fldHasPet": "yes", "fldColors": ["Red"] }),
    );

    let stdout = stdout_of(
        ws.cmd()
            .args(["--user", "respondent", "submit", "--form", &form_id, "--catalog"])
            .arg(ws.catalog())
            .arg("--answers")
            .arg(&answers),
    );
    assert!(stdout.contains("Form submitted successfully!"));

    let mut responses = ws.cmd();
    responses.args(["--user", "respondent", "responses", "--form", &form_id]);
    responses.assert().failure();

    ws.cmd()
        .args(["--user", "respondent", "add-question", "--form", &form_id])
        .args(["--field", "fldPhotos", "--catalog"])
        .arg(ws.catalog())
        .assert()
        .failure();

    let owner_view = stdout_of(ws.cmd().args(["responses", "--form", &form_id]));
    assert_eq!(owner_view.lines().count(), 1);
    assert!(owner_view.contains("fldColors: [\"Red\"]"));
}

#[test]
fn schema_describes_form_document() {
    let ws = Workspace::new();
    let stdout = stdout_of(ws.cmd().arg("schema"));
    let schema: Value = serde_json::from_str(&stdout).expect("schema json");
    assert!(schema["properties"].get("questions").is_some());
}
