use form_spec::{
    Catalog, ConditionBuilder, Form, FormError, LintWarning, Logic, Operator, QuestionDraft,
    QuestionType, TableListing, build_question, lint,
};

fn pet_catalog() -> Catalog {
    let listing: TableListing =
        serde_json::from_str(include_str!("fixtures/tables.json")).expect("deserialize");
    Catalog::from_tables(&listing.tables, "tblPets").expect("table present")
}

#[test]
fn adapter_keeps_supported_fields_only() {
    let catalog = pet_catalog();
    let ids = catalog
        .fields
        .iter()
        .map(|field| field.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        ids,
        vec!["fldName", "fldHasPet", "fldColors", "fldNotes", "fldPhotos"]
    );

    let colors = catalog.field("fldColors").expect("colors field");
    assert_eq!(colors.kind, QuestionType::MultipleSelects);
    assert_eq!(colors.choice_names(), vec!["Red", "Green"]);
    assert!(catalog.field("fldName").expect("name").choices.is_none());
}

#[test]
fn missing_table_is_reported() {
    let listing: TableListing =
        serde_json::from_str(include_str!("fixtures/tables.json")).expect("deserialize");
    let err = Catalog::from_tables(&listing.tables, "tblMissing").expect_err("must fail");
    assert_eq!(err, FormError::TableNotFound("tblMissing".into()));
}

#[test]
fn builder_requires_a_field() {
    let err = build_question(None, Some("Label"), true, vec![], Logic::And).expect_err("no field");
    assert_eq!(err, FormError::InvalidSelection);
}

#[test]
fn builder_defaults_label_and_omits_empty_rules() {
    let catalog = pet_catalog();
    let field = catalog.field("fldHasPet");

    let question = build_question(field, None, false, vec![], Logic::Or).expect("question");
    assert_eq!(question.label, "Has pet");
    assert_eq!(question.question_key, "fldHasPet");
    assert_eq!(question.field_id, "fldHasPet");
    assert_eq!(question.kind, QuestionType::SingleSelect);
    assert!(question.conditional_rules.is_none());

    let blank = build_question(field, Some("  "), false, vec![], Logic::And).expect("question");
    assert_eq!(blank.label, "Has pet");
}

#[test]
fn builder_wraps_conditions_with_logic() {
    let catalog = pet_catalog();
    let mut conditions = ConditionBuilder::new();
    conditions
        .add("fldHasPet", Operator::Equals, "yes")
        .expect("complete condition");
    conditions
        .add("fldName", Operator::Contains, "Ann")
        .expect("complete condition");

    let question = build_question(
        catalog.field("fldColors"),
        Some("Colors please"),
        true,
        conditions.into_conditions(),
        Logic::Or,
    )
    .expect("question");
    let rules = question.conditional_rules.expect("rules");
    assert_eq!(rules.logic, Logic::Or);
    assert_eq!(rules.conditions.len(), 2);
    assert_eq!(question.label, "Colors please");
}

#[test]
fn condition_builder_rejects_incomplete_and_removes_by_index() {
    let mut conditions = ConditionBuilder::new();
    assert_eq!(
        conditions.add("", Operator::Equals, "yes"),
        Err(FormError::IncompleteCondition)
    );
    assert_eq!(
        conditions.add("fldHasPet", Operator::Equals, ""),
        Err(FormError::IncompleteCondition)
    );
    assert!(conditions.is_empty());

    conditions
        .add("a", Operator::Equals, "1")
        .expect("complete condition");
    conditions
        .add("b", Operator::NotEquals, "2")
        .expect("complete condition");
    conditions
        .add("c", Operator::Contains, "3")
        .expect("complete condition");

    assert!(conditions.remove(7).is_none());
    let removed = conditions.remove(1).expect("in range");
    assert_eq!(removed.question_key, "b");
    let keys = conditions
        .conditions()
        .iter()
        .map(|condition| condition.question_key.as_str())
        .collect::<Vec<_>>();
    assert_eq!(keys, vec!["a", "c"]);
}

#[test]
fn draft_prefills_label_from_selected_field() {
    let catalog = pet_catalog();
    let mut draft = QuestionDraft::new();
    assert_eq!(draft.clone().finish(&catalog), Err(FormError::InvalidSelection));

    draft.select_field(&catalog, "fldNotes");
    assert_eq!(draft.label, "Notes");
    draft.required = true;
    let question = draft.finish(&catalog).expect("question");
    assert_eq!(question.kind, QuestionType::MultilineText);
    assert!(question.required);
}

#[test]
fn form_rejects_second_question_on_same_field() {
    let catalog = pet_catalog();
    let mut form = Form::new("usr-1", "appPets", "tblPets");
    let question =
        build_question(catalog.field("fldName"), None, true, vec![], Logic::And).expect("q");
    form.push_question(question.clone()).expect("first");
    assert_eq!(
        form.push_question(question),
        Err(FormError::DuplicateQuestion("fldName".into()))
    );
}

#[test]
fn lint_flags_forward_unknown_and_self_references() {
    let catalog = pet_catalog();
    let mut form = Form::new("usr-1", "appPets", "tblPets");

    let mut early = ConditionBuilder::new();
    early
        .add("fldColors", Operator::Equals, "Red")
        .expect("condition");
    early
        .add("fldGhost", Operator::Equals, "x")
        .expect("condition");
    early
        .add("fldName", Operator::Equals, "x")
        .expect("condition");
    form.push_question(
        build_question(
            catalog.field("fldName"),
            None,
            false,
            early.into_conditions(),
            Logic::Or,
        )
        .expect("q"),
    )
    .expect("unique");
    form.push_question(
        build_question(catalog.field("fldColors"), None, false, vec![], Logic::And).expect("q"),
    )
    .expect("unique");

    let warnings = lint(&form);
    assert_eq!(
        warnings,
        vec![
            LintWarning::ForwardReference {
                question_key: "fldName".into(),
                target: "fldColors".into(),
            },
            LintWarning::UnknownReference {
                question_key: "fldName".into(),
                target: "fldGhost".into(),
            },
            LintWarning::SelfReference {
                question_key: "fldName".into(),
            },
        ]
    );
}
