use proptest::prelude::*;

use form_spec::{
    AnswerSet, Condition, ConditionalRules, FileBlob, Form, Logic, Operator, condition_matches,
    is_visible, resolve_visibility,
};

fn rules(logic: Logic, conditions: Vec<Condition>) -> ConditionalRules {
    ConditionalRules { logic, conditions }
}

#[test]
fn absent_rules_are_always_visible() {
    assert!(is_visible(None, &AnswerSet::new()));

    let mut answers = AnswerSet::new();
    answers.set_text("anything", "value");
    assert!(is_visible(None, &answers));
}

#[test]
fn unanswered_dependency_never_matches() {
    let answers = AnswerSet::new();
    for operator in [Operator::Equals, Operator::NotEquals, Operator::Contains] {
        let rule = rules(Logic::And, vec![Condition::new("a", operator, "yes")]);
        assert!(
            !is_visible(Some(&rule), &answers),
            "{} matched an absent answer",
            operator
        );
    }
}

#[test]
fn equals_compares_text_and_checks_membership() {
    let mut answers = AnswerSet::new();
    answers.set_text("a", "yes");
    answers.set_choices("b", vec!["Red".into(), "Green".into()]);

    assert!(condition_matches(&Condition::new("a", Operator::Equals, "yes"), &answers));
    assert!(!condition_matches(&Condition::new("a", Operator::Equals, "Yes"), &answers));
    assert!(condition_matches(&Condition::new("b", Operator::Equals, "Green"), &answers));
    assert!(!condition_matches(&Condition::new("b", Operator::Equals, "Blue"), &answers));
}

#[test]
fn not_equals_negates_only_present_answers() {
    let mut answers = AnswerSet::new();
    answers.set_text("a", "no");
    answers.set_choices("b", vec!["Red".into()]);

    assert!(condition_matches(&Condition::new("a", Operator::NotEquals, "yes"), &answers));
    assert!(!condition_matches(&Condition::new("a", Operator::NotEquals, "no"), &answers));
    assert!(condition_matches(&Condition::new("b", Operator::NotEquals, "Green"), &answers));
    assert!(!condition_matches(&Condition::new("b", Operator::NotEquals, "Red"), &answers));
    assert!(!condition_matches(&Condition::new("c", Operator::NotEquals, "x"), &answers));
}

#[test]
fn contains_is_substring_for_text_and_membership_for_lists() {
    let mut answers = AnswerSet::new();
    answers.set_text("name", "Annabel");
    answers.set_choices("colors", vec!["Red".into()]);
    answers.set_files("photos", Some(vec![FileBlob::new("Red.png", "image/png", vec![1])]));

    assert!(condition_matches(&Condition::new("name", Operator::Contains, "nab"), &answers));
    assert!(!condition_matches(&Condition::new("name", Operator::Contains, "Bob"), &answers));
    assert!(condition_matches(&Condition::new("colors", Operator::Contains, "Red"), &answers));
    assert!(!condition_matches(&Condition::new("colors", Operator::Contains, "Re"), &answers));
    assert!(!condition_matches(&Condition::new("photos", Operator::Contains, "Red.png"), &answers));
}

#[test]
fn empty_text_is_an_answer() {
    let mut answers = AnswerSet::new();
    answers.set_text("a", "");
    assert!(condition_matches(&Condition::new("a", Operator::NotEquals, "yes"), &answers));
}

#[test]
fn empty_condition_list_yields_seed() {
    let answers = AnswerSet::new();
    assert!(is_visible(Some(&rules(Logic::And, vec![])), &answers));
    assert!(!is_visible(Some(&rules(Logic::Or, vec![])), &answers));
}

#[test]
fn resolve_visibility_covers_every_question() {
    let form: Form =
        serde_json::from_str(include_str!("fixtures/pet_form.json")).expect("deserialize");
    let mut answers = AnswerSet::new();
    answers.set_text("fldHasPet", "yes");
    answers.set_text("fldName", "Bob");

    let visibility = resolve_visibility(&form, &answers);
    assert_eq!(visibility.len(), form.questions.len());
    assert_eq!(visibility["fldName"], true);
    assert_eq!(visibility["fldColors"], true);
    assert_eq!(visibility["fldPhotos"], true);
    assert_eq!(visibility["fldNotes"], false);
}

fn operator_strategy() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Equals),
        Just(Operator::NotEquals),
        Just(Operator::Contains),
    ]
}

fn condition_strategy() -> impl Strategy<Value = Condition> {
    ("[abc]", operator_strategy(), "[xyz]{0,2}")
        .prop_map(|(key, operator, value)| Condition::new(key, operator, value))
}

fn answers_strategy() -> impl Strategy<Value = AnswerSet> {
    let entry = prop_oneof![
        "[xyz]{0,2}".prop_map(form_spec::AnswerValue::Text),
        prop::collection::vec("[xyz]{1,2}", 0..3).prop_map(form_spec::AnswerValue::Choices),
    ];
    prop::collection::btree_map("[abc]", entry, 0..3)
        .prop_map(|map| map.into_iter().collect::<AnswerSet>())
}

proptest! {
    #[test]
    fn and_rule_is_conjunction(
        c1 in condition_strategy(),
        c2 in condition_strategy(),
        answers in answers_strategy(),
    ) {
        let combined = rules(Logic::And, vec![c1.clone(), c2.clone()]);
        let expected = is_visible(Some(&rules(Logic::And, vec![c1])), &answers)
            && is_visible(Some(&rules(Logic::And, vec![c2])), &answers);
        prop_assert_eq!(is_visible(Some(&combined), &answers), expected);
    }

    #[test]
    fn or_rule_is_disjunction(
        c1 in condition_strategy(),
        c2 in condition_strategy(),
        answers in answers_strategy(),
    ) {
        let combined = rules(Logic::Or, vec![c1.clone(), c2.clone()]);
        let expected = is_visible(Some(&rules(Logic::Or, vec![c1])), &answers)
            || is_visible(Some(&rules(Logic::Or, vec![c2])), &answers);
        prop_assert_eq!(is_visible(Some(&combined), &answers), expected);
    }

    #[test]
    fn evaluation_is_deterministic(
        c1 in condition_strategy(),
        answers in answers_strategy(),
    ) {
        let rule = rules(Logic::And, vec![c1]);
        prop_assert_eq!(is_visible(Some(&rule), &answers), is_visible(Some(&rule), &answers));
    }
}
