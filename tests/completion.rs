use magic_spell_ls::parser::Document;
use magic_spell_ls::{
    request_completions, CompletionList, CompletionOptions, Cursor, Dialect, MagicSchema, Target,
};

fn schema() -> MagicSchema {
    MagicSchema::from_json_str(include_str!("fixtures/metadata.json")).unwrap()
}

fn complete_with(text: &str, line: usize, col: usize, dialect: Dialect) -> Option<CompletionList> {
    let document = Document::new(text.to_string());
    let options = CompletionOptions {
        dialect,
        ..CompletionOptions::default()
    };
    request_completions(&schema(), &document, Cursor::new(line, col), options)
}

fn complete(text: &str, line: usize, col: usize) -> Option<CompletionList> {
    complete_with(text, line, col, Dialect::Spells)
}

fn labels(list: &CompletionList) -> Vec<&str> {
    list.candidates.iter().map(|c| c.label.as_str()).collect()
}

fn sorted_labels(list: &CompletionList) -> Vec<&str> {
    let mut labels = labels(list);
    labels.sort_unstable();
    labels
}

#[test]
fn test_empty_document_offers_spell_properties() {
    let list = complete("", 0, 0).unwrap();
    assert_eq!(list.target, Target::Key);
    assert_eq!(
        sorted_labels(&list),
        vec!["actions", "active_costs", "cooldown", "costs", "effects", "icon", "name", "parameters"]
    );
    for candidate in &list.candidates {
        assert_eq!(candidate.text, format!("{}: ", candidate.label));
    }
    // Highest importance first
    assert_eq!(list.candidates[0].label, "cooldown");
    assert_eq!(
        list.candidates[0].description,
        Some(vec!["Time between casts".to_string()])
    );
}

#[test]
fn test_action_class_fields_and_inherited_parameters() {
    let list = complete("actions:\n  - class: Fireball\n    ", 2, 4).unwrap();
    assert_eq!(labels(&list), vec!["radius", "speed", "target", "delay"]);

    let inherited: Vec<bool> = list.candidates.iter().map(|c| c.inherited).collect();
    assert_eq!(inherited, vec![false, false, false, true]);
}

#[test]
fn test_cost_types() {
    let list = complete("costs:\n  ", 1, 2).unwrap();
    assert_eq!(labels(&list), vec!["health", "hunger", "mana", "xp"]);
    assert!(list.candidates.iter().all(|c| c.text.ends_with(": ")));
}

#[test]
fn test_siblings_are_excluded() {
    let above = complete("actions:\n  - class: Fireball\n    radius: 2\n    ", 3, 4).unwrap();
    assert_eq!(labels(&above), vec!["speed", "target", "delay"]);

    let below = complete("actions:\n  - class: Fireball\n    \n    speed: 1", 2, 4).unwrap();
    assert!(!labels(&below).contains(&"speed"));
    assert!(labels(&below).contains(&"radius"));
}

#[test]
fn test_class_default_comes_first_with_multiples() {
    let list = complete("actions:\n  - class: Damage\n    damage: ", 2, 12).unwrap();
    assert_eq!(list.target, Target::Value);

    let first = &list.candidates[0];
    assert_eq!(first.label, "100");
    assert!(first.is_default);
    assert!(list.candidates[1..].iter().all(|c| !c.is_default));

    let labels = labels(&list);
    for expected in ["200", "1000", "50", "25", "12", "6", "3", "1", "0", "10"] {
        assert!(labels.contains(&expected), "missing {}", expected);
    }
}

#[test]
fn test_generic_default_marks_matching_option() {
    let list = complete("actions:\n  - class: Fireball\n    target: ", 2, 12).unwrap();
    assert_eq!(labels(&list), vec!["other", "block", "self"]);
    assert!(list.candidates[0].is_default);
}

#[test]
fn test_primary_wins_over_inherited_duplicate() {
    let doc = "actions:\n  cast:\n  - class: Fireball\nparameters:\n  ";
    let list = complete(doc, 4, 2).unwrap();
    let labels = labels(&list);
    assert_eq!(labels.iter().filter(|&&label| label == "target").count(), 1);

    let target = list.candidates.iter().find(|c| c.label == "target").unwrap();
    assert!(!target.inherited);

    let last_own = list.candidates.iter().rposition(|c| !c.inherited).unwrap();
    let first_inherited = list.candidates.iter().position(|c| c.inherited).unwrap();
    assert!(last_own < first_inherited);
    assert_eq!(labels, vec!["radius", "speed", "target", "cooldown", "range"]);
}

#[test]
fn test_exact_value_is_suppressed() {
    let doc = "actions:\n  - class: Fireball\n    target: self";
    assert!(complete(doc, 2, 16).is_none());

    let partial = "actions:\n  - class: Fireball\n    target: sel";
    let list = complete(partial, 2, 15).unwrap();
    assert_eq!(labels(&list), vec!["self"]);
    assert_eq!((list.replace_from, list.replace_to), (12, 15));
}

#[test]
fn test_repeated_requests_are_identical() {
    let doc = "actions:\n  cast:\n  - class: Repeat\n    ";
    let first = complete(doc, 3, 4);
    let second = complete(doc, 3, 4);
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_keyed_and_bare_documents_agree() {
    let keyed = complete(
        "fireball:\n  actions:\n    cast:\n    - class: Fireball\n      ",
        4,
        6,
    )
    .unwrap();
    let bare = complete("actions:\n  cast:\n  - class: Fireball\n    ", 3, 4).unwrap();
    assert_eq!(labels(&keyed), labels(&bare));
    assert_eq!(labels(&bare), vec!["radius", "speed", "target", "delay"]);
}

#[test]
fn test_action_class_names() {
    let list = complete("actions:\n  - class: ", 1, 11).unwrap();
    assert_eq!(list.target, Target::Class);
    // Fireball carries an importance
    assert_eq!(labels(&list), vec!["Fireball", "Damage", "Potion", "Repeat"]);
    assert_eq!(
        list.candidates[0].description,
        Some(vec![
            "Launch a fireball".to_string(),
            "that explodes on impact".to_string()
        ])
    );
}

#[test]
fn test_new_action_entry() {
    let list = complete("actions:\n  cast:\n    - class: Damage\n    ", 3, 4).unwrap();
    assert_eq!(labels(&list), vec!["- class"]);
    assert_eq!(list.candidates[0].text, "- class: ");
    assert_eq!(
        list.candidates[0].description,
        Some(vec!["Add a new action to this list".to_string()])
    );
}

#[test]
fn test_map_typed_parameter_keys() {
    let doc = "actions:\n  - class: Potion\n    add_effects:\n      ";
    let list = complete(doc, 3, 6).unwrap();
    assert_eq!(labels(&list), vec!["jump", "slow", "speed"]);
    assert_eq!(list.candidates[0].text, "jump: ");
}

#[test]
fn test_effect_triggers() {
    let list = complete("effects:\n  ", 1, 2).unwrap();
    assert_eq!(list.candidates.len(), 12);
    assert!(labels(&list).contains(&"hit_entity"));
    let hit = list.candidates.iter().find(|c| c.label == "hit").unwrap();
    assert_eq!(hit.description, Some(vec!["Effects played on hit".to_string()]));
}

#[test]
fn test_colors_group_by_hue() {
    let doc = "effects:\n  cast:\n  - location: origin\n    color: ";
    let list = complete(doc, 3, 11).unwrap();
    assert_eq!(labels(&list), vec!["'#0000FF'", "'#00FF00'", "'#FF0000'"]);
}

#[test]
fn test_effect_file_effectlib_keys() {
    let doc = "sparkle:\n  - location: origin\n    effectlib:\n      class: Sphere\n      ";
    let list = complete_with(doc, 4, 6, Dialect::Effects).unwrap();
    assert_eq!(labels(&list), vec!["particles", "radius", "duration", "iterations"]);
    assert!(list.candidates[2].inherited);
}

#[test]
fn test_effect_file_class_names() {
    let doc = "sparkle:\n  - location: origin\n    effectlib:\n      class: ";
    let list = complete_with(doc, 3, 13, Dialect::Effects).unwrap();
    assert_eq!(list.target, Target::Class);
    assert_eq!(labels(&list), vec!["Helix", "Sphere"]);
}

#[test]
fn test_nothing_to_offer() {
    assert!(complete("# cooldown", 0, 5).is_none());
    assert!(complete("cooldown: 1", 4, 0).is_none());
    assert!(complete("actions:\n  cast:\n    - class: Damage\n     ", 3, 5).is_none());
}

#[test]
fn test_spell_effectlib_class_names() {
    let doc = "effects:\n  cast:\n  - location: origin\n    effectlib:\n      class: ";
    let list = complete(doc, 4, 13).unwrap();
    assert_eq!(list.target, Target::Class);
    assert_eq!(labels(&list), vec!["Helix", "Sphere"]);
}

#[test]
fn test_effectlib_double_parameter_values() {
    let doc = "effects:\n  cast:\n  - location: origin\n    effectlib:\n      class: Sphere\n      radius: ";
    let list = complete(doc, 5, 14).unwrap();
    assert_eq!(list.target, Target::Value);

    let first = &list.candidates[0];
    assert_eq!(first.label, "1.5");
    assert!(first.is_default);

    let labels = labels(&list);
    for expected in ["3", "15", "0.75", "0.375", "0.1875", "0.15", "0.015", "0.0015"] {
        assert!(labels.contains(&expected), "missing {}", expected);
    }
}

#[test]
fn test_effectlib_generic_parameter_default() {
    let doc = "effects:\n  cast:\n  - location: origin\n    effectlib:\n      class: Sphere\n      iterations: ";
    let list = complete(doc, 5, 18).unwrap();
    assert_eq!(list.candidates[0].label, "20");
    assert!(list.candidates[0].is_default);
    assert!(labels(&list).contains(&"40"));
    assert!(labels(&list).contains(&"200"));
}

#[test]
fn test_spell_effectlib_keys() {
    let doc = "effects:\n  cast:\n  - location: origin\n    effectlib:\n      class: Sphere\n      ";
    let list = complete(doc, 5, 6).unwrap();
    assert_eq!(labels(&list), vec!["particles", "radius", "duration", "iterations"]);

    let inherited: Vec<bool> = list.candidates.iter().map(|c| c.inherited).collect();
    assert_eq!(inherited, vec![false, false, true, true]);
}

#[test]
fn test_action_triggers() {
    let list = complete("actions:\n  ", 1, 2).unwrap();
    assert_eq!(
        labels(&list),
        vec!["alternate_down", "alternate_sneak", "alternate_up", "cast"]
    );
}

#[test]
fn test_dashed_effect_keys_after_list_item() {
    let doc = "effects:\n  cast:\n    - location: origin\n    ";
    let list = complete(doc, 3, 4).unwrap();
    assert_eq!(
        labels(&list),
        vec!["- color", "- effectlib", "- location", "- sound"]
    );
    assert_eq!(list.candidates[0].text, "- color: ");
}

#[test]
fn test_new_effect_entry() {
    let doc = "effects:\n  cast:\n  - location: origin\n  ";
    let list = complete(doc, 3, 2).unwrap();
    let location = list.candidates.iter().find(|c| c.label == "- location").unwrap();
    assert_eq!(
        location.description,
        Some(vec!["Add a new effect to this list".to_string()])
    );
    assert!(labels(&list).contains(&"hit"));
    // cast is already a sibling
    assert!(!labels(&list).contains(&"cast"));
}

#[test]
fn test_parameter_values_from_declared_classes() {
    let doc = "actions:\n  cast:\n  - class: Potion\nparameters:\n  remove_effects: ";
    let list = complete(doc, 4, 18).unwrap();
    assert_eq!(labels(&list), vec!["jump", "slow", "speed"]);
}
