//! Integration tests for response normalization.
//!
//! Exercises the public normalizers against the kinds of text models
//! actually return: clean JSON, fenced JSON, chatty wrappers and prose.

use memoir_core::{
    normalize_facts, normalize_reconciliation, FactExtractionResult, MemoryEvent, MemoryItem,
    ReconciliationEntry,
};

fn facts(items: &[&str]) -> FactExtractionResult {
    FactExtractionResult::new(items.iter().map(|s| s.to_string()).collect())
}

/// Text without any brace never yields facts.
#[test]
fn test_brace_free_text_is_always_empty() {
    let samples = [
        "",
        "   ",
        "hello, I love pizza\nno facts here",
        "- Likes pizza\n- Lives in SF",
        "```\nLikes pizza\n```",
        "[\"Likes pizza\"]",
        "\"just a string\"",
        "42",
        "null",
        "\u{0}\u{1}\u{fffd} binary-ish \u{7f}",
    ];

    for text in samples {
        assert_eq!(normalize_facts(text), facts(&[]), "input {:?}", text);
    }
}

/// Well-formed responses come back unchanged.
#[test]
fn test_valid_fact_json_is_identity() {
    let samples: [&[&str]; 4] = [
        &[],
        &["Name is John"],
        &["Sky is blue", "Grass is green"],
        &["Aime le café", "Vit à Paris", "Has \"quotes\" and {braces}"],
    ];

    for sample in samples {
        let expected = facts(sample);
        let json = serde_json::to_string(&expected).unwrap();
        assert_eq!(normalize_facts(&json), expected);

        let pretty = serde_json::to_string_pretty(&expected).unwrap();
        assert_eq!(normalize_facts(&pretty), expected);
    }
}

/// JSON surrounded by prose without unbalanced braces is extracted exactly.
#[test]
fn test_json_inside_prose_is_extracted() {
    let json = r#"{"facts": ["Promoted to senior engineer", "Prefers working from home"]}"#;
    let wrappers = [
        ("", ""),
        ("Here you go: ", ""),
        ("```json\n", "\n```"),
        ("Sure!\n\n", "\n\nAnything else?"),
        ("<answer>", "</answer>"),
        ("Template {name} filled: ", ""),
        ("{} ", " {done}"),
        ("Using {\"facts\": 1} as a hint: ", ""),
    ];

    for (prefix, suffix) in wrappers {
        let text = format!("{prefix}{json}{suffix}");
        assert_eq!(
            normalize_facts(&text),
            facts(&["Promoted to senior engineer", "Prefers working from home"]),
            "input {:?}",
            text
        );
    }
}

/// Normalizing a normalized result is a no-op.
#[test]
fn test_normalization_is_idempotent() {
    let samples = [
        "```json\n{\"facts\": [\"Name is John\"]}\n```",
        "{\"facts\": [\"a\"]",
        "{\"facts\": \"not a list\"}\nLoves hiking",
        "The user likes jazz.\n{ oops }",
        "plain prose",
    ];

    for text in samples {
        let once = normalize_facts(text);
        assert_eq!(normalize_facts(&once.to_json()), once, "input {:?}", text);
    }
}

#[test]
fn test_fenced_fact_scenario() {
    assert_eq!(
        normalize_facts("```json\n{\"facts\": [\"Name is John\"]}\n```"),
        facts(&["Name is John"])
    );
}

#[test]
fn test_reconciliation_none_scenario() {
    let old = vec![MemoryItem::new("0", "Likes cheese pizza")];
    let entries = normalize_reconciliation(
        r#"{"memory":[{"id":"0","text":"Likes cheese pizza","event":"NONE"}]}"#,
        &old,
    );

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, "0");
    assert_eq!(entries[0].event, MemoryEvent::None);
    assert_eq!(entries[0].text, "Likes cheese pizza");
}

#[test]
fn test_reconciliation_unknown_delete_scenario() {
    let old = vec![MemoryItem::new("0", "Likes cheese pizza")];
    let entries = normalize_reconciliation(
        r#"{"memory":[{"id":"0","text":"Likes cheese pizza","event":"NONE"},{"id":"99","text":"Something","event":"DELETE"}]}"#,
        &old,
    );

    assert!(entries.iter().all(|e| e.id != "99"));
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_reconciliation_blank_update_is_dropped() {
    let old = vec![MemoryItem::new("0", "Likes tea")];
    let entries = normalize_reconciliation(
        r#"{"memory":[{"id":"0","text":"","event":"UPDATE","old_memory":"Likes tea"}]}"#,
        &old,
    );

    assert!(entries.is_empty());
}

/// Whatever the model says, surviving decisions respect the snapshot ids.
#[test]
fn test_reconciliation_id_membership() {
    let old = vec![
        MemoryItem::new("a1", "Name is John"),
        MemoryItem::new("b2", "Loves cheese pizza"),
        MemoryItem::new("c3", "Works as a nurse"),
    ];
    let response = r#"Here is my decision:
```json
{"memory": [
    {"id": "a1", "text": "Name is John", "event": "NONE"},
    {"id": "b2", "text": "Loves cheese and ham pizza", "event": "UPDATE", "old_memory": "Loves cheese pizza"},
    {"id": "c3", "text": "Works as a nurse", "event": "ADD"},
    {"id": "d4", "text": "Plays the cello", "event": "ADD"},
    {"id": "zz", "text": "Invented", "event": "UPDATE", "old_memory": "Never stored"},
    {"id": "0", "text": "Index instead of id", "event": "DELETE"}
]}
```"#;

    let entries = normalize_reconciliation(response, &old);
    let snapshot_ids: Vec<&str> = old.iter().map(|m| m.id.as_str()).collect();

    for entry in &entries {
        match entry.event {
            MemoryEvent::Add => assert!(!snapshot_ids.contains(&entry.id.as_str())),
            _ => assert!(snapshot_ids.contains(&entry.id.as_str())),
        }
        assert_eq!(entry.old_text.is_some(), entry.event == MemoryEvent::Update);
    }

    assert_eq!(
        entries,
        vec![
            ReconciliationEntry::unchanged("a1", "Name is John"),
            ReconciliationEntry::update("b2", "Loves cheese and ham pizza", "Loves cheese pizza"),
            ReconciliationEntry::add("d4", "Plays the cello"),
        ]
    );
}
