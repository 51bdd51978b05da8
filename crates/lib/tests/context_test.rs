//! # Context Assembly Tests
//!
//! The assembler is a pure function of its inputs: these tests pin the
//! history window, the role prefixes, the glossary rendering, and the
//! placeholder behavior.

use askdb::context::{
    build_glossary_context, build_history_context, GenerationContext, HISTORY_WINDOW,
    NO_GLOSSARY_PLACEHOLDER, NO_HISTORY_PLACEHOLDER,
};
use askdb::types::{ChatRole, HistoryTurn, TermEntry};

fn turn(role: ChatRole, content: &str) -> HistoryTurn {
    HistoryTurn {
        role,
        content: content.to_string(),
    }
}

#[test]
fn empty_history_renders_placeholder() {
    assert_eq!(build_history_context(&[]), NO_HISTORY_PLACEHOLDER);
}

#[test]
fn history_is_prefixed_by_role_oldest_first() {
    let turns = vec![
        turn(ChatRole::User, "how many users?"),
        turn(ChatRole::Assistant, "There are 42 users."),
    ];
    assert_eq!(
        build_history_context(&turns),
        "User: how many users?\nAssistant: There are 42 users."
    );
}

#[test]
fn history_keeps_only_the_trailing_window() {
    let turns: Vec<HistoryTurn> = (0..10)
        .map(|i| turn(ChatRole::User, &format!("question {i}")))
        .collect();
    let rendered = build_history_context(&turns);
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), HISTORY_WINDOW);
    assert_eq!(lines[0], "User: question 4");
    assert_eq!(lines[HISTORY_WINDOW - 1], "User: question 9");
}

#[test]
fn glossary_renders_one_line_per_term() {
    let terms = vec![
        TermEntry {
            id: 1,
            term: "GMV".to_string(),
            definition: "gross merchandise value".to_string(),
            data_source_id: Some(1),
        },
        TermEntry {
            id: 2,
            term: "churn".to_string(),
            definition: "customers lost in a period".to_string(),
            data_source_id: None,
        },
    ];
    assert_eq!(
        build_glossary_context(&terms),
        "- GMV: gross merchandise value\n- churn: customers lost in a period"
    );
    assert_eq!(build_glossary_context(&[]), NO_GLOSSARY_PLACEHOLDER);
}

#[test]
fn render_fills_every_placeholder() {
    let context = GenerationContext {
        schema_context: "Table: users".to_string(),
        glossary_context: "- GMV: gross merchandise value".to_string(),
        examples_context: "Q: q\nSQL: s".to_string(),
        chat_history: "User: hi".to_string(),
        question: "how many users?".to_string(),
    };
    let rendered = context.render(
        "{schema_context}|{term_glossary}|{sql_examples}|{chat_history}|{question}",
    );
    assert_eq!(
        rendered,
        "Table: users|- GMV: gross merchandise value|Q: q\nSQL: s|User: hi|how many users?"
    );
}

#[test]
fn render_is_deterministic() {
    let context = GenerationContext {
        schema_context: "s".to_string(),
        glossary_context: "g".to_string(),
        examples_context: "e".to_string(),
        chat_history: "h".to_string(),
        question: "q".to_string(),
    };
    let template = "{schema_context}{term_glossary}{sql_examples}{chat_history}{question}";
    assert_eq!(context.render(template), context.render(template));
}
