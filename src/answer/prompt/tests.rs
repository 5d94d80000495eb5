use super::*;
use crate::chat::Role;

fn hit(id: &str, content: &str) -> SearchHit {
    SearchHit {
        id: id.to_string(),
        title: format!("Title {}", id),
        content: content.to_string(),
        score: 0.9,
    }
}

#[test]
fn context_rendering_format() {
    let rendered = render_context(&[hit("42", "A 2-person tent")]);
    assert_eq!(rendered, "catalog: 42\ncontent:\nA 2-person tent");
}

#[test]
fn context_preserves_hit_order() {
    let hits = vec![hit("a", "first"), hit("b", "second"), hit("c", "third")];
    let rendered = render_context(&hits);

    let first = rendered.find("first").expect("first hit rendered");
    let second = rendered.find("second").expect("second hit rendered");
    let third = rendered.find("third").expect("third hit rendered");
    assert!(first < second && second < third);
}

#[test]
fn context_keeps_duplicate_hits() {
    let hits = vec![hit("42", "same"), hit("42", "same")];
    let rendered = render_context(&hits);

    assert_eq!(rendered.matches("catalog: 42").count(), 2);
}

#[test]
fn empty_hits_render_empty_context() {
    assert_eq!(render_context(&[]), "");

    let system = render_system_message(&[]);
    assert!(!system.contains("{context}"));
}

#[test]
fn system_message_interpolates_context() {
    let system = render_system_message(&[hit("42", "A 2-person tent")]);

    assert!(system.contains("catalog: 42"));
    assert!(system.contains("A 2-person tent"));
    assert!(system.contains("include the product id"));
    assert!(!system.contains("{context}"));
}

#[test]
fn message_sequence_shape() {
    let messages = build_messages(&[hit("42", "A 2-person tent")], "lightweight tent?");

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[1].content, "lightweight tent?");
    assert!(messages[0].content.contains("catalog: 42"));
}
