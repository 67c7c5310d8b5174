//! Lexical rich-text extraction
//!
//! Post bodies are Lexical documents: a JSON tree whose leaves are text runs
//! and whose interior nodes are block elements (paragraphs, headings, list
//! items, quotes). For speech we only need the plain text, with block
//! boundaries turned into sentence-ish pauses.

use serde_json::Value;

/// Node types that end a spoken block. Each contributes a newline so the
/// chunker can prefer these boundaries.
const BLOCK_TYPES: &[&str] = &["paragraph", "heading", "listitem", "quote"];

/// Extract the spoken text from a Lexical document.
///
/// Text runs are concatenated in document order; block-level nodes add a
/// newline separator; unknown node types are recursed through so custom
/// nodes don't silently drop their text. The result is whitespace-normalized:
/// runs of spaces collapse to one, blank lines disappear.
pub fn extract_text(document: &Value) -> String {
    let mut out = String::new();

    if let Some(root) = document.get("root") {
        walk(root, &mut out);
    } else {
        walk(document, &mut out);
    }

    normalize(&out)
}

fn walk(node: &Value, out: &mut String) {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        out.push_str(text);
    }

    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            walk(child, out);
        }
    }

    let node_type = node.get("type").and_then(Value::as_str).unwrap_or("");
    if BLOCK_TYPES.contains(&node_type) {
        out.push('\n');
    }
}

/// Collapse runs of spaces and drop blank lines, preserving single newlines
/// as block separators.
fn normalize(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            lines.push(collapsed);
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_paragraph_text() {
        let doc = json!({
            "root": {
                "type": "root",
                "children": [
                    {
                        "type": "paragraph",
                        "children": [
                            {"type": "text", "text": "Hello "},
                            {"type": "text", "text": "world."}
                        ]
                    }
                ]
            }
        });

        assert_eq!(extract_text(&doc), "Hello world.");
    }

    #[test]
    fn block_nodes_separate_lines() {
        let doc = json!({
            "root": {
                "type": "root",
                "children": [
                    {"type": "heading", "children": [{"type": "text", "text": "Title"}]},
                    {"type": "paragraph", "children": [{"type": "text", "text": "Body one."}]},
                    {"type": "quote", "children": [{"type": "text", "text": "Quoted."}]}
                ]
            }
        });

        assert_eq!(extract_text(&doc), "Title\nBody one.\nQuoted.");
    }

    #[test]
    fn recurses_through_unknown_nodes() {
        let doc = json!({
            "root": {
                "type": "root",
                "children": [
                    {
                        "type": "collapsible-container",
                        "children": [
                            {"type": "paragraph", "children": [{"type": "text", "text": "Hidden text."}]}
                        ]
                    }
                ]
            }
        });

        assert_eq!(extract_text(&doc), "Hidden text.");
    }

    #[test]
    fn empty_and_whitespace_only_documents() {
        let doc = json!({"root": {"type": "root", "children": []}});
        assert_eq!(extract_text(&doc), "");

        let doc = json!({
            "root": {
                "type": "root",
                "children": [
                    {"type": "paragraph", "children": [{"type": "text", "text": "   "}]}
                ]
            }
        });
        assert_eq!(extract_text(&doc), "");
    }

    #[test]
    fn collapses_internal_whitespace() {
        let doc = json!({
            "root": {
                "type": "root",
                "children": [
                    {"type": "paragraph", "children": [{"type": "text", "text": "A   lot\tof   space"}]}
                ]
            }
        });

        assert_eq!(extract_text(&doc), "A lot of space");
    }

    #[test]
    fn handles_document_without_root_wrapper() {
        let doc = json!({
            "type": "paragraph",
            "children": [{"type": "text", "text": "Bare paragraph."}]
        });

        assert_eq!(extract_text(&doc), "Bare paragraph.");
    }

    #[test]
    fn nested_list_items() {
        let doc = json!({
            "root": {
                "type": "root",
                "children": [
                    {
                        "type": "list",
                        "children": [
                            {"type": "listitem", "children": [{"type": "text", "text": "First"}]},
                            {"type": "listitem", "children": [{"type": "text", "text": "Second"}]}
                        ]
                    }
                ]
            }
        });

        assert_eq!(extract_text(&doc), "First\nSecond");
    }
}
