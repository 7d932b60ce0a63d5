//! Legacy editor markup → document tree conversion.
//!
//! # Responsibility
//! - Tokenize the HTML subset the old single-document editor persisted.
//! - Map elements onto the editor schema (`paragraph`, `heading`, lists,
//!   task lists, code blocks, marks).
//!
//! # Invariants
//! - Output is always a `doc` with at least one block.
//! - Parsing never fails. Unclosed elements are closed at end of input, a
//!   closing tag without a matching open element is dropped, and a `<` that
//!   never reaches `>` is kept as text.
//! - Unknown elements are transparent: their children are kept.
//! - Elements nested deeper than `MAX_DEPTH` are flattened into their parent.

use crate::model::document::{Mark, Node, DOC, PARAGRAPH, TEXT};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<(/?)([A-Za-z][A-Za-z0-9]*)([^<>]*)>").expect("valid tag regex")
});
static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?s)<!--.*?-->").expect("valid comment regex"));
static DECLARATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<![^<>]*>").expect("valid declaration regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("valid attribute regex")
});
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z]+);").expect("valid entity regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "wbr", "col"];
const BLOCK_CONTAINERS: &[&str] = &[
    "html", "body", "main", "div", "section", "article", "header", "footer",
];
/// Open elements beyond this depth are dropped; their content is kept.
const MAX_DEPTH: usize = 128;

/// Parses legacy editor markup into a `doc` node.
///
/// Mirrors how a browser reads broken HTML: any input yields a document.
pub fn parse_markup(source: &str) -> Node {
    let root = build_tree(tokenize(source));
    let mut blocks = blocks_from(&root.children);
    if blocks.is_empty() {
        blocks.push(Node::paragraph(Vec::new()));
    }
    Node::element(DOC).with_children(blocks)
}

#[derive(Debug)]
enum Token {
    Open {
        tag: String,
        attrs: BTreeMap<String, String>,
        self_closing: bool,
    },
    Close {
        tag: String,
    },
    Text(String),
}

#[derive(Debug, Default)]
struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    children: Vec<Dom>,
}

#[derive(Debug)]
enum Dom {
    Element(Element),
    Text(String),
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    fn push_text(&mut self, text: String) {
        if let Some(Dom::Text(previous)) = self.children.last_mut() {
            previous.push_str(&text);
        } else {
            self.children.push(Dom::Text(text));
        }
    }
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let rest = &source[pos..];
        let Some(lt) = rest.find('<') else {
            tokens.push(Token::Text(decode_entities(rest)));
            break;
        };
        if lt > 0 {
            tokens.push(Token::Text(decode_entities(&rest[..lt])));
            pos += lt;
            continue;
        }

        if let Some(found) = COMMENT_RE.find(rest).or_else(|| DECLARATION_RE.find(rest)) {
            pos += found.end();
            continue;
        }

        if let Some(caps) = TAG_RE.captures(rest) {
            tokens.push(tag_token(&caps));
            pos += caps[0].len();
            continue;
        }

        // A bare `<` ("a < b") or one that never reaches `>`.
        tokens.push(Token::Text("<".to_string()));
        pos += 1;
    }

    tokens
}

fn tag_token(caps: &Captures<'_>) -> Token {
    let tag = caps[2].to_ascii_lowercase();
    if !caps[1].is_empty() {
        return Token::Close { tag };
    }

    let raw_attrs = caps.get(3).map_or("", |m| m.as_str());
    let self_closing = raw_attrs.trim_end().ends_with('/');
    let mut attrs = BTreeMap::new();
    for attr in ATTR_RE.captures_iter(raw_attrs) {
        let value = attr
            .get(2)
            .or_else(|| attr.get(3))
            .or_else(|| attr.get(4))
            .map_or(String::new(), |m| decode_entities(m.as_str()));
        attrs.insert(attr[1].to_ascii_lowercase(), value);
    }

    Token::Open {
        tag,
        attrs,
        self_closing,
    }
}

fn build_tree(tokens: Vec<Token>) -> Element {
    let mut stack = vec![Element {
        tag: "#root".to_string(),
        ..Element::default()
    }];

    for token in tokens {
        match token {
            Token::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.push_text(text);
                }
            }
            Token::Open {
                tag,
                attrs,
                self_closing,
            } => {
                let element = Element {
                    tag,
                    attrs,
                    children: Vec::new(),
                };
                if self_closing || VOID_TAGS.contains(&element.tag.as_str()) {
                    if let Some(top) = stack.last_mut() {
                        top.children.push(Dom::Element(element));
                    }
                } else if stack.len() <= MAX_DEPTH {
                    stack.push(element);
                }
            }
            Token::Close { tag } => {
                if VOID_TAGS.contains(&tag.as_str()) {
                    continue;
                }
                // Stray closing tags are ignored.
                if let Some(depth) = stack.iter().skip(1).rposition(|open| open.tag == tag) {
                    // `rposition` on the skipped iterator is relative to index 1.
                    close_down_to(&mut stack, depth + 1);
                }
            }
        }
    }

    close_down_to(&mut stack, 1);
    stack.pop().unwrap_or_default()
}

/// Pops and attaches every element at index `>= depth` to its parent.
fn close_down_to(stack: &mut Vec<Element>, depth: usize) {
    while stack.len() > depth {
        let Some(done) = stack.pop() else {
            break;
        };
        if let Some(parent) = stack.last_mut() {
            parent.children.push(Dom::Element(done));
        }
    }
}

fn blocks_from(children: &[Dom]) -> Vec<Node> {
    let mut blocks = Vec::new();
    let mut pending_inline = Vec::new();

    for child in children {
        match child {
            Dom::Element(element) if is_block(element) => {
                flush_paragraph(&mut pending_inline, &mut blocks);
                if BLOCK_CONTAINERS.contains(&element.tag.as_str()) {
                    blocks.extend(blocks_from(&element.children));
                } else {
                    blocks.push(block_node(element));
                }
            }
            other => inline_into(other, &[], &mut pending_inline),
        }
    }

    flush_paragraph(&mut pending_inline, &mut blocks);
    blocks
}

fn is_block(element: &Element) -> bool {
    matches!(
        element.tag.as_str(),
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "blockquote"
            | "ul"
            | "ol"
            | "li"
            | "pre"
            | "hr"
    ) || BLOCK_CONTAINERS.contains(&element.tag.as_str())
}

fn block_node(element: &Element) -> Node {
    match element.tag.as_str() {
        "p" => Node::element(PARAGRAPH).with_children(inline_content(&element.children)),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = element.tag[1..].parse::<u8>().unwrap_or(1);
            Node::element("heading")
                .with_attr("level", level)
                .with_children(inline_content(&element.children))
        }
        "blockquote" => Node::element("blockquote").with_children(non_empty(blocks_from(
            &element.children,
        ))),
        "ul" if element.attr("data-type") == Some("taskList") => {
            Node::element("taskList").with_children(blocks_from(&element.children))
        }
        "ul" => Node::element("bulletList").with_children(blocks_from(&element.children)),
        "ol" => {
            let start = element
                .attr("start")
                .and_then(|value| value.trim().parse::<i64>().ok())
                .unwrap_or(1);
            Node::element("orderedList")
                .with_attr("start", start)
                .with_children(blocks_from(&element.children))
        }
        "li" if element.attr("data-type") == Some("taskItem") => {
            let checked = element.attr("data-checked") == Some("true");
            Node::element("taskItem")
                .with_attr("checked", checked)
                .with_children(non_empty(blocks_from(&element.children)))
        }
        "li" => Node::element("listItem").with_children(non_empty(blocks_from(&element.children))),
        "pre" => code_block(element),
        "hr" => Node::element("horizontalRule"),
        _ => Node::element(PARAGRAPH).with_children(inline_content(&element.children)),
    }
}

fn code_block(element: &Element) -> Node {
    let mut text = String::new();
    raw_text(&element.children, &mut text);

    let language = std::iter::once(element)
        .chain(element.children.iter().filter_map(|child| match child {
            Dom::Element(inner) if inner.tag == "code" => Some(inner),
            _ => None,
        }))
        .filter_map(|candidate| candidate.attr("class"))
        .flat_map(str::split_whitespace)
        .find_map(|class| class.strip_prefix("language-"))
        .map(str::to_string);

    let mut node = Node::element("codeBlock");
    node = node.with_attr(
        "language",
        language.map_or(serde_json::Value::Null, serde_json::Value::String),
    );
    if !text.is_empty() {
        node = node.with_children(vec![Node::text(text)]);
    }
    node
}

fn raw_text(children: &[Dom], out: &mut String) {
    for child in children {
        match child {
            Dom::Text(text) => out.push_str(text),
            Dom::Element(element) if element.tag == "br" => out.push('\n'),
            Dom::Element(element) => raw_text(&element.children, out),
        }
    }
}

fn inline_content(children: &[Dom]) -> Vec<Node> {
    let mut inlines = Vec::new();
    for child in children {
        inline_into(child, &[], &mut inlines);
    }
    tidy_inlines(inlines)
}

fn inline_into(dom: &Dom, marks: &[Mark], out: &mut Vec<Node>) {
    match dom {
        Dom::Text(text) => {
            let collapsed = WHITESPACE_RE.replace_all(text, " ");
            if !collapsed.is_empty() {
                out.push(Node::text(collapsed.into_owned()).with_marks(marks.to_vec()));
            }
        }
        Dom::Element(element) => {
            if element.tag == "br" {
                out.push(Node::element("hardBreak"));
                return;
            }
            let mut nested = marks.to_vec();
            if let Some(mark) = mark_for(element) {
                if !nested.iter().any(|existing| existing.kind == mark.kind) {
                    nested.push(mark);
                }
            }
            for child in &element.children {
                inline_into(child, &nested, out);
            }
        }
    }
}

fn mark_for(element: &Element) -> Option<Mark> {
    match element.tag.as_str() {
        "strong" | "b" => Some(Mark::new("bold")),
        "em" | "i" => Some(Mark::new("italic")),
        "s" | "strike" | "del" => Some(Mark::new("strike")),
        "code" => Some(Mark::new("code")),
        "a" => element
            .attr("href")
            .map(|href| Mark::new("link").with_attr("href", href)),
        _ => None,
    }
}

/// Merges adjacent equally-marked text and trims the block edges.
fn tidy_inlines(inlines: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::new();
    for node in inlines {
        if let Some(previous) = merged.last_mut() {
            if previous.kind == TEXT && node.kind == TEXT && previous.marks == node.marks {
                if let (Some(left), Some(right)) = (previous.text.as_mut(), node.text.as_deref())
                {
                    left.push_str(right);
                    continue;
                }
            }
        }
        merged.push(node);
    }

    if let Some(first) = merged.first_mut() {
        if let Some(text) = first.text.as_mut() {
            *text = text.trim_start().to_string();
        }
    }
    if let Some(last) = merged.last_mut() {
        if let Some(text) = last.text.as_mut() {
            *text = text.trim_end().to_string();
        }
    }
    merged.retain(|node| node.kind != TEXT || node.text.as_deref().is_some_and(|t| !t.is_empty()));
    merged
}

fn flush_paragraph(pending: &mut Vec<Node>, blocks: &mut Vec<Node>) {
    if pending.is_empty() {
        return;
    }
    let inlines = tidy_inlines(std::mem::take(pending));
    if !inlines.is_empty() {
        blocks.push(Node::paragraph(inlines));
    }
}

fn non_empty(mut blocks: Vec<Node>) -> Vec<Node> {
    if blocks.is_empty() {
        blocks.push(Node::paragraph(Vec::new()));
    }
    blocks
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    ENTITY_RE
        .replace_all(raw, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(decimal) = entity.strip_prefix('#') {
                decimal.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::{parse_markup, MAX_DEPTH};
    use crate::model::document::{Mark, Node};
    use serde_json::json;

    #[test]
    fn single_paragraph_becomes_doc_with_text() {
        let doc = parse_markup("<p>My old note</p>");
        assert_eq!(
            doc,
            Node::doc(vec![Node::paragraph(vec![Node::text("My old note")])])
        );
    }

    #[test]
    fn headings_marks_and_breaks_map_to_schema() {
        let doc = parse_markup(
            "<h2>Plan</h2>\n<p>Buy <strong>milk</strong><br>and <a href=\"https://x.test\">eggs</a></p>",
        );
        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            encoded,
            json!({
                "type": "doc",
                "content": [
                    {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Plan"}]},
                    {"type": "paragraph", "content": [
                        {"type": "text", "text": "Buy "},
                        {"type": "text", "text": "milk", "marks": [{"type": "bold"}]},
                        {"type": "hardBreak"},
                        {"type": "text", "text": "and "},
                        {"type": "text", "text": "eggs", "marks": [{"type": "link", "attrs": {"href": "https://x.test"}}]}
                    ]}
                ]
            })
        );
    }

    #[test]
    fn task_lists_keep_checked_state() {
        let doc = parse_markup(
            r#"<ul data-type="taskList"><li data-type="taskItem" data-checked="true"><label><input type="checkbox" checked><span></span></label><div><p>done</p></div></li><li data-type="taskItem" data-checked="false"><div><p>todo</p></div></li></ul>"#,
        );
        let list = &doc.content[0];
        assert_eq!(list.kind, "taskList");
        assert_eq!(list.content.len(), 2);
        assert_eq!(list.content[0].kind, "taskItem");
        assert_eq!(list.content[0].attrs["checked"], json!(true));
        assert_eq!(list.content[0].content, vec![Node::paragraph(vec![Node::text("done")])]);
        assert_eq!(list.content[1].attrs["checked"], json!(false));
    }

    #[test]
    fn code_block_preserves_whitespace_and_language() {
        let doc = parse_markup("<pre><code class=\"language-rust\">fn main() {\n    1 &lt; 2;\n}</code></pre>");
        let block = &doc.content[0];
        assert_eq!(block.kind, "codeBlock");
        assert_eq!(block.attrs["language"], json!("rust"));
        assert_eq!(
            block.content,
            vec![Node::text("fn main() {\n    1 < 2;\n}")]
        );
    }

    #[test]
    fn loose_text_and_entities_are_wrapped_in_a_paragraph() {
        let doc = parse_markup("Tom &amp; Jerry &#x1F600; a < b");
        assert_eq!(
            doc,
            Node::doc(vec![Node::paragraph(vec![Node::text("Tom & Jerry 😀 a < b")])])
        );
    }

    #[test]
    fn unclosed_elements_are_closed_at_end_of_input() {
        let doc = parse_markup("<p>open <em>ended");
        assert_eq!(
            doc,
            Node::doc(vec![Node::paragraph(vec![
                Node::text("open "),
                Node::text("ended").with_marks(vec![Mark::new("italic")]),
            ])])
        );
    }

    #[test]
    fn whitespace_only_input_yields_one_empty_paragraph() {
        assert_eq!(parse_markup("  \n "), Node::empty_document());
        assert_eq!(parse_markup("<!-- nothing -->"), Node::empty_document());
    }

    #[test]
    fn stray_closing_tags_are_ignored() {
        assert_eq!(
            parse_markup("<p>precious</p></span>"),
            Node::doc(vec![Node::paragraph(vec![Node::text("precious")])])
        );
        assert_eq!(
            parse_markup("<p>text</div> more</p>"),
            Node::doc(vec![Node::paragraph(vec![Node::text("text more")])])
        );
    }

    #[test]
    fn unterminated_tag_is_kept_as_text() {
        assert_eq!(
            parse_markup("<p>text</p><p class=\"x\""),
            Node::doc(vec![
                Node::paragraph(vec![Node::text("text")]),
                Node::paragraph(vec![Node::text("<p class=\"x\"")]),
            ])
        );
    }

    #[test]
    fn deep_nesting_is_flattened() {
        let depth = MAX_DEPTH * 4;
        let markup = format!("{}deep{}", "<div>".repeat(depth), "</div>".repeat(depth));
        assert_eq!(
            parse_markup(&markup),
            Node::doc(vec![Node::paragraph(vec![Node::text("deep")])])
        );
    }
}
