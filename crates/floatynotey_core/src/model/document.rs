//! Generic rich-text document tree.
//!
//! # Responsibility
//! - Represent editor content as a tagged tree (`type` + `attrs` + `content`
//!   + optional `text`/`marks`) without interpreting the schema.
//! - Serialize to the editor's JSON shape.
//!
//! # Invariants
//! - Decoding is total: any JSON value becomes a `Node`; missing or
//!   wrongly-typed fields decode as empty.
//! - Empty `attrs`/`content`/`marks` and absent `text` are omitted on encode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DOC: &str = "doc";
pub const PARAGRAPH: &str = "paragraph";
pub const TEXT: &str = "text";

/// One node of a document tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

/// Inline formatting applied to a text node (bold, link, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

impl Mark {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Map::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };
        let kind = match map.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return None,
        };
        let attrs = match map.remove("attrs") {
            Some(Value::Object(attrs)) => attrs,
            _ => Map::new(),
        };
        Some(Self { kind, attrs })
    }
}

impl Node {
    /// Element node with no attributes or children.
    pub fn element(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Text leaf.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: TEXT.to_string(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Root `doc` node holding `blocks`.
    pub fn doc(blocks: Vec<Node>) -> Self {
        Self::element(DOC).with_children(blocks)
    }

    /// Paragraph holding `inlines`.
    pub fn paragraph(inlines: Vec<Node>) -> Self {
        Self::element(PARAGRAPH).with_children(inlines)
    }

    /// Canonical empty document: one empty paragraph.
    pub fn empty_document() -> Self {
        Self::doc(vec![Self::paragraph(Vec::new())])
    }

    /// Document whose single paragraph holds `text` (empty text yields an
    /// empty paragraph).
    pub fn plain_document(text: &str) -> Self {
        let inlines = if text.is_empty() {
            Vec::new()
        } else {
            vec![Self::text(text)]
        };
        Self::doc(vec![Self::paragraph(inlines)])
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.content = children;
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_marks(mut self, marks: Vec<Mark>) -> Self {
        self.marks = marks;
        self
    }

    /// Appends the text of every leaf under this node, in document order.
    pub fn collect_text(&self, out: &mut String) {
        if let Some(text) = self.text.as_deref() {
            out.push_str(text);
        }
        for child in &self.content {
            child.collect_text(out);
        }
    }

    /// Concatenated `text` of the direct children; nested blocks add nothing.
    pub fn inline_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|child| child.text.as_deref())
            .collect()
    }

    /// Encodes this tree as compact JSON.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes JSON text. Only syntactically invalid JSON fails; any
    /// well-formed value maps to a node.
    pub fn from_json_str(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };

        let kind = match map.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => String::new(),
        };
        let attrs = match map.remove("attrs") {
            Some(Value::Object(attrs)) => attrs,
            _ => Map::new(),
        };
        let content = match map.remove("content") {
            Some(Value::Array(items)) => items.into_iter().map(Node::from).collect(),
            _ => Vec::new(),
        };
        let text = match map.remove("text") {
            Some(Value::String(text)) => Some(text),
            _ => None,
        };
        let marks = match map.remove("marks") {
            Some(Value::Array(items)) => items.into_iter().filter_map(Mark::from_value).collect(),
            _ => Vec::new(),
        };

        Self {
            kind,
            attrs,
            content,
            text,
            marks,
        }
    }
}
