//! Portable rich-text documents as stored by the CMS.
//!
//! A document is an ordered list of blocks. Only paragraph-like blocks
//! (`_type == "block"` with a `children` array) are interpreted; every other
//! block is kept as raw JSON and written back untouched.

use anyhow::anyhow;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const TYPE_KEY: &str = "_type";
const CHILDREN_KEY: &str = "children";
const TEXT_KEY: &str = "text";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Text(TextBlock),
    Opaque(Value),
}

/// A paragraph-like block. `fields` keeps every key of the source object in
/// source order; the `children` slot holds `Null` while the children live in
/// `children`.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    fields: Map<String, Value>,
    children: Vec<Child>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Span(Span),
    Opaque(Value),
}

/// An inline text leaf. The `text` field is always a JSON string.
#[derive(Clone, Debug, PartialEq)]
pub struct Span {
    fields: Map<String, Value>,
}

/// Location of one span: block index, then child index inside that block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "bi")]
    pub block: usize,
    #[serde(rename = "ci")]
    pub span: usize,
}

impl Position {
    pub fn new(block: usize, span: usize) -> Self {
        Self { block, span }
    }
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Anything but a JSON array (including `null`) is an empty document.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Self {
                blocks: items.into_iter().map(Block::from_value).collect(),
            },
            _ => Self::default(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.blocks.iter().map(Block::to_value).collect())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn span(&self, pos: Position) -> Option<&Span> {
        match self.blocks.get(pos.block)? {
            Block::Text(tb) => match tb.children.get(pos.span)? {
                Child::Span(span) => Some(span),
                Child::Opaque(_) => None,
            },
            Block::Opaque(_) => None,
        }
    }

    pub fn span_mut(&mut self, pos: Position) -> Option<&mut Span> {
        match self.blocks.get_mut(pos.block)? {
            Block::Text(tb) => match tb.children.get_mut(pos.span)? {
                Child::Span(span) => Some(span),
                Child::Opaque(_) => None,
            },
            Block::Opaque(_) => None,
        }
    }

    pub fn spans_mut(&mut self) -> impl Iterator<Item = &mut Span> {
        self.blocks
            .iter_mut()
            .filter_map(|b| match b {
                Block::Text(tb) => Some(tb.children.iter_mut()),
                Block::Opaque(_) => None,
            })
            .flatten()
            .filter_map(|c| match c {
                Child::Span(span) => Some(span),
                Child::Opaque(_) => None,
            })
    }
}

impl Block {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) if is_text_block(&map) => Block::Text(TextBlock::from_map(map)),
            other => Block::Opaque(other),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Block::Text(tb) => tb.to_value(),
            Block::Opaque(v) => v.clone(),
        }
    }
}

fn is_text_block(map: &Map<String, Value>) -> bool {
    map.get(TYPE_KEY).and_then(Value::as_str) == Some("block")
        && map.get(CHILDREN_KEY).is_some_and(Value::is_array)
}

impl TextBlock {
    fn from_map(mut fields: Map<String, Value>) -> Self {
        let children = match fields.get_mut(CHILDREN_KEY).map(Value::take) {
            Some(Value::Array(items)) => items.into_iter().map(Child::from_value).collect(),
            _ => Vec::new(),
        };
        Self { fields, children }
    }

    fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        // Same key, so the slot keeps its original position.
        map.insert(
            CHILDREN_KEY.to_string(),
            Value::Array(self.children.iter().map(Child::to_value).collect()),
        );
        Value::Object(map)
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub fn style(&self) -> Option<&str> {
        self.fields.get("style").and_then(Value::as_str)
    }

    pub fn list_item(&self) -> Option<&str> {
        self.fields.get("listItem").and_then(Value::as_str)
    }
}

impl Child {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) if is_span(&map) => Child::Span(Span { fields: map }),
            other => Child::Opaque(other),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Child::Span(span) => Value::Object(span.fields.clone()),
            Child::Opaque(v) => v.clone(),
        }
    }
}

fn is_span(map: &Map<String, Value>) -> bool {
    map.get(TYPE_KEY).and_then(Value::as_str) == Some("span")
        && map.get(TEXT_KEY).is_some_and(Value::is_string)
}

impl Span {
    pub fn text(&self) -> &str {
        self.fields
            .get(TEXT_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.fields
            .insert(TEXT_KEY.to_string(), Value::String(text.into()));
    }

    pub fn marks(&self) -> Vec<&str> {
        self.fields
            .get("marks")
            .and_then(Value::as_array)
            .map(|m| m.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Document::from_value)
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Document::from_value(value)
    }
}

/// SHA-256 over the document with every span text blanked out.
pub fn structure_fingerprint(doc: &Document) -> String {
    let mut blank = doc.clone();
    for span in blank.spans_mut() {
        span.set_text(String::new());
    }
    let mut hasher = Sha256::new();
    for block in blank.blocks() {
        let bytes = serde_json::to_vec(&block.to_value()).unwrap_or_default();
        hasher.update(b"B:");
        hasher.update(&bytes);
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

pub fn verify_structure_unchanged(before: &Document, after: &Document) -> anyhow::Result<()> {
    let baseline = structure_fingerprint(before);
    let current = structure_fingerprint(after);
    if baseline != current {
        return Err(anyhow!(
            "non-text structure changed (baseline={baseline} current={current})"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{structure_fingerprint, verify_structure_unchanged, Block, Child, Document, Position};

    fn sample() -> serde_json::Value {
        json!([
            {"_key": "a1", "_type": "block", "style": "h2", "markDefs": [], "children": [
                {"_key": "s1", "_type": "span", "marks": ["strong"], "text": "Ready to grow?"},
                {"_type": "inlineIcon", "name": "star"}
            ]},
            {"_type": "image", "asset": {"_ref": "image-abc-800x600-jpg"}},
            {"_type": "block", "listItem": "bullet", "level": 1, "children": [
                {"_type": "span", "text": "Contact us"}
            ]}
        ])
    }

    #[test]
    fn classifies_blocks_and_children() {
        let doc = Document::from_value(sample());
        assert_eq!(doc.len(), 3);
        match &doc.blocks()[0] {
            Block::Text(tb) => {
                assert_eq!(tb.style(), Some("h2"));
                assert!(matches!(tb.children()[0], Child::Span(_)));
                assert!(matches!(tb.children()[1], Child::Opaque(_)));
            }
            other => panic!("expected text block, got {other:?}"),
        }
        assert!(matches!(doc.blocks()[1], Block::Opaque(_)));
        match &doc.blocks()[2] {
            Block::Text(tb) => assert_eq!(tb.list_item(), Some("bullet")),
            other => panic!("expected text block, got {other:?}"),
        }
    }

    #[test]
    fn value_round_trip_keeps_field_order() {
        let src = sample();
        let doc = Document::from_value(src.clone());
        let out = serde_json::to_string(&doc).expect("serialize");
        assert_eq!(out, serde_json::to_string(&src).expect("serialize source"));
    }

    #[test]
    fn non_array_input_is_empty() {
        assert!(Document::from_value(serde_json::Value::Null).is_empty());
        assert!(Document::from_value(json!({"_type": "block"})).is_empty());
        let doc: Document = serde_json::from_str("null").expect("parse null");
        assert!(doc.is_empty());
    }

    #[test]
    fn malformed_nodes_stay_opaque() {
        let doc = Document::from_value(json!([
            {"_type": "block", "children": "nope"},
            {"_type": "block", "children": [{"_type": "span", "text": 42}, {"_type": "span"}]},
            "stray",
            null
        ]));
        assert!(matches!(doc.blocks()[0], Block::Opaque(_)));
        assert!(doc.span(Position::new(1, 0)).is_none());
        assert!(doc.span(Position::new(1, 1)).is_none());
        assert!(matches!(doc.blocks()[2], Block::Opaque(_)));
        assert!(matches!(doc.blocks()[3], Block::Opaque(_)));
    }

    #[test]
    fn span_accessors() {
        let mut doc = Document::from_value(sample());
        let pos = Position::new(0, 0);
        assert_eq!(doc.span(pos).map(|s| s.marks()), Some(vec!["strong"]));
        doc.span_mut(pos).expect("span").set_text("¿Listo para crecer?");
        assert_eq!(doc.span(pos).map(|s| s.text()), Some("¿Listo para crecer?"));
        assert!(doc.span(Position::new(1, 0)).is_none());
        assert!(doc.span(Position::new(9, 0)).is_none());
    }

    #[test]
    fn fingerprint_ignores_text_only() {
        let before = Document::from_value(sample());
        let mut texts_changed = before.clone();
        for span in texts_changed.spans_mut() {
            span.set_text("otro");
        }
        assert_eq!(structure_fingerprint(&before), structure_fingerprint(&texts_changed));
        verify_structure_unchanged(&before, &texts_changed).expect("same structure");

        let mut v = sample();
        v[0]["style"] = json!("normal");
        let restyled = Document::from_value(v);
        assert!(verify_structure_unchanged(&before, &restyled).is_err());
    }
}
