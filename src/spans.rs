//! Span extraction and position-based reinjection.
//!
//! `extract` flattens a document into its visible span texts plus the
//! position of each one; `reinject` writes replacement texts back into a copy
//! of the document at those positions. Both sides rely on the same traversal
//! order: blocks first, then children inside each block.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::portable::{Block, Child, Document, Position};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub texts: Vec<String>,
    pub positions: Vec<Position>,
}

impl Extraction {
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// What a position without a matching replacement resolves to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReplacement {
    #[default]
    EmptyText,
    KeepOriginal,
}

impl MissingReplacement {
    pub fn parse(s: Option<&str>) -> Self {
        match s.unwrap_or("empty_text").trim().to_ascii_lowercase().as_str() {
            "keep_original" | "keep" => Self::KeepOriginal,
            _ => Self::EmptyText,
        }
    }
}

pub fn extract(doc: &Document) -> Extraction {
    let mut out = Extraction::default();
    for (bi, block) in doc.blocks().iter().enumerate() {
        let Block::Text(tb) = block else {
            continue;
        };
        for (ci, child) in tb.children().iter().enumerate() {
            let Child::Span(span) = child else {
                continue;
            };
            if span.text().is_empty() {
                continue;
            }
            out.texts.push(span.text().to_string());
            out.positions.push(Position::new(bi, ci));
        }
    }
    out
}

pub fn reinject(doc: &Document, positions: &[Position], replacements: &[String]) -> Document {
    reinject_with(doc, positions, replacements, MissingReplacement::default())
}

pub fn reinject_with(
    doc: &Document,
    positions: &[Position],
    replacements: &[String],
    missing: MissingReplacement,
) -> Document {
    if replacements.len() != positions.len() {
        warn!(
            "replacement count mismatch: positions={} replacements={}",
            positions.len(),
            replacements.len()
        );
    }
    let mut out = doc.clone();
    for (i, pos) in positions.iter().enumerate() {
        let Some(span) = out.span_mut(*pos) else {
            debug!("skip position {}:{} (no span)", pos.block, pos.span);
            continue;
        };
        match (replacements.get(i), missing) {
            (Some(text), _) => span.set_text(text.as_str()),
            (None, MissingReplacement::EmptyText) => span.set_text(String::new()),
            (None, MissingReplacement::KeepOriginal) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract, reinject, reinject_with, MissingReplacement};
    use crate::portable::{Document, Position};

    fn scenario() -> Document {
        Document::from_value(json!([
            {"_type": "block", "children": [{"_type": "span", "text": "Ready to grow?"}]},
            {"_type": "image", "src": "x.jpg"},
            {"_type": "block", "children": [
                {"_type": "span", "text": "Contact us"},
                {"_type": "span", "text": ""}
            ]}
        ]))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scenario_extract_and_reinject() {
        let doc = scenario();
        let ex = extract(&doc);
        assert_eq!(ex.texts, strings(&["Ready to grow?", "Contact us"]));
        assert_eq!(ex.positions, vec![Position::new(0, 0), Position::new(2, 0)]);

        let out = reinject(
            &doc,
            &ex.positions,
            &strings(&["¿Listo para crecer?", "Contáctanos"]),
        );
        assert_eq!(
            out.to_value(),
            json!([
                {"_type": "block", "children": [{"_type": "span", "text": "¿Listo para crecer?"}]},
                {"_type": "image", "src": "x.jpg"},
                {"_type": "block", "children": [
                    {"_type": "span", "text": "Contáctanos"},
                    {"_type": "span", "text": ""}
                ]}
            ])
        );
        assert_eq!(doc, scenario());
    }

    #[test]
    fn order_skips_empty_spans() {
        let doc = Document::from_value(json!([
            {"_type": "block", "children": [
                {"_type": "span", "text": "Hello"},
                {"_type": "span", "text": ""}
            ]},
            {"_type": "block", "children": [{"_type": "span", "text": "World"}]}
        ]));
        let ex = extract(&doc);
        assert_eq!(ex.texts, strings(&["Hello", "World"]));
        assert_eq!(ex.positions, vec![Position::new(0, 0), Position::new(1, 0)]);
    }

    #[test]
    fn identity_round_trip() {
        let doc = Document::from_value(json!([
            {"_key": "k", "_type": "block", "style": "blockquote", "markDefs": [{"_key": "l1", "_type": "link", "href": "/es/contact"}],
             "children": [
                {"_type": "span", "marks": ["l1"], "text": "Escríbenos"},
                {"_type": "span", "marks": [], "text": " hoy"}
             ]},
            {"_type": "code", "language": "ts", "code": "const a = 1"},
            {"_type": "table", "rows": [["a", "b"]]}
        ]));
        let ex = extract(&doc);
        assert_eq!(reinject(&doc, &ex.positions, &ex.texts), doc);
    }

    #[test]
    fn short_replacement_list_defaults_to_empty() {
        let doc = Document::from_value(json!([
            {"_type": "block", "children": [
                {"_type": "span", "text": "uno"},
                {"_type": "span", "text": "dos"},
                {"_type": "span", "text": "tres"}
            ]}
        ]));
        let ex = extract(&doc);
        assert_eq!(ex.len(), 3);
        let out = reinject(&doc, &ex.positions, &strings(&["one"]));
        assert_eq!(extract(&out).texts, strings(&["one"]));
        assert_eq!(
            out.span(Position::new(0, 1)).map(|s| s.text()),
            Some("")
        );

        let kept = reinject_with(
            &doc,
            &ex.positions,
            &strings(&["one"]),
            MissingReplacement::KeepOriginal,
        );
        assert_eq!(extract(&kept).texts, strings(&["one", "dos", "tres"]));
    }

    #[test]
    fn stale_positions_are_skipped() {
        let doc = scenario();
        let positions = vec![
            Position::new(1, 0),
            Position::new(7, 0),
            Position::new(0, 5),
            Position::new(2, 0),
        ];
        let out = reinject(&doc, &positions, &strings(&["x", "y", "z", "Contáctanos"]));
        assert_eq!(out.blocks()[1], doc.blocks()[1]);
        assert_eq!(
            extract(&out).texts,
            strings(&["Ready to grow?", "Contáctanos"])
        );
    }

    #[test]
    fn empty_and_null_documents() {
        let ex = extract(&Document::from_value(serde_json::Value::Null));
        assert!(ex.is_empty());
        assert!(ex.positions.is_empty());
        let out = reinject(&Document::default(), &[Position::new(0, 0)], &[]);
        assert!(out.is_empty());
    }

    #[test]
    fn policy_parse() {
        assert_eq!(MissingReplacement::parse(None), MissingReplacement::EmptyText);
        assert_eq!(
            MissingReplacement::parse(Some(" Keep_Original ")),
            MissingReplacement::KeepOriginal
        );
        assert_eq!(
            MissingReplacement::parse(Some("whatever")),
            MissingReplacement::EmptyText
        );
    }

    #[test]
    fn extraction_serializes_with_short_keys() {
        let ex = extract(&scenario());
        let v = serde_json::to_value(&ex).expect("serialize");
        assert_eq!(v["positions"][1], json!({"bi": 2, "ci": 0}));
    }
}
