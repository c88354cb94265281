//! Recognition tree produced by an OCR engine, and its transcript serialisation.
//!
//! The serde shape follows the docTR `export()` layout
//! (`pages[].blocks[].lines[].words[].value`). Geometry and the other
//! engine-specific fields are ignored on deserialisation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every page an engine recognised, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizedDocument {
    #[serde(default)]
    pub pages: Vec<RecognizedPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizedPage {
    #[serde(default)]
    pub blocks: Vec<RecognizedBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizedBlock {
    #[serde(default)]
    pub lines: Vec<RecognizedLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizedLine {
    #[serde(default)]
    pub words: Vec<RecognizedWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl RecognizedWord {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            confidence: None,
        }
    }
}

impl RecognizedLine {
    /// Build a line by splitting `text` on whitespace.
    pub fn from_text(text: &str) -> Self {
        Self {
            words: text.split_whitespace().map(RecognizedWord::new).collect(),
        }
    }
}

impl RecognizedPage {
    /// Parse plain text into a page: blank lines separate blocks, every other
    /// line becomes a [`RecognizedLine`].
    pub fn from_plain_text(text: &str) -> Self {
        let mut blocks = Vec::new();
        let mut current = RecognizedBlock::default();

        for line in text.lines() {
            if line.trim().is_empty() {
                if !current.lines.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                continue;
            }
            current.lines.push(RecognizedLine::from_text(line));
        }
        if !current.lines.is_empty() {
            blocks.push(current);
        }

        Self { blocks }
    }
}

impl RecognizedDocument {
    pub fn line_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| &p.blocks)
            .map(|b| b.lines.len())
            .sum()
    }
}

/// Plain-text serialisation of a [`RecognizedDocument`].
///
/// For every page, then block, then line: the word values joined by single
/// spaces, followed by `\n`. Blocks and pages add nothing of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript(String);

impl Transcript {
    pub fn from_document(doc: &RecognizedDocument) -> Self {
        let mut text = String::new();
        for page in &doc.pages {
            for block in &page.blocks {
                for line in &block.lines {
                    let mut words = line.words.iter().map(|w| w.value.as_str());
                    if let Some(first) = words.next() {
                        text.push_str(first);
                        for word in words {
                            text.push(' ');
                            text.push_str(word);
                        }
                    }
                    text.push('\n');
                }
            }
        }
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(words: &[&str]) -> RecognizedLine {
        RecognizedLine {
            words: words.iter().map(|w| RecognizedWord::new(*w)).collect(),
        }
    }

    fn sample() -> RecognizedDocument {
        RecognizedDocument {
            pages: vec![
                RecognizedPage {
                    blocks: vec![
                        RecognizedBlock {
                            lines: vec![line(&["TAX", "INVOICE"]), line(&["Page", "1/2"])],
                        },
                        RecognizedBlock {
                            lines: vec![line(&["Bill", "To:", "STRYKER"])],
                        },
                    ],
                },
                RecognizedPage {
                    blocks: vec![RecognizedBlock {
                        lines: vec![line(&["Total", "128033.00"])],
                    }],
                },
            ],
        }
    }

    #[test]
    fn transcript_walks_pages_blocks_lines_in_order() {
        let t = Transcript::from_document(&sample());
        assert_eq!(
            t.as_str(),
            "TAX INVOICE\nPage 1/2\nBill To: STRYKER\nTotal 128033.00\n"
        );
    }

    #[test]
    fn transcript_is_deterministic() {
        let doc = sample();
        let a = Transcript::from_document(&doc);
        let b = Transcript::from_document(&doc.clone());
        assert_eq!(a.as_str().as_bytes(), b.as_str().as_bytes());
    }

    #[test]
    fn empty_document_gives_empty_transcript() {
        let t = Transcript::from_document(&RecognizedDocument::default());
        assert!(t.is_empty());

        let only_empty_pages = RecognizedDocument {
            pages: vec![RecognizedPage::default(), RecognizedPage::default()],
        };
        assert!(Transcript::from_document(&only_empty_pages).is_empty());
    }

    #[test]
    fn line_without_words_still_ends_with_newline() {
        let doc = RecognizedDocument {
            pages: vec![RecognizedPage {
                blocks: vec![RecognizedBlock {
                    lines: vec![line(&[]), line(&["x"])],
                }],
            }],
        };
        assert_eq!(Transcript::from_document(&doc).as_str(), "\nx\n");
    }

    #[test]
    fn deserialises_doctr_export_ignoring_geometry() {
        let json = r#"{
            "pages": [{
                "page_idx": 0,
                "dimensions": [1654, 2339],
                "blocks": [{
                    "geometry": [[0.1, 0.1], [0.5, 0.2]],
                    "lines": [{
                        "geometry": [[0.1, 0.1], [0.5, 0.15]],
                        "words": [
                            {"value": "AIR", "confidence": 0.99, "geometry": [[0, 0], [1, 1]]},
                            {"value": "IMPORT", "confidence": 0.97}
                        ]
                    }],
                    "artefacts": []
                }]
            }]
        }"#;
        let doc: RecognizedDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.pages[0].blocks[0].lines[0].words[0].confidence, Some(0.99));
        assert_eq!(Transcript::from_document(&doc).as_str(), "AIR IMPORT\n");
    }

    #[test]
    fn plain_text_page_splits_blocks_on_blank_lines() {
        let page = RecognizedPage::from_plain_text(
            "KWE Kintetsu World Express\n3FL. NO.99\n\n  \nINVOICE   NO 5930\n",
        );
        assert_eq!(page.blocks.len(), 2);
        assert_eq!(page.blocks[0].lines.len(), 2);
        assert_eq!(
            page.blocks[1].lines[0],
            line(&["INVOICE", "NO", "5930"])
        );
    }

    #[test]
    fn plain_text_page_of_whitespace_is_empty() {
        assert!(RecognizedPage::from_plain_text("\n \n\t\n").blocks.is_empty());
    }
}
