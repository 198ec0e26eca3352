//! Crop label decoder (model identifier -> crop name)

use super::ClassifierError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Accepts `{"classes": [...]}` or a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum DecoderFile {
    Wrapped { classes: Vec<String> },
    Bare(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct LabelDecoder {
    classes: Vec<String>,
}

impl LabelDecoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read label decoder: {:?}", path))?;

        let file: DecoderFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse label decoder JSON: {:?}", path))?;

        let classes = match file {
            DecoderFile::Wrapped { classes } | DecoderFile::Bare(classes) => classes,
        };
        if classes.is_empty() {
            anyhow::bail!("Label decoder {:?} has no classes", path);
        }
        Ok(Self { classes })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn decode(&self, id: i64) -> Result<&str, ClassifierError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
            .ok_or(ClassifierError::UnseenIdentifier(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        let decoder = LabelDecoder::new(vec!["apple".into(), "rice".into()]);
        assert_eq!(decoder.decode(1).unwrap(), "rice");
        assert!(matches!(decoder.decode(2), Err(ClassifierError::UnseenIdentifier(2))));
        assert!(matches!(decoder.decode(-1), Err(ClassifierError::UnseenIdentifier(-1))));
    }

    #[test]
    fn test_both_file_shapes_parse() {
        let wrapped: DecoderFile = serde_json::from_str(r#"{"classes": ["a", "b"]}"#).unwrap();
        let bare: DecoderFile = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        for file in [wrapped, bare] {
            match file {
                DecoderFile::Wrapped { classes } | DecoderFile::Bare(classes) => {
                    assert_eq!(classes, vec!["a", "b"]);
                }
            }
        }
    }
}
