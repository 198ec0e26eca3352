//! Soil Type Encoding
//!
//! Maps the six recognized soil categories to the positional integer codes
//! the crop model was trained on. Matching is exact and case-sensitive.
//!
//! The code is a single ordinal feature, not a one-hot block.

/// Recognized soil category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoilType {
    Alluvial,
    Loamy,
    LoamyLight,
    SandyLoam,
    BlackRegur,
    Laterite,
}

/// Soil label as submitted by the client, paired with its model code
struct SoilEntry {
    soil: SoilType,
    label: &'static str,
    code: u8,
}

static SOIL_TABLE: &[SoilEntry] = &[
    SoilEntry { soil: SoilType::Alluvial, label: "Alluvial", code: 0 },
    SoilEntry { soil: SoilType::Loamy, label: "Loamy", code: 1 },
    SoilEntry { soil: SoilType::LoamyLight, label: "Loamy (Light Soil)", code: 2 },
    SoilEntry { soil: SoilType::SandyLoam, label: "Sandy Loam", code: 3 },
    SoilEntry { soil: SoilType::BlackRegur, label: "Black Soil (Regur)", code: 4 },
    SoilEntry { soil: SoilType::Laterite, label: "Laterite", code: 5 },
];

impl SoilType {
    /// All soil types in code order
    pub const ALL: [SoilType; 6] = [
        SoilType::Alluvial,
        SoilType::Loamy,
        SoilType::LoamyLight,
        SoilType::SandyLoam,
        SoilType::BlackRegur,
        SoilType::Laterite,
    ];

    /// Parse a client-supplied label (exact match only)
    pub fn from_label(label: &str) -> Option<Self> {
        SOIL_TABLE
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.soil)
    }

    /// Display label, identical to the accepted input string
    pub fn label(self) -> &'static str {
        self.entry().label
    }

    /// Positional model code (0-5)
    pub fn code(self) -> u8 {
        self.entry().code
    }

    fn entry(self) -> &'static SoilEntry {
        // Table is indexed in enum declaration order
        &SOIL_TABLE[self as usize]
    }
}

impl std::fmt::Display for SoilType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Labels of all recognized soil types, in code order
pub fn soil_labels() -> Vec<String> {
    SoilType::ALL.iter().map(|s| s.label().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_codes() {
        assert_eq!(SoilType::from_label("Alluvial").map(SoilType::code), Some(0));
        assert_eq!(SoilType::from_label("Loamy").map(SoilType::code), Some(1));
        assert_eq!(SoilType::from_label("Loamy (Light Soil)").map(SoilType::code), Some(2));
        assert_eq!(SoilType::from_label("Sandy Loam").map(SoilType::code), Some(3));
        assert_eq!(SoilType::from_label("Black Soil (Regur)").map(SoilType::code), Some(4));
        assert_eq!(SoilType::from_label("Laterite").map(SoilType::code), Some(5));
    }

    #[test]
    fn test_table_matches_enum_order() {
        for (idx, soil) in SoilType::ALL.iter().enumerate() {
            assert_eq!(soil.code() as usize, idx);
            assert_eq!(SoilType::from_label(soil.label()), Some(*soil));
        }
    }

    #[test]
    fn test_match_is_case_sensitive() {
        assert_eq!(SoilType::from_label("loamy"), None);
        assert_eq!(SoilType::from_label("LATERITE"), None);
        assert_eq!(SoilType::from_label(" Loamy"), None);
        assert_eq!(SoilType::from_label("Unknown"), None);
        assert_eq!(SoilType::from_label(""), None);
    }

    #[test]
    fn test_soil_labels_order() {
        let labels = soil_labels();
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], "Alluvial");
        assert_eq!(labels[5], "Laterite");
    }
}
