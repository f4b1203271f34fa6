//! Dictionary encoding of repeated strings.
//!
//! A [`Dictionary`] maps each distinct string to the position at which it was
//! first seen. The ordered name list is the category table handed to the
//! consumer: `names()[code]` is the string behind `code`.
//!
//! Two dictionaries exist per decode session:
//! - [`ReferenceDictionary`]: fixed at construction from the header, so
//!   codes equal reference ids; unmapped records get [`NO_CATEGORY`].
//! - [`BarcodeDictionary`]: grows as new barcodes appear; a record without a
//!   barcode interns [`MISSING_BARCODE`] like any other value.

use crate::io::bam::Header;
use ahash::AHashMap;

/// Code for a record without a reference.
pub const NO_CATEGORY: i32 = -1;

/// Barcode value recorded for reads without a barcode tag.
pub const MISSING_BARCODE: &str = "NA";

/// Insertion-ordered string to code mapping.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    names: Vec<String>,
    index: AHashMap<String, u32>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dictionary whose codes follow the order of `names`.
    ///
    /// A repeated name keeps the code of its first occurrence; its later
    /// slots still occupy a code so positions stay aligned with the input.
    pub fn with_entries<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dictionary = Self::new();
        for name in names {
            let name = name.into();
            let code = dictionary.names.len() as u32;
            dictionary.index.entry(name.clone()).or_insert(code);
            dictionary.names.push(name);
        }
        dictionary
    }

    /// Code for `value`, assigning the next code if it is new.
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(&code) = self.index.get(value) {
            return code;
        }

        let code = self.names.len() as u32;
        self.names.push(value.to_string());
        self.index.insert(value.to_string(), code);
        code
    }

    /// Code for `value` if already present.
    pub fn lookup(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    /// String behind `code`.
    pub fn name(&self, code: u32) -> Option<&str> {
        self.names.get(code as usize).map(String::as_str)
    }

    /// Category table in code order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of codes assigned.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no code has been assigned.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Consume the dictionary, returning the category table.
    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

/// Reference names, pre-seeded from the header.
#[derive(Debug, Clone)]
pub struct ReferenceDictionary {
    dictionary: Dictionary,
}

impl ReferenceDictionary {
    /// Seed codes from the header's reference table.
    pub fn from_header(header: &Header) -> Self {
        Self {
            dictionary: Dictionary::with_entries(header.reference_names()),
        }
    }

    /// Code for a record's reference id; [`NO_CATEGORY`] when there is none.
    ///
    /// Ids are validated against the header by the record reader, so a
    /// present id is its own code.
    pub fn code_for(&self, reference_id: Option<usize>) -> i32 {
        match reference_id {
            Some(id) => id as i32,
            None => NO_CATEGORY,
        }
    }

    /// Code for a reference name. Never assigns a new code.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.dictionary.lookup(name)
    }

    /// Reference names in code order.
    pub fn names(&self) -> &[String] {
        self.dictionary.names()
    }

    /// Consume, returning the reference names in code order.
    pub fn into_names(self) -> Vec<String> {
        self.dictionary.into_names()
    }
}

/// Barcode values in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct BarcodeDictionary {
    dictionary: Dictionary,
}

impl BarcodeDictionary {
    /// Create an empty barcode dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Code for a record's barcode, or for [`MISSING_BARCODE`] when absent.
    pub fn code_for(&mut self, barcode: Option<&str>) -> u32 {
        self.dictionary.intern(barcode.unwrap_or(MISSING_BARCODE))
    }

    /// Barcodes in code order.
    pub fn names(&self) -> &[String] {
        self.dictionary.names()
    }

    /// Number of distinct barcodes seen (including the sentinel, if used).
    pub fn len(&self) -> usize {
        self.dictionary.len()
    }

    /// Whether no barcode has been interned.
    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty()
    }

    /// Consume, returning the barcodes in code order.
    pub fn into_names(self) -> Vec<String> {
        self.dictionary.into_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::bam::Reference;
    use proptest::prelude::*;

    #[test]
    fn test_intern_assigns_sequential_codes() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.intern("AAAC"), 0);
        assert_eq!(dict.intern("GGTT"), 1);
        assert_eq!(dict.intern("AAAC"), 0);
        assert_eq!(dict.intern("CCCA"), 2);

        assert_eq!(dict.names(), ["AAAC", "GGTT", "CCCA"]);
        assert_eq!(dict.name(1), Some("GGTT"));
        assert_eq!(dict.name(3), None);
        assert_eq!(dict.lookup("CCCA"), Some(2));
        assert_eq!(dict.lookup("TTTT"), None);
    }

    #[test]
    fn test_with_entries_keeps_positions() {
        let dict = Dictionary::with_entries(["chr1", "chr2", "chr1"]);
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.lookup("chr1"), Some(0));
        assert_eq!(dict.lookup("chr2"), Some(1));
    }

    #[test]
    fn test_reference_codes_equal_ids() {
        let header = Header::new(
            String::new(),
            vec![
                Reference::new("chr1".to_string(), 100),
                Reference::new("chrM".to_string(), 16569),
            ],
        );
        let refs = ReferenceDictionary::from_header(&header);

        assert_eq!(refs.code_for(Some(1)), 1);
        assert_eq!(refs.code_for(None), NO_CATEGORY);
        assert_eq!(refs.lookup("chrM"), Some(1));
        assert_eq!(refs.names(), ["chr1", "chrM"]);
    }

    #[test]
    fn test_missing_barcode_is_a_normal_entry() {
        let mut barcodes = BarcodeDictionary::new();
        assert!(barcodes.is_empty());

        let a = barcodes.code_for(Some("ACGT-1"));
        let missing = barcodes.code_for(None);
        let b = barcodes.code_for(Some("TTGA-1"));

        assert_eq!((a, missing, b), (0, 1, 2));
        assert_eq!(barcodes.code_for(None), missing);
        assert_eq!(barcodes.names()[missing as usize], MISSING_BARCODE);
    }

    proptest! {
        #[test]
        fn prop_codes_are_contiguous_and_round_trip(
            values in proptest::collection::vec("[ACGT]{1,4}", 0..200)
        ) {
            let mut dict = Dictionary::new();
            let codes: Vec<u32> = values.iter().map(|v| dict.intern(v)).collect();

            for (value, &code) in values.iter().zip(&codes) {
                prop_assert_eq!(dict.name(code), Some(value.as_str()));
            }
            let max = codes.iter().max().map_or(0, |&c| c as usize + 1);
            prop_assert_eq!(max, dict.len());
        }
    }
}
