//! Bone and animation names.
//!
//! A name is a display string plus a 32-bit FNV-1a hash. The hash doubles as
//! the identity key in the container's on-disk name table and for cheap
//! equality during bone lookups. Renaming recomputes the hash.

use std::fmt;

/// On-disk name record size: hash u32 + NUL-padded text.
pub const NAME_RECORD_SIZE: usize = 32;
const NAME_TEXT_LEN: usize = NAME_RECORD_SIZE - 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoneName {
    text: String,
    hash: u32,
}

impl BoneName {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = fnv1a(text.as_bytes());
        Self { text, hash }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Replace the display string, recomputing the hash.
    pub fn rename(&mut self, text: impl Into<String>) {
        *self = Self::new(text);
    }

    /// Serialize as a name-table record.
    ///
    /// Text longer than 27 bytes is truncated; the record is NUL-padded.
    pub fn to_record(&self) -> [u8; NAME_RECORD_SIZE] {
        let mut record = [0u8; NAME_RECORD_SIZE];
        record[0..4].copy_from_slice(&self.hash.to_le_bytes());
        let text = self.text.as_bytes();
        let len = text.len().min(NAME_TEXT_LEN - 1);
        record[4..4 + len].copy_from_slice(&text[..len]);
        record
    }

    /// Parse a name-table record. The hash is recomputed from the text so a
    /// stale stored hash cannot poison lookups.
    pub fn from_record(record: &[u8]) -> Option<Self> {
        if record.len() < NAME_RECORD_SIZE {
            return None;
        }
        let text = &record[4..NAME_RECORD_SIZE];
        let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
        let text = String::from_utf8_lossy(&text[..end]).into_owned();
        Some(Self::new(text))
    }
}

impl fmt::Display for BoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// FNV-1a, 32-bit.
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_record_roundtrip() {
        let name = BoneName::new("center_c_n");
        let record = name.to_record();
        assert_eq!(record.len(), NAME_RECORD_SIZE);
        let parsed = BoneName::from_record(&record).unwrap();
        assert_eq!(parsed, name);
        assert_eq!(parsed.hash(), name.hash());
    }

    #[test]
    fn test_rename_recomputes_hash() {
        let mut name = BoneName::new("center_n");
        let before = name.hash();
        name.rename("center_c_n");
        assert_ne!(name.hash(), before);
        assert_eq!(name.as_str(), "center_c_n");
    }

    #[test]
    fn test_from_short_record() {
        assert!(BoneName::from_record(&[0u8; 8]).is_none());
    }
}
