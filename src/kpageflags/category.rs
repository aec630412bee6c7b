//! Semantic memory categories derived from page flags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a physical page is used for, as far as the flag word tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Free,
    File,
    Anon,
    AnonMisc,
    Slab,
    #[serde(rename = "pgtable")]
    PageTable,
    Reserved,
    UnknownFlags,
    Unknown,
}

impl Category {
    /// All categories in reporting order.
    pub const ALL: [Category; 9] = [
        Category::Free,
        Category::File,
        Category::Anon,
        Category::AnonMisc,
        Category::Slab,
        Category::PageTable,
        Category::Reserved,
        Category::UnknownFlags,
        Category::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Free => "free",
            Category::File => "file",
            Category::Anon => "anon",
            Category::AnonMisc => "anon_misc",
            Category::Slab => "slab",
            Category::PageTable => "pgtable",
            Category::Reserved => "reserved",
            Category::UnknownFlags => "unknown_flags",
            Category::Unknown => "unknown",
        }
    }

    /// Pages that can be freed or dropped without write-back.
    pub fn is_reclaimable(self) -> bool {
        matches!(self, Category::Free | Category::File)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
