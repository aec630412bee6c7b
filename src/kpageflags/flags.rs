//! Bit positions of `/proc/kpageflags` records.
//!
//! Each physical page is described by one little-endian `u64`. Only the bits
//! listed here take part in classification; all other bits are kept in the
//! raw word so they can be rendered for diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const KPF_LOCKED: u32 = 0;
pub const KPF_REFERENCED: u32 = 2;
pub const KPF_LRU: u32 = 5;
pub const KPF_ACTIVE: u32 = 6;
pub const KPF_SLAB: u32 = 7;
pub const KPF_BUDDY: u32 = 10;
pub const KPF_ANON: u32 = 12;
pub const KPF_SWAPCACHE: u32 = 13;
pub const KPF_SWAPBACKED: u32 = 14;
pub const KPF_COMPOUND_HEAD: u32 = 15;
pub const KPF_COMPOUND_TAIL: u32 = 16;
pub const KPF_NOPAGE: u32 = 20;
pub const KPF_PGTABLE: u32 = 26;
/// Kernel-internal bit, only exported to privileged readers.
pub const KPF_RESERVED: u32 = 32;
/// Kernel-internal bit, only exported to privileged readers.
pub const KPF_MAPPEDTODISK: u32 = 34;

/// Names of the documented low bits, indexed by bit position.
const FLAG_NAMES: [&str; 27] = [
    "LOCKED",
    "ERROR",
    "REFERENCED",
    "UPTODATE",
    "DIRTY",
    "LRU",
    "ACTIVE",
    "SLAB",
    "WRITEBACK",
    "RECLAIM",
    "BUDDY",
    "MMAP",
    "ANON",
    "SWAPCACHE",
    "SWAPBACKED",
    "COMPOUND_HEAD",
    "COMPOUND_TAIL",
    "HUGE",
    "UNEVICTABLE",
    "HWPOISON",
    "NOPAGE",
    "KSM",
    "THP",
    "BALLOON",
    "ZERO_PAGE",
    "IDLE",
    "PGTABLE",
];

/// Raw flag word of a single physical page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct KPageFlags(pub u64);

impl KPageFlags {
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    #[inline]
    pub fn has(self, bit: u32) -> bool {
        self.0 & (1u64 << bit) != 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Comma-separated names of all set bits. Bits without a documented
    /// name are rendered as `BIT<n>`.
    pub fn names(self) -> String {
        (0..64u32)
            .filter(|&bit| self.has(bit))
            .map(|bit| match bit {
                KPF_RESERVED => "RESERVED".to_string(),
                KPF_MAPPEDTODISK => "MAPPEDTODISK".to_string(),
                b if (b as usize) < FLAG_NAMES.len() => FLAG_NAMES[b as usize].to_string(),
                b => format!("BIT{b}"),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for KPageFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x} [{}]", self.0, self.names())
    }
}

/// Bit-layout revision used to build the decoder rule list.
///
/// Kernels differ in which of the page-table/reserved/mapped-to-disk bits
/// are exported, so the layout is picked once at startup from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagLayout {
    /// Full table including PGTABLE, RESERVED and MAPPEDTODISK rules.
    #[default]
    Canonical,
    /// Older table without the three rules above.
    Legacy,
}

impl FlagLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            FlagLayout::Canonical => "canonical",
            FlagLayout::Legacy => "legacy",
        }
    }
}

impl std::str::FromStr for FlagLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canonical" => Ok(FlagLayout::Canonical),
            "legacy" => Ok(FlagLayout::Legacy),
            other => Err(format!(
                "Invalid flag layout '{}', expected 'canonical' or 'legacy'",
                other
            )),
        }
    }
}
