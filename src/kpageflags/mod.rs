//! Page flag table decoding and classification.
//!
//! This module provides:
//! - `flags`: bit positions, the raw flag word and the versioned bit layouts
//! - `category`: semantic memory categories
//! - `decoder`: priority-ordered rule list with explicit compound-page state
//! - `classifier`: full-table scans producing totals and the dense category sequence
//! - `source`: the live `/proc/kpageflags` file and in-memory tables

pub mod category;
pub mod classifier;
pub mod decoder;
pub mod flags;
pub mod source;

use once_cell::sync::Lazy;

// Re-export commonly used types
pub use category::Category;
pub use classifier::{CategoryTotals, ClassifierSnapshot, PageClassifier};
pub use decoder::{CompoundState, Decoded, Outcome, PageFlagDecoder, Rule};
pub use flags::{FlagLayout, KPageFlags};
pub use source::{encode_records, FlagTable, InMemoryFlagTable, KPageFlagsFile, RECORD_SIZE};

/// Fallback page size when sysconf cannot tell.
pub const DEFAULT_PAGE_SIZE: u64 = 4096;

/// Get the system page size in bytes.
fn get_page_size() -> u64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_PAGESIZE
        // Returns -1 on error - handled by the > 0 check
        unsafe {
            let size = libc::sysconf(libc::_SC_PAGESIZE);
            if size > 0 {
                return size as u64;
            }
        }
    }
    DEFAULT_PAGE_SIZE
}

/// System page size (for converting page counts into bytes).
pub static PAGE_SIZE: Lazy<u64> = Lazy::new(get_page_size);
