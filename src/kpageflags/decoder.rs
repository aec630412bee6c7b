//! Priority-ordered decoding of page flag words into categories.
//!
//! The decoder is an ordered list of rules; the first rule whose bit is set
//! decides the outcome. Compound-page state is threaded explicitly through
//! every call so a scan is a plain fold over the record stream.

use super::category::Category;
use super::flags::{
    FlagLayout, KPageFlags, KPF_ANON, KPF_BUDDY, KPF_COMPOUND_HEAD, KPF_COMPOUND_TAIL, KPF_LRU,
    KPF_MAPPEDTODISK, KPF_NOPAGE, KPF_PGTABLE, KPF_RESERVED, KPF_SLAB, KPF_SWAPBACKED,
};

/// What a matching rule does with the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Take the category of the most recent compound head.
    Inherit,
    Classify(Category),
    /// Emit no record for this page.
    Skip,
}

/// A single `bit set -> outcome` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub name: &'static str,
    pub bit: u32,
    pub outcome: Outcome,
}

impl Rule {
    const fn new(name: &'static str, bit: u32, outcome: Outcome) -> Self {
        Self { name, bit, outcome }
    }

    #[inline]
    pub fn matches(&self, flags: KPageFlags) -> bool {
        flags.has(self.bit)
    }
}

const CANONICAL_RULES: [Rule; 10] = [
    Rule::new("COMPOUND_TAIL", KPF_COMPOUND_TAIL, Outcome::Inherit),
    Rule::new("BUDDY", KPF_BUDDY, Outcome::Classify(Category::Free)),
    Rule::new("SLAB", KPF_SLAB, Outcome::Classify(Category::Slab)),
    Rule::new("ANON", KPF_ANON, Outcome::Classify(Category::Anon)),
    Rule::new("SWAPBACKED", KPF_SWAPBACKED, Outcome::Classify(Category::AnonMisc)),
    Rule::new("LRU", KPF_LRU, Outcome::Classify(Category::File)),
    Rule::new("PGTABLE", KPF_PGTABLE, Outcome::Classify(Category::PageTable)),
    Rule::new("RESERVED", KPF_RESERVED, Outcome::Classify(Category::Reserved)),
    Rule::new("MAPPEDTODISK", KPF_MAPPEDTODISK, Outcome::Classify(Category::File)),
    Rule::new("NOPAGE", KPF_NOPAGE, Outcome::Skip),
];

const LEGACY_RULES: [Rule; 7] = [
    Rule::new("COMPOUND_TAIL", KPF_COMPOUND_TAIL, Outcome::Inherit),
    Rule::new("BUDDY", KPF_BUDDY, Outcome::Classify(Category::Free)),
    Rule::new("SLAB", KPF_SLAB, Outcome::Classify(Category::Slab)),
    Rule::new("ANON", KPF_ANON, Outcome::Classify(Category::Anon)),
    Rule::new("SWAPBACKED", KPF_SWAPBACKED, Outcome::Classify(Category::AnonMisc)),
    Rule::new("LRU", KPF_LRU, Outcome::Classify(Category::File)),
    Rule::new("NOPAGE", KPF_NOPAGE, Outcome::Skip),
];

/// Category of the last compound head seen in the scan.
///
/// `None` until the first head; a tail seen before any head decodes as
/// [`Category::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompoundState(pub Option<Category>);

impl CompoundState {
    pub fn inherited(self) -> Category {
        self.0.unwrap_or(Category::Unknown)
    }
}

/// Result of decoding one flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Page(Category),
    Skipped,
}

/// Flag-word decoder built from a [`FlagLayout`].
#[derive(Debug, Clone)]
pub struct PageFlagDecoder {
    rules: &'static [Rule],
}

impl Default for PageFlagDecoder {
    fn default() -> Self {
        Self::new(FlagLayout::default())
    }
}

impl PageFlagDecoder {
    pub fn new(layout: FlagLayout) -> Self {
        let rules: &'static [Rule] = match layout {
            FlagLayout::Canonical => &CANONICAL_RULES,
            FlagLayout::Legacy => &LEGACY_RULES,
        };
        Self { rules }
    }

    /// Rule names in priority order, e.g. `COMPOUND_TAIL > BUDDY > ...`.
    pub fn rule_order(&self) -> String {
        self.rules
            .iter()
            .map(|rule| rule.name)
            .collect::<Vec<_>>()
            .join(" > ")
    }

    /// First rule matching `flags`, if any.
    pub fn matching_rule(&self, flags: KPageFlags) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(flags))
    }

    /// Decodes one page and returns the compound state for the next page.
    ///
    /// A set COMPOUND_HEAD bit makes the computed category the new state,
    /// whichever rule fired. Skipped pages leave the state untouched.
    pub fn decode(&self, flags: KPageFlags, state: CompoundState) -> (Decoded, CompoundState) {
        let decoded = match self.matching_rule(flags).map(|rule| rule.outcome) {
            Some(Outcome::Inherit) => Decoded::Page(state.inherited()),
            Some(Outcome::Classify(category)) => Decoded::Page(category),
            Some(Outcome::Skip) => Decoded::Skipped,
            None if flags.is_zero() => Decoded::Page(Category::Unknown),
            None => Decoded::Page(Category::UnknownFlags),
        };

        let next = match decoded {
            Decoded::Page(category) if flags.has(KPF_COMPOUND_HEAD) => {
                CompoundState(Some(category))
            }
            _ => state,
        };

        (decoded, next)
    }
}
