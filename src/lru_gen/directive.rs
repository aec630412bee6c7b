//! Aging and eviction directives in lru_gen's write format.
//!
//! ```text
//! + memcg_id node_id max_gen [can_swap [force_scan]]
//! - memcg_id node_id min_gen [swappiness [nr_to_reclaim]]
//! ```

use serde::Serialize;
use std::fmt;

/// Directive verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Age,
    Reclaim,
}

impl DirectiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveKind::Age => "age",
            DirectiveKind::Reclaim => "reclaim",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verb-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DirectiveParams {
    Age { can_swap: u8, force_scan: u8 },
    Reclaim { swappiness: u8 },
}

/// One command for the kernel, built and issued within a single cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReclaimDirective {
    pub cgroup_id: String,
    pub node_id: u32,
    pub target_generation: u64,
    pub params: DirectiveParams,
}

impl ReclaimDirective {
    /// Requests a new generation after `max_gen`.
    pub fn age(
        cgroup_id: impl Into<String>,
        node_id: u32,
        max_gen: u64,
        can_swap: u8,
        force_scan: u8,
    ) -> Self {
        Self {
            cgroup_id: cgroup_id.into(),
            node_id,
            target_generation: max_gen,
            params: DirectiveParams::Age {
                can_swap,
                force_scan,
            },
        }
    }

    /// Evicts generation `min_gen`.
    pub fn reclaim(
        cgroup_id: impl Into<String>,
        node_id: u32,
        min_gen: u64,
        swappiness: u8,
    ) -> Self {
        Self {
            cgroup_id: cgroup_id.into(),
            node_id,
            target_generation: min_gen,
            params: DirectiveParams::Reclaim { swappiness },
        }
    }

    pub fn kind(&self) -> DirectiveKind {
        match self.params {
            DirectiveParams::Age { .. } => DirectiveKind::Age,
            DirectiveParams::Reclaim { .. } => DirectiveKind::Reclaim,
        }
    }

    /// The command line as written to the port, without newline.
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReclaimDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params {
            DirectiveParams::Age {
                can_swap,
                force_scan,
            } => write!(
                f,
                "+ {} {} {} {} {}",
                self.cgroup_id, self.node_id, self.target_generation, can_swap, force_scan
            ),
            DirectiveParams::Reclaim { swappiness } => write!(
                f,
                "- {} {} {} {}",
                self.cgroup_id, self.node_id, self.target_generation, swappiness
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_line() {
        let d = ReclaimDirective::age("5", 0, 4, 0, 0);
        assert_eq!(d.kind(), DirectiveKind::Age);
        assert_eq!(d.to_line(), "+ 5 0 4 0 0");
    }

    #[test]
    fn test_reclaim_line() {
        let d = ReclaimDirective::reclaim("5", 0, 2, 0);
        assert_eq!(d.kind(), DirectiveKind::Reclaim);
        assert_eq!(d.to_line(), "- 5 0 2 0");
    }
}
