//! Page registry
//!
//! Nine fixed pages. Each carries three accessibility flags:
//! - `manual_access`: reachable by an unforced `GOTO`
//! - `system_only`: reachable only by internal logic
//! - `forced`: reachable only as a step of the approval ritual
//!
//! The table is built once and never changes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical page identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageId {
    /// Decision desk, the entry page.
    #[serde(rename = "P1")]
    Decision,
    /// Fact ledger view.
    #[serde(rename = "P2")]
    Ledger,
    /// Rule list.
    #[serde(rename = "P3")]
    Rules,
    /// Weekly budget view.
    #[serde(rename = "P4")]
    Budget,
    /// Friction / escalation review. System only.
    #[serde(rename = "P5")]
    Friction,
    /// Kill review. System only.
    #[serde(rename = "P6")]
    KillReview,
    /// Approval step one: long-term direction. Forced.
    #[serde(rename = "P7")]
    ApproveLongTerm,
    /// Approval step two: budget confirmation. Forced.
    #[serde(rename = "P8")]
    ApproveBudget,
    /// Export view.
    #[serde(rename = "P9")]
    Export,
}

impl PageId {
    /// All pages in registry order.
    pub const ALL: [PageId; 9] = [
        PageId::Decision,
        PageId::Ledger,
        PageId::Rules,
        PageId::Budget,
        PageId::Friction,
        PageId::KillReview,
        PageId::ApproveLongTerm,
        PageId::ApproveBudget,
        PageId::Export,
    ];

    /// The page the machine starts on.
    pub const ENTRY: PageId = PageId::Decision;

    /// Short code (`P1`..`P9`).
    pub fn code(&self) -> &'static str {
        PageRegistry::spec(*self).code
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        PageRegistry::spec(*self).name
    }

    /// Parse a page code. Unknown codes are a caller problem, not a panic.
    pub fn from_code(code: &str) -> Option<PageId> {
        PAGES
            .iter()
            .find(|p| p.code.eq_ignore_ascii_case(code))
            .map(|p| p.page)
    }

    fn index(&self) -> usize {
        match self {
            PageId::Decision => 0,
            PageId::Ledger => 1,
            PageId::Rules => 2,
            PageId::Budget => 3,
            PageId::Friction => 4,
            PageId::KillReview => 5,
            PageId::ApproveLongTerm => 6,
            PageId::ApproveBudget => 7,
            PageId::Export => 8,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Accessibility flags of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Accessibility {
    pub manual_access: bool,
    pub system_only: bool,
    pub forced: bool,
}

/// One row of the static table.
#[derive(Debug, Clone, Copy)]
pub struct PageSpec {
    pub page: PageId,
    pub code: &'static str,
    pub name: &'static str,
    pub access: Accessibility,
}

const fn manual() -> Accessibility {
    Accessibility {
        manual_access: true,
        system_only: false,
        forced: false,
    }
}

const fn system_only() -> Accessibility {
    Accessibility {
        manual_access: false,
        system_only: true,
        forced: false,
    }
}

const fn forced() -> Accessibility {
    Accessibility {
        manual_access: false,
        system_only: false,
        forced: true,
    }
}

static PAGES: [PageSpec; 9] = [
    PageSpec { page: PageId::Decision, code: "P1", name: "decision", access: manual() },
    PageSpec { page: PageId::Ledger, code: "P2", name: "ledger", access: manual() },
    PageSpec { page: PageId::Rules, code: "P3", name: "rules", access: manual() },
    PageSpec { page: PageId::Budget, code: "P4", name: "budget", access: manual() },
    PageSpec { page: PageId::Friction, code: "P5", name: "friction", access: system_only() },
    PageSpec { page: PageId::KillReview, code: "P6", name: "kill_review", access: system_only() },
    PageSpec { page: PageId::ApproveLongTerm, code: "P7", name: "approve_long_term", access: forced() },
    PageSpec { page: PageId::ApproveBudget, code: "P8", name: "approve_budget", access: forced() },
    PageSpec { page: PageId::Export, code: "P9", name: "export", access: manual() },
];

/// Read-only lookup over the page table.
pub struct PageRegistry;

impl PageRegistry {
    /// Table row for a page.
    pub fn spec(page: PageId) -> &'static PageSpec {
        let spec = &PAGES[page.index()];
        debug_assert_eq!(spec.page, page, "page table out of order at {}", spec.code);
        spec
    }

    /// Accessibility flags for a page.
    pub fn accessibility(page: PageId) -> Accessibility {
        Self::spec(page).access
    }

    /// Whether an unforced `GOTO` may land on the page.
    pub fn is_manually_reachable(page: PageId) -> bool {
        Self::accessibility(page).manual_access
    }

    /// Full table, registry order.
    pub fn all() -> &'static [PageSpec; 9] {
        &PAGES
    }
}
