/// Page phase definitions for the pagination state machine
///
/// Every listing page moves through these phases exactly once, driven by the
/// responses the crawl controller receives for it.
use std::fmt;

/// Represents where a listing page is in its crawl lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagePhase {
    // ===== Active Phases =====
    /// The listing request has been issued
    Requesting,

    /// The listing response arrived and its links are being decoded
    ParsingLinks,

    /// Child requests are in flight
    AwaitingChildren,

    /// A child just landed and contiguous results are being released
    Draining,

    /// Every child has been released; the next page is being decided
    Advancing,

    // ===== Terminal Phases =====
    /// The page finished and its successor (if any) has been requested
    Done,

    /// The page could not be processed
    Failed,
}

impl PagePhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if this page still has work outstanding
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// The transition table
    ///
    /// `Failed` is reachable from every non-terminal phase. Terminal phases
    /// accept nothing.
    pub fn can_transition_to(&self, next: PagePhase) -> bool {
        use PagePhase::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }

        matches!(
            (*self, next),
            (Requesting, ParsingLinks)
                | (ParsingLinks, AwaitingChildren)
                | (AwaitingChildren, Draining)
                | (AwaitingChildren, Advancing)
                | (Draining, AwaitingChildren)
                | (Draining, Advancing)
                | (Advancing, Done)
        )
    }

    /// Short lowercase name used in logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requesting => "requesting",
            Self::ParsingLinks => "parsing_links",
            Self::AwaitingChildren => "awaiting_children",
            Self::Draining => "draining",
            Self::Advancing => "advancing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all phases
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Requesting,
            Self::ParsingLinks,
            Self::AwaitingChildren,
            Self::Draining,
            Self::Advancing,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PagePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(PagePhase::Done.is_terminal());
        assert!(PagePhase::Failed.is_terminal());

        assert!(!PagePhase::Requesting.is_terminal());
        assert!(!PagePhase::AwaitingChildren.is_terminal());
        assert!(!PagePhase::Advancing.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            PagePhase::Requesting,
            PagePhase::ParsingLinks,
            PagePhase::AwaitingChildren,
            PagePhase::Draining,
            PagePhase::AwaitingChildren,
            PagePhase::Draining,
            PagePhase::Advancing,
            PagePhase::Done,
        ];

        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_empty_page_skips_draining() {
        assert!(PagePhase::AwaitingChildren.can_transition_to(PagePhase::Advancing));
    }

    #[test]
    fn test_failed_reachable_from_active_phases() {
        for phase in PagePhase::all_phases() {
            assert_eq!(
                phase.can_transition_to(PagePhase::Failed),
                phase.is_active(),
                "{}",
                phase
            );
        }
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!PagePhase::Requesting.can_transition_to(PagePhase::Draining));
        assert!(!PagePhase::ParsingLinks.can_transition_to(PagePhase::Done));
        assert!(!PagePhase::Draining.can_transition_to(PagePhase::Requesting));
        assert!(!PagePhase::Done.can_transition_to(PagePhase::Requesting));
        assert!(!PagePhase::Failed.can_transition_to(PagePhase::Failed));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PagePhase::AwaitingChildren), "awaiting_children");
        assert_eq!(format!("{}", PagePhase::Done), "done");
    }

    #[test]
    fn test_all_phases_complete() {
        let all = PagePhase::all_phases();
        assert_eq!(all.len(), 7);

        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j], "Duplicate phase found");
            }
        }
    }
}
