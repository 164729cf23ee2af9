//! Per-selection state
//!
//! Every call to `Explorer::select` creates a fresh `SelectionSession`
//! tagged with the next `Generation`. Pipeline events carry the generation
//! they were spawned for; anything that doesn't match the live session is
//! stale and gets dropped.

use crate::errors::GeoQueryError;
use crate::query::Filter;
use crate::view::Graphic;
use std::fmt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    Loading,
    /// At least one region branch has delivered results.
    PartialResults,
    Settled,
    Failed,
}

impl SelectionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SelectionPhase::Settled | SelectionPhase::Failed)
    }
}

#[derive(Debug)]
pub struct SelectionSession {
    generation: Generation,
    region: String,
    filter: Filter,
    cancel: CancellationToken,
    expected_branches: Option<usize>,
    completed_branches: usize,
    extent_done: bool,
    outcome_shown: bool,
    pub(crate) results: Vec<Graphic>,
    errors: Vec<GeoQueryError>,
    phase: SelectionPhase,
}

impl SelectionSession {
    pub fn new(generation: Generation, region: impl Into<String>, filter: Filter) -> Self {
        Self {
            generation,
            region: region.into(),
            filter,
            cancel: CancellationToken::new(),
            expected_branches: None,
            completed_branches: 0,
            extent_done: false,
            outcome_shown: false,
            results: Vec::new(),
            errors: Vec::new(),
            phase: SelectionPhase::Loading,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    /// Token handed to the pipeline; cancelled when the session is replaced.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Accumulated results across all region branches, in arrival order.
    pub fn results(&self) -> &[Graphic] {
        &self.results
    }

    pub fn result(&self, index: usize) -> Option<&Graphic> {
        self.results.get(index)
    }

    pub fn errors(&self) -> &[GeoQueryError] {
        &self.errors
    }

    pub fn expected_branches(&self) -> Option<usize> {
        self.expected_branches
    }

    pub fn completed_branches(&self) -> usize {
        self.completed_branches
    }

    pub(crate) fn regions_resolved(&mut self, count: usize) {
        self.expected_branches = Some(count);
    }

    pub(crate) fn branch_completed(&mut self) {
        self.completed_branches += 1;
        if !self.results.is_empty() && !self.phase.is_terminal() {
            self.phase = SelectionPhase::PartialResults;
        }
    }

    pub(crate) fn extent_completed(&mut self) {
        self.extent_done = true;
    }

    pub(crate) fn record_error(&mut self, error: GeoQueryError) {
        self.errors.push(error);
    }

    pub(crate) fn fail(&mut self, error: GeoQueryError) {
        self.errors.push(error);
        self.phase = SelectionPhase::Failed;
    }

    /// Region count known and every region branch reported. The extent
    /// lookup is not part of this.
    pub fn branches_done(&self) -> bool {
        self.expected_branches
            .map_or(false, |expected| self.completed_branches >= expected)
    }

    /// Branches done and the extent lookup reported.
    pub fn is_complete(&self) -> bool {
        self.extent_done && self.branches_done()
    }

    /// True exactly once, on the first call after every branch reported.
    /// The list outcome for an empty selection is decided here.
    pub(crate) fn take_list_outcome(&mut self) -> bool {
        if self.outcome_shown || self.phase == SelectionPhase::Failed || !self.branches_done() {
            return false;
        }
        self.outcome_shown = true;
        true
    }

    /// Moves to `Settled` once complete. Returns true on the transition.
    pub(crate) fn try_settle(&mut self) -> bool {
        if self.phase.is_terminal() || !self.is_complete() {
            return false;
        }
        self.phase = SelectionPhase::Settled;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SelectionSession {
        SelectionSession::new(
            Generation::default().next(),
            "Africa",
            Filter::equals("CONTINENT", "Africa").unwrap(),
        )
    }

    #[test]
    fn test_generation_increases() {
        let first = Generation::default().next();
        let second = first.next();
        assert!(second > first);
        assert_eq!(first.value(), 1);
        assert_eq!(second.to_string(), "#2");
    }

    #[test]
    fn test_settles_only_when_everything_reported() {
        let mut session = session();
        assert_eq!(session.phase(), SelectionPhase::Loading);
        assert!(!session.try_settle());

        session.regions_resolved(2);
        session.branch_completed();
        session.extent_completed();
        assert!(!session.try_settle());

        session.branch_completed();
        assert!(session.try_settle());
        assert_eq!(session.phase(), SelectionPhase::Settled);
        assert!(!session.try_settle());
    }

    #[test]
    fn test_zero_regions_waits_for_extent() {
        let mut session = session();
        session.regions_resolved(0);
        assert!(!session.is_complete());
        session.extent_completed();
        assert!(session.try_settle());
    }

    #[test]
    fn test_list_outcome_ignores_extent() {
        let mut session = session();
        assert!(!session.take_list_outcome());

        session.regions_resolved(1);
        assert!(!session.take_list_outcome());
        session.branch_completed();
        assert!(session.take_list_outcome());
        assert!(!session.take_list_outcome());
        assert!(!session.is_complete());
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut session = session();
        session.fail(GeoQueryError::connect("cities", "refused"));
        session.regions_resolved(0);
        session.extent_completed();
        assert!(!session.try_settle());
        assert_eq!(session.phase(), SelectionPhase::Failed);
        assert_eq!(session.errors().len(), 1);
    }

    #[test]
    fn test_cancel_reaches_child_tokens() {
        let session = session();
        let token = session.cancel_token();
        assert!(!token.is_cancelled());
        session.cancel();
        assert!(token.is_cancelled());
        assert!(session.is_cancelled());
    }
}
