//! Two-phase local update of a merged trial-venue.
//!
//! A change is applied to a tentative copy so it can be shown at once, then
//! either confirmed, replaced by the authoritative record, or reverted to the
//! last committed state.

use crate::domain::field::UpdateMap;
use crate::domain::trial_venue::{ApplyError, TrialVenue};

#[derive(Debug, Clone, PartialEq)]
pub struct Optimistic {
    committed: TrialVenue,
    tentative: Option<TrialVenue>,
}

impl Optimistic {
    pub fn new(view: TrialVenue) -> Self {
        Self {
            committed: view,
            tentative: None,
        }
    }

    /// The state to display: the tentative view if one is pending.
    #[must_use]
    pub fn current(&self) -> &TrialVenue {
        self.tentative.as_ref().unwrap_or(&self.committed)
    }

    /// The last state known to be stored.
    #[must_use]
    pub fn committed(&self) -> &TrialVenue {
        &self.committed
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.tentative.is_some()
    }

    /// Apply `updates` on top of the current state as a tentative change.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] if the update cannot be applied; the state is
    /// left as it was.
    pub fn apply(&mut self, updates: &UpdateMap) -> Result<(), ApplyError> {
        let mut next = self.current().clone();
        next.apply(updates)?;
        self.tentative = Some(next);
        Ok(())
    }

    /// Promote the tentative state to committed.
    pub fn confirm(&mut self) {
        if let Some(tentative) = self.tentative.take() {
            self.committed = tentative;
        }
    }

    /// Replace both states with the authoritative view from the store.
    pub fn commit(&mut self, authoritative: TrialVenue) {
        self.committed = authoritative;
        self.tentative = None;
    }

    /// Drop the tentative state, returning it.
    pub fn revert(&mut self) -> Option<TrialVenue> {
        self.tentative.take()
    }

    #[must_use]
    pub fn into_inner(self) -> TrialVenue {
        self.committed
    }
}
