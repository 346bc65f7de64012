//! Slot overlap rule for a single space and date.
//!
//! MORNING and AFTERNOON are disjoint halves of the day and FULL_DAY spans both,
//! so two slots conflict iff they are equal or either is FULL_DAY. The
//! `reservations_no_overlap` exclusion constraint encodes the same relation in
//! the database.

use super::repo_types::TimeSlot;

impl TimeSlot {
    pub fn overlaps(self, other: TimeSlot) -> bool {
        self == other || self == TimeSlot::FullDay || other == TimeSlot::FullDay
    }
}

/// `true` when `candidate` overlaps none of `booked`.
///
/// `booked` must already be restricted to ACTIVE reservations of the same
/// space and date.
pub fn is_available<I>(candidate: TimeSlot, booked: I) -> bool
where
    I: IntoIterator<Item = TimeSlot>,
{
    !booked.into_iter().any(|existing| candidate.overlaps(existing))
}
