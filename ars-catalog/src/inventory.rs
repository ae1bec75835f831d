use std::collections::HashSet;

use ars_core::{CoreError, CoreResult, FareClass, Seat};
use serde::Serialize;
use uuid::Uuid;

/// Coarse availability of one flight on one date.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CapacitySnapshot {
    pub capacity: i32,
    pub taken: i32,
}

impl CapacitySnapshot {
    pub fn new(capacity: i32, taken: i32) -> Self {
        Self { capacity, taken }
    }

    /// Seats left, never below zero.
    pub fn available(&self) -> i32 {
        (self.capacity - self.taken).max(0)
    }

    pub fn can_fit(&self, requested: i32) -> bool {
        self.available() >= requested
    }

    /// Reserve `requested` seats or explain why not.
    pub fn check(&self, requested: i32) -> CoreResult<()> {
        if self.can_fit(requested) {
            Ok(())
        } else {
            Err(CoreError::CapacityExceeded {
                capacity: self.capacity,
                taken: self.taken,
                requested,
            })
        }
    }
}

/// Shorthand for a one-off capacity check.
pub fn check_capacity(capacity: i32, taken: i32, requested: i32) -> CoreResult<()> {
    CapacitySnapshot::new(capacity, taken).check(requested)
}

/// First free seat in the same cabin, scanning row by row then column.
pub fn pick_reselect_seat<'a>(
    seats: &'a [Seat],
    cabin: FareClass,
    taken: &HashSet<Uuid>,
    exclude: Uuid,
) -> Option<&'a Seat> {
    let mut candidates: Vec<&Seat> = seats
        .iter()
        .filter(|s| s.cabin_class == cabin && s.id != exclude && !taken.contains(&s.id))
        .collect();
    candidates.sort_by(|a, b| {
        a.row_number
            .cmp(&b.row_number)
            .then_with(|| a.column.cmp(&b.column))
    });
    candidates.into_iter().next()
}
