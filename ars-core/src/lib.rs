pub mod flight;
pub mod reservation;
pub mod payment;
pub mod search;
pub mod repository;
pub mod notification;

pub use flight::{FareClass, Flight, Schedule, ScheduleStatus, Seat, SeatLayout, User};
pub use reservation::{PassengerCounts, Reservation, ReservationStatus};
pub use payment::{Payment, PaymentStatus, Refund};
pub use notification::{LogNotifier, Notification, NotificationSender, OutboxNotifier};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFoundError(String),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not enough seats. capacity={capacity}, taken={taken}, need={requested}")]
    CapacityExceeded {
        capacity: i32,
        taken: i32,
        requested: i32,
    },
    #[error("Seat unavailable: {0}")]
    SeatUnavailable(String),
    #[error("Cannot {action} a reservation in status {from}")]
    InvalidStateError {
        from: String,
        action: String,
    },
    #[error("Conflict: {0}")]
    ConflictError(String),
    #[error("Datastore unavailable: {0}")]
    TransientError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl CoreError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFoundError(format!("{} {}", what, id))
    }

    /// Short machine-readable tag, surfaced as `kind` in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotFoundError(_) => "NOT_FOUND",
            CoreError::ValidationError(_) => "VALIDATION",
            CoreError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            CoreError::SeatUnavailable(_) => "SEAT_UNAVAILABLE",
            CoreError::InvalidStateError { .. } => "INVALID_STATE",
            CoreError::ConflictError(_) => "CONFLICT",
            CoreError::TransientError(_) => "TRANSIENT",
            CoreError::InternalError(_) => "INTERNAL",
        }
    }

    /// Validation-family failures are recovered locally and reported back to the caller.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::ValidationError(_)
                | CoreError::CapacityExceeded { .. }
                | CoreError::SeatUnavailable(_)
                | CoreError::InvalidStateError { .. }
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
