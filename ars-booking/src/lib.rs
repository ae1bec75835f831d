pub mod lifecycle;
pub mod numbers;
pub mod reschedule;
pub mod service;
pub mod payments;
pub mod search;

use std::sync::Arc;

use ars_core::repository::{FlightRepository, PaymentRepository, ReservationRepository, UserRepository};

pub use lifecycle::Transition;
pub use payments::{GatewayResult, GatewaySession, PaymentOutcome, PaymentRequest, PaymentService};
pub use reschedule::{reconcile, Reconciliation};
pub use search::{FlightSearchService, PriceRequest};
pub use service::{
    BookingReceipt, CreateReservationRequest, RescheduleOutcome, RescheduleRequest, ReservationService,
};

/// Repository handles shared by the booking services.
#[derive(Clone)]
pub struct Stores {
    pub flights: Arc<dyn FlightRepository>,
    pub users: Arc<dyn UserRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub payments: Arc<dyn PaymentRepository>,
}

impl Stores {
    /// All four handles backed by one store.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: FlightRepository + UserRepository + ReservationRepository + PaymentRepository + 'static,
    {
        Self {
            flights: store.clone(),
            users: store.clone(),
            reservations: store.clone(),
            payments: store,
        }
    }
}
