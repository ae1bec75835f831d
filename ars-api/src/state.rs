use std::sync::Arc;

use ars_booking::{FlightSearchService, PaymentService, ReservationService, Stores};
use ars_catalog::{PricingConfig, PricingEngine};
use ars_core::OutboxNotifier;
use ars_store::{BusinessRules, RedisClient};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub reservations: Arc<ReservationService>,
    pub payments: Arc<PaymentService>,
    pub search: Arc<FlightSearchService>,
    pub outbox: Arc<OutboxNotifier>,
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

impl AppState {
    /// Wire the booking services over one set of stores.
    pub fn new(
        stores: Stores,
        business_rules: BusinessRules,
        auth: AuthConfig,
        public_url: &str,
        redis: Option<Arc<RedisClient>>,
    ) -> Self {
        let outbox = Arc::new(OutboxNotifier::new());
        let pricing = Arc::new(PricingEngine::new(PricingConfig {
            first_class_multiplier: business_rules.first_class_multiplier,
        }));

        let reservations = Arc::new(
            ReservationService::new(stores.clone(), outbox.clone(), pricing.clone())
                .with_hold_minutes(business_rules.hold_minutes),
        );
        let callback_url = format!("{}/v1/payments/gateway/callback", public_url.trim_end_matches('/'));
        let payments = Arc::new(PaymentService::new(stores.clone(), reservations.clone(), callback_url));
        let search = Arc::new(FlightSearchService::new(stores.clone(), pricing));

        Self {
            stores,
            reservations,
            payments,
            search,
            outbox,
            redis,
            auth,
            business_rules,
        }
    }
}
