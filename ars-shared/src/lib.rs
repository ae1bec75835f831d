pub mod pii;
pub mod money;

pub use money::{format_cents, percentage, round_cents};
pub use pii::Masked;
