//! Payment providers: simulated gateways and Stripe.
pub mod simulator;
pub mod stripe;

pub use simulator::{charge, ChargeError, ChargeRequest, Gateway, Receipt};
pub use stripe::{PaymentIntent, StripeClient};
