pub mod signature;
pub mod stripe;
pub mod webhook;

pub use signature::{sign_payload, verify_stripe_signature, SignatureError};
pub use stripe::{PaymentIntent, PaymentMetadata, StripeClient};
pub use webhook::{WebhookError, WebhookHandler};
