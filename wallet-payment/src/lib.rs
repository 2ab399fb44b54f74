//! BIP 21 payment URIs and the BIP 70 payment-request fetch/validate/
//! acknowledge flow.

pub mod certificate;
pub mod protocol;
pub mod request;
pub mod uri;

pub use request::{fetch_payment_request, send_payment, PaymentOutcome, ValidatedPaymentRequest};
pub use uri::{parse as parse_uri, PaymentUri};
