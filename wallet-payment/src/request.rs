//! Fetches a BIP 70 payment request, validates it, and carries a built
//! transaction through to the merchant's acknowledgement.

use chrono::{DateTime, Utc};
use prost::Message;
use tracing::debug;

use wallet_chain::transaction::Transaction;
use wallet_chain::BitcoinSerialize;
use wallet_chain::WalletError;

use crate::certificate::{self, DigestAlgorithm, MerchantIdentity};
use crate::protocol::{Payment, PaymentAck, PaymentDetails, PaymentRequest};

const PAYMENT_REQUEST_ACCEPT: &str = "application/bitcoin-paymentrequest";
const PAYMENT_CONTENT_TYPE: &str = "application/bitcoin-payment";
const PAYMENT_ACK_ACCEPT: &str = "application/bitcoin-paymentack";

/// A payment request that has passed expiry and (when present) certificate
/// signature validation.
pub struct ValidatedPaymentRequest {
    pub details: PaymentDetails,
    pub merchant: Option<MerchantIdentity>,
}

/// Fetches the payment request at `url` and validates it against `now`.
pub fn fetch_payment_request(url: &str, now: DateTime<Utc>) -> Result<ValidatedPaymentRequest, WalletError> {
    debug!(%url, "fetching payment request");
    let client = reqwest::blocking::Client::new();
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, PAYMENT_REQUEST_ACCEPT)
        .send()
        .map_err(|e| WalletError::Network(e.to_string()))?;

    let body = response.bytes().map_err(|e| WalletError::Network(e.to_string()))?;
    let request =
        PaymentRequest::decode(&body[..]).map_err(|_| WalletError::Payment("malformed PaymentRequest".to_string()))?;

    validate(request, now)
}

/// Checks expiry and, when the request is signed, the certificate chain's
/// signature over the request with `signature` blanked.
fn validate(request: PaymentRequest, now: DateTime<Utc>) -> Result<ValidatedPaymentRequest, WalletError> {
    let details = PaymentDetails::decode(&request.serialized_payment_details[..])
        .map_err(|_| WalletError::Payment("malformed PaymentDetails".to_string()))?;

    if let Some(expires) = details.expires {
        if (expires as i64) < now.timestamp() {
            return Err(WalletError::Payment("payment request has expired".to_string()));
        }
    }

    let pki_type = request.pki_type.as_deref().unwrap_or("none");
    let merchant = if pki_type == "none" {
        None
    } else {
        let pki_data = request
            .pki_data
            .as_deref()
            .ok_or_else(|| WalletError::Payment("pki_type set without pki_data".to_string()))?;
        let signature = request
            .signature
            .as_deref()
            .ok_or_else(|| WalletError::Payment("pki_type set without signature".to_string()))?;
        let algorithm = DigestAlgorithm::from_pki_type(pki_type)?;

        let mut unsigned = request.clone();
        unsigned.signature = None;
        let signed_bytes = unsigned.encode_to_vec();

        Some(certificate::verify(pki_data, &signed_bytes, signature, &algorithm)?)
    };

    Ok(ValidatedPaymentRequest { details, merchant })
}

/// The merchant's acknowledgement of a submitted payment.
pub struct PaymentOutcome {
    pub memo: Option<String>,
}

/// POSTs `transaction` to the merchant's `payment_url` and waits for the
/// `PaymentACK`. The caller must not broadcast `transaction` to the peer
/// network until this returns successfully.
pub fn send_payment(
    request: &ValidatedPaymentRequest,
    transaction: &Transaction,
    memo: Option<String>,
) -> Result<PaymentOutcome, WalletError> {
    let payment_url = request
        .details
        .payment_url
        .as_ref()
        .ok_or_else(|| WalletError::Payment("payment request has no payment_url".to_string()))?;

    debug!(%payment_url, tx_hash = %transaction.hash(), "submitting payment");

    let raw_tx = transaction
        .bitcoin_serialize_to_vec()
        .expect("serializing to a Vec<u8> is infallible");

    let payment = Payment {
        merchant_data: request.details.merchant_data.clone(),
        transactions: vec![raw_tx],
        refund_to: vec![],
        memo,
    };

    let client = reqwest::blocking::Client::new();
    let response = client
        .post(payment_url.as_str())
        .header(reqwest::header::CONTENT_TYPE, PAYMENT_CONTENT_TYPE)
        .header(reqwest::header::ACCEPT, PAYMENT_ACK_ACCEPT)
        .body(payment.encode_to_vec())
        .send()
        .map_err(|e| WalletError::Network(e.to_string()))?;

    let ack_bytes = response.bytes().map_err(|e| WalletError::Network(e.to_string()))?;
    let ack = PaymentAck::decode(&ack_bytes[..]).map_err(|_| WalletError::Payment("malformed PaymentACK".to_string()))?;

    Ok(PaymentOutcome { memo: ack.memo })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn unsigned_request(time: u64, expires: Option<u64>) -> PaymentRequest {
        let details = PaymentDetails {
            network: Some("main".to_string()),
            outputs: vec![],
            time,
            expires,
            memo: None,
            payment_url: Some("https://merchant.example/pay".to_string()),
            merchant_data: None,
        };
        PaymentRequest {
            payment_details_version: Some(1),
            pki_type: Some("none".to_string()),
            pki_data: None,
            serialized_payment_details: details.encode_to_vec(),
            signature: None,
        }
    }

    #[test]
    fn unsigned_unexpired_request_validates_with_no_merchant() {
        let now = Utc.timestamp(1_700_000_000, 0);
        let request = unsigned_request(1_699_999_000, Some(1_700_001_000));

        let validated = validate(request, now).unwrap();
        assert!(validated.merchant.is_none());
        assert_eq!(validated.details.payment_url.as_deref(), Some("https://merchant.example/pay"));
    }

    #[test]
    fn expired_request_is_rejected() {
        let now = Utc.timestamp(1_700_000_000, 0);
        let request = unsigned_request(1_699_999_000, Some(1_699_999_500));

        assert!(matches!(validate(request, now), Err(WalletError::Payment(_))));
    }

    #[test]
    fn missing_pki_data_is_rejected() {
        let now = Utc.timestamp(1_700_000_000, 0);
        let mut request = unsigned_request(1_699_999_000, None);
        request.pki_type = Some("x509+sha256".to_string());

        assert!(matches!(validate(request, now), Err(WalletError::Payment(_))));
    }
}
