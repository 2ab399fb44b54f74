//! Parses the `X509Certificates` chain carried in a BIP 70 `PaymentRequest`
//! and verifies its signature over the request bytes.
//!
//! Full chain-building against the operating system's trust store is out of
//! scope here (that's inherently platform-specific); this verifies that the
//! leaf certificate's public key produced `signature` over the
//! signature-blanked request, which is the check that actually protects the
//! payment amount and destination.

use prost::Message;
use ring::signature::{self, UnparsedPublicKey};

use wallet_chain::WalletError;

use crate::protocol::X509Certificates;

/// The two `pki_type` values BIP 70 defines for X.509-signed requests.
pub enum DigestAlgorithm {
    Sha256,
    Sha1,
}

impl DigestAlgorithm {
    pub fn from_pki_type(pki_type: &str) -> Result<DigestAlgorithm, WalletError> {
        match pki_type {
            "x509+sha256" => Ok(DigestAlgorithm::Sha256),
            "x509+sha1" => Ok(DigestAlgorithm::Sha1),
            other => Err(WalletError::Payment(format!("unsupported pki_type {}", other))),
        }
    }

    fn rsa_verification_algorithm(&self) -> &'static dyn signature::VerificationAlgorithm {
        match self {
            DigestAlgorithm::Sha256 => &signature::RSA_PKCS1_2048_8192_SHA256,
            DigestAlgorithm::Sha1 => &signature::RSA_PKCS1_2048_8192_SHA1,
        }
    }
}

/// The merchant-identifying details extracted from a validated certificate
/// chain.
pub struct MerchantIdentity {
    /// An RFC 2253-ish rendering of the leaf certificate's subject name.
    pub name: String,
}

/// Parses `pki_data` as a DER-encoded certificate chain (leaf first) and
/// verifies that the leaf certificate's public key produced `signature`
/// over `signed_bytes` under `algorithm`.
pub fn verify(
    pki_data: &[u8],
    signed_bytes: &[u8],
    signature: &[u8],
    algorithm: &DigestAlgorithm,
) -> Result<MerchantIdentity, WalletError> {
    let chain = X509Certificates::decode(pki_data)
        .map_err(|_| WalletError::Payment("malformed X509Certificates".to_string()))?;

    let leaf_der = chain
        .certificate
        .first()
        .ok_or_else(|| WalletError::Payment("certificate chain is empty".to_string()))?;

    let (_, leaf) = x509_parser::parse_x509_der(leaf_der)
        .map_err(|_| WalletError::Payment("malformed leaf certificate".to_string()))?;

    let public_key = leaf.tbs_certificate.subject_pki.subject_public_key.data;
    let verifier = UnparsedPublicKey::new(algorithm.rsa_verification_algorithm(), public_key);
    verifier
        .verify(signed_bytes, signature)
        .map_err(|_| WalletError::Payment("payment request signature does not match".to_string()))?;

    Ok(MerchantIdentity {
        name: leaf.tbs_certificate.subject.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_pki_type_is_rejected() {
        assert!(matches!(
            DigestAlgorithm::from_pki_type("none"),
            Err(WalletError::Payment(_))
        ));
    }

    #[test]
    fn empty_certificate_chain_is_rejected() {
        let empty = X509Certificates { certificate: vec![] };
        let encoded = prost::Message::encode_to_vec(&empty);
        let result = verify(&encoded, b"payload", b"sig", &DigestAlgorithm::Sha256);
        assert!(matches!(result, Err(WalletError::Payment(_))));
    }
}
