//! The BIP 70 payment-protocol messages, hand-annotated for `prost` rather
//! than generated from a `.proto` file (there's nothing else in this wallet
//! that needs a protobuf build step).

/// An output a merchant wants to be paid on: an amount and a locking
/// script. `amount` defaults to 0 when absent, matching the BIP 70 wire
/// default for donation-style requests.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Output {
    #[prost(uint64, optional, tag = "1")]
    pub amount: Option<u64>,
    #[prost(bytes, required, tag = "2")]
    pub script: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PaymentDetails {
    #[prost(string, optional, tag = "1")]
    pub network: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub outputs: Vec<Output>,
    #[prost(uint64, required, tag = "3")]
    pub time: u64,
    #[prost(uint64, optional, tag = "4")]
    pub expires: Option<u64>,
    #[prost(string, optional, tag = "5")]
    pub memo: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub payment_url: Option<String>,
    #[prost(bytes, optional, tag = "7")]
    pub merchant_data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PaymentRequest {
    #[prost(uint32, optional, tag = "1")]
    pub payment_details_version: Option<u32>,
    #[prost(string, optional, tag = "2")]
    pub pki_type: Option<String>,
    #[prost(bytes, optional, tag = "3")]
    pub pki_data: Option<Vec<u8>>,
    #[prost(bytes, required, tag = "4")]
    pub serialized_payment_details: Vec<u8>,
    #[prost(bytes, optional, tag = "5")]
    pub signature: Option<Vec<u8>>,
}

/// A chain of DER-encoded X.509 certificates, leaf first, as carried in a
/// `PaymentRequest`'s `pki_data` when `pki_type` is `x509+sha256` or
/// `x509+sha1`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct X509Certificates {
    #[prost(bytes, repeated, tag = "1")]
    pub certificate: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payment {
    #[prost(bytes, optional, tag = "1")]
    pub merchant_data: Option<Vec<u8>>,
    #[prost(bytes, repeated, tag = "2")]
    pub transactions: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "3")]
    pub refund_to: Vec<Output>,
    #[prost(string, optional, tag = "4")]
    pub memo: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PaymentAck {
    #[prost(message, required, tag = "1")]
    pub payment: Payment,
    #[prost(string, optional, tag = "2")]
    pub memo: Option<String>,
}
