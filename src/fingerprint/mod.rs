//! TLS ClientHello fingerprint configuration.

pub mod profiles;
pub mod tls;

pub use profiles::ClientHelloId;
pub use tls::TlsFingerprint;
