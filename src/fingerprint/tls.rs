//! Resolved TLS ClientHello parameters.

/// TLS 1.2 cipher suites in Chrome order.
///
/// TLS 1.3 suites are fixed by BoringSSL and always offered first.
pub const CHROME_CIPHER_SUITES: &[&str] = &[
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
    "TLS_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_RSA_WITH_AES_128_CBC_SHA",
    "TLS_RSA_WITH_AES_256_CBC_SHA",
];

/// TLS 1.2 cipher suites in Firefox order.
pub const FIREFOX_CIPHER_SUITES: &[&str] = &[
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
    "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
    "TLS_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_RSA_WITH_AES_128_CBC_SHA",
    "TLS_RSA_WITH_AES_256_CBC_SHA",
];

/// Signature algorithms offered by both browsers.
pub const SIGNATURE_ALGORITHMS: &[&str] = &[
    "ecdsa_secp256r1_sha256",
    "rsa_pss_rsae_sha256",
    "rsa_pkcs1_sha256",
    "ecdsa_secp384r1_sha384",
    "rsa_pss_rsae_sha384",
    "rsa_pkcs1_sha384",
    "rsa_pss_rsae_sha512",
    "rsa_pkcs1_sha512",
];

/// Chrome supported groups.
pub const CHROME_CURVES: &[&str] = &["X25519", "P-256", "P-384"];

/// Firefox supported groups.
pub const FIREFOX_CURVES: &[&str] = &["X25519", "P-256", "P-384", "P-521"];

/// ALPN wire list advertising HTTP/2 then HTTP/1.1.
pub const ALPN_H2_HTTP1: &[u8] = b"\x02h2\x08http/1.1";

/// TLS fingerprint configuration applied to one handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFingerprint {
    /// TLS 1.2 cipher suites in order. Empty means library default.
    pub cipher_list: Vec<&'static str>,
    /// Signature algorithms. Empty means library default.
    pub sigalgs: Vec<&'static str>,
    /// Supported curves/groups. Empty means library default.
    pub curves: Vec<&'static str>,
    /// Send GREASE values.
    pub grease: bool,
    /// Shuffle extension order per connection.
    pub permute_extensions: bool,
    /// ALPN wire list; `None` omits the extension entirely.
    pub alpn: Option<&'static [u8]>,
}

impl Default for TlsFingerprint {
    fn default() -> Self {
        Self {
            cipher_list: vec![],
            sigalgs: vec![],
            curves: vec![],
            grease: false,
            permute_extensions: false,
            alpn: Some(ALPN_H2_HTTP1),
        }
    }
}

impl TlsFingerprint {
    /// Chrome-like ClientHello.
    pub fn chrome() -> Self {
        Self {
            cipher_list: CHROME_CIPHER_SUITES.to_vec(),
            sigalgs: SIGNATURE_ALGORITHMS.to_vec(),
            curves: CHROME_CURVES.to_vec(),
            grease: true,
            permute_extensions: true,
            alpn: Some(ALPN_H2_HTTP1),
        }
    }

    /// Firefox-like ClientHello: extension permutation without GREASE.
    pub fn firefox() -> Self {
        Self {
            cipher_list: FIREFOX_CIPHER_SUITES.to_vec(),
            sigalgs: SIGNATURE_ALGORITHMS.to_vec(),
            curves: FIREFOX_CURVES.to_vec(),
            grease: false,
            permute_extensions: true,
            alpn: Some(ALPN_H2_HTTP1),
        }
    }

    /// Whether the ClientHello carries an ALPN extension.
    pub fn advertises_alpn(&self) -> bool {
        self.alpn.is_some()
    }
}
