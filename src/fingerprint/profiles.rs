//! ClientHello profiles.

use rand::seq::SliceRandom;
use rand::Rng;

use super::tls::{
    TlsFingerprint, ALPN_H2_HTTP1, CHROME_CIPHER_SUITES, CHROME_CURVES, SIGNATURE_ALGORITHMS,
};

/// Fewest TLS 1.2 suites a randomized hello keeps.
const MIN_RANDOM_SUITES: usize = 6;

/// ClientHello shape used for new handshakes.
///
/// The randomized profiles draw a fresh shape for every connection, so two
/// connections from one client rarely share a JA3 hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientHelloId {
    /// Randomized suites, groups and extension order without an ALPN
    /// extension. Servers answer with HTTP/1.1; this is the shape that
    /// behaves most consistently against inspection.
    #[default]
    RandomizedNoAlpn,
    /// Randomized like [`ClientHelloId::RandomizedNoAlpn`] but offering
    /// `h2` and `http/1.1`.
    Randomized,
    /// Chrome-like hello with GREASE.
    Chrome,
    /// Firefox-like hello.
    Firefox,
    /// BoringSSL defaults with ALPN.
    Plain,
}

impl ClientHelloId {
    /// Resolve this profile into concrete handshake parameters.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> TlsFingerprint {
        match self {
            Self::RandomizedNoAlpn => TlsFingerprint {
                alpn: None,
                ..randomized(rng)
            },
            Self::Randomized => randomized(rng),
            Self::Chrome => TlsFingerprint::chrome(),
            Self::Firefox => TlsFingerprint::firefox(),
            Self::Plain => TlsFingerprint::default(),
        }
    }

    /// Whether each resolution differs.
    pub fn is_randomized(&self) -> bool {
        matches!(self, Self::RandomizedNoAlpn | Self::Randomized)
    }

    /// Name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RandomizedNoAlpn => "randomized-no-alpn",
            Self::Randomized => "randomized",
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Plain => "plain",
        }
    }
}

fn randomized<R: Rng + ?Sized>(rng: &mut R) -> TlsFingerprint {
    let mut suites = CHROME_CIPHER_SUITES.to_vec();
    suites.shuffle(rng);
    let keep = rng.random_range(MIN_RANDOM_SUITES..=suites.len());
    suites.truncate(keep);

    let mut curves = CHROME_CURVES.to_vec();
    curves.shuffle(rng);
    let keep = rng.random_range(2..=curves.len());
    curves.truncate(keep);

    TlsFingerprint {
        cipher_list: suites,
        sigalgs: SIGNATURE_ALGORITHMS.to_vec(),
        curves,
        grease: rng.random_bool(0.5),
        permute_extensions: true,
        alpn: Some(ALPN_H2_HTTP1),
    }
}
