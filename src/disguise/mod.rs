//! Decoy request headers that make traffic resemble organic browser traffic.
//!
//! All randomness flows through one seeded generator so a fixed seed yields
//! the same sequence of profiles in every process.

mod user_agent;

pub use user_agent::{BrowserFamily, PLATFORMS};

use http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, CACHE_CONTROL,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Header carrying the decoy client address.
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Accept-Language values seen from real browsers.
pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9,en-US;q=0.8",
    "de-DE,de;q=0.9,en-US;q=0.8,en;q=0.7",
    "fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7",
    "es-ES,es;q=0.9,en;q=0.8",
    "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7",
    "nl-NL,nl;q=0.9,en-US;q=0.8,en;q=0.7",
    "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7",
    "en-US,en;q=0.8,de;q=0.6",
    "en-CA,en;q=0.9,fr-CA;q=0.8",
];

/// One set of decoy header values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisguiseProfile {
    pub forwarded_for: String,
    pub user_agent: String,
    pub accept_language: String,
}

/// Seeded generator of decoy header values, safe to share across workers.
#[derive(Debug)]
pub struct Disguiser {
    rng: Mutex<ChaCha8Rng>,
    family: Option<BrowserFamily>,
}

impl Disguiser {
    /// Generator seeded from the system clock.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_seed(seed)
    }

    /// Generator with a fixed seed; output is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            family: None,
        }
    }

    /// Generator that always renders User-Agents for `family`.
    pub fn pinned(seed: u64, family: BrowserFamily) -> Self {
        Self {
            family: Some(family),
            ..Self::with_seed(seed)
        }
    }

    fn rng(&self) -> MutexGuard<'_, ChaCha8Rng> {
        // A panic while drawing cannot leave the RNG in a torn state.
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Random IPv4-style or IPv6-style address string.
    pub fn random_ip(&self) -> String {
        random_ip(&mut *self.rng())
    }

    /// Random User-Agent (random family unless pinned).
    pub fn random_user_agent(&self) -> String {
        random_user_agent(&mut *self.rng(), self.family)
    }

    /// User-Agent for a specific family on a random platform.
    pub fn user_agent_for(&self, family: BrowserFamily) -> String {
        random_user_agent(&mut *self.rng(), Some(family))
    }

    /// Random Accept-Language value.
    pub fn random_accept_language(&self) -> String {
        random_accept_language(&mut *self.rng())
    }

    /// Draw a complete profile under a single lock.
    pub fn profile(&self) -> DisguiseProfile {
        let mut rng = self.rng();
        DisguiseProfile {
            forwarded_for: random_ip(&mut *rng),
            user_agent: random_user_agent(&mut *rng, self.family),
            accept_language: random_accept_language(&mut *rng),
        }
    }

    /// Set decoy headers on `headers`, replacing only the headers it owns.
    pub fn disguise(&self, headers: &mut HeaderMap) {
        let profile = self.profile();

        // Generated values are plain ASCII; a failed conversion just leaves
        // that header as it was.
        if let Ok(v) = HeaderValue::from_str(&profile.forwarded_for) {
            headers.insert(X_FORWARDED_FOR, v);
        }
        if let Ok(v) = HeaderValue::from_str(&profile.user_agent) {
            headers.insert(USER_AGENT, v);
        }
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        if let Ok(v) = HeaderValue::from_str(&profile.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, v);
        }

        tracing::trace!(
            forwarded_for = %profile.forwarded_for,
            user_agent = %profile.user_agent,
            family = self.family.map_or("any", |f| f.as_str()),
            "Disguised request"
        );
    }
}

impl Default for Disguiser {
    fn default() -> Self {
        Self::new()
    }
}

fn random_ip<R: Rng + ?Sized>(rng: &mut R) -> String {
    if rng.random_bool(0.5) {
        let groups: Vec<String> = (0..8)
            .map(|_| format!("{:x}", rng.random_range(1..=65535u32)))
            .collect();
        return groups.join(":");
    }

    format!(
        "{}.{}.{}.{}",
        rng.random_range(1..=255u8),
        rng.random_range(1..=255u8),
        rng.random_range(1..=255u8),
        rng.random_range(1..=255u8),
    )
}

fn random_user_agent<R: Rng + ?Sized>(rng: &mut R, family: Option<BrowserFamily>) -> String {
    let platform = PLATFORMS.choose(rng).copied().unwrap_or(PLATFORMS[0]);
    let family = match family {
        Some(f) => f,
        None => *BrowserFamily::ALL.choose(rng).unwrap_or(&BrowserFamily::Chrome),
    };
    family.render(rng, platform)
}

fn random_accept_language<R: Rng + ?Sized>(rng: &mut R) -> String {
    ACCEPT_LANGUAGES
        .choose(rng)
        .copied()
        .unwrap_or(ACCEPT_LANGUAGES[0])
        .to_string()
}
