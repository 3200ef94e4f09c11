//! User-Agent templates per browser family.

use chrono::{Days, NaiveDate};
use rand::Rng;

/// OS/platform tokens placed inside the leading parenthesis.
pub const PLATFORMS: &[&str] = &[
    "Windows NT 6.1; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "iPhone; CPU iPhone OS 13_5_1 like Mac OS X",
    "X11; Linux x86_64",
    "Windows Phone OS 7.5",
];

/// Gecko build dates are drawn from `[2010-01-01, 2021-01-01)`.
const GECKO_EPOCH: (i32, u32, u32) = (2010, 1, 1);
const GECKO_WINDOW_DAYS: u64 = 4018;
const GECKO_DATE_FORMAT: &str = "%Y%m%d";

/// Browser families a User-Agent can be rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserFamily {
    /// `Mozilla/5.0 (platform; rv:[40-50).0) Gecko/YYYYMMDD Firefox/[40-50).[0-100)`
    Firefox,
    /// `... AppleWebKit/537.36 (KHTML, like Gecko) Chrome/[40-55).0.[1000-3000).[0-200) Safari/[500-550).[0-100)`
    Chrome,
    /// Chrome template followed by `OPR/[30-40).0.[1000-3000).[0-100)`
    Opera,
    /// `... AppleWebKit/[400-550).1.[0-20) (KHTML, like Gecko) Version/13.1.1 Mobile/15E148 Safari/[400-550).1`
    Safari,
}

impl BrowserFamily {
    /// Every family, in selection order.
    pub const ALL: [BrowserFamily; 4] = [Self::Firefox, Self::Chrome, Self::Opera, Self::Safari];

    /// Render a User-Agent for this family on `platform`, drawing version
    /// numbers from `rng`.
    pub fn render<R: Rng + ?Sized>(&self, rng: &mut R, platform: &str) -> String {
        match self {
            Self::Firefox => format!(
                "Mozilla/5.0 ({}; rv:{}.0) Gecko/{} Firefox/{}.{}",
                platform,
                rng.random_range(40..50),
                random_gecko_date(rng),
                rng.random_range(40..50),
                rng.random_range(0..100),
            ),
            Self::Chrome => format!(
                "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) {}",
                platform,
                chrome_tail(rng),
            ),
            Self::Opera => {
                let tail = chrome_tail(rng);
                format!(
                    "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) {} OPR/{}.0.{}.{}",
                    platform,
                    tail,
                    rng.random_range(30..40),
                    rng.random_range(1000..3000),
                    rng.random_range(0..100),
                )
            }
            Self::Safari => format!(
                "Mozilla/5.0 ({}) AppleWebKit/{}.1.{} (KHTML, like Gecko) Version/13.1.1 Mobile/15E148 Safari/{}.1",
                platform,
                rng.random_range(400..550),
                rng.random_range(0..20),
                rng.random_range(400..550),
            ),
        }
    }

    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Firefox => "firefox",
            Self::Chrome => "chrome",
            Self::Opera => "opera",
            Self::Safari => "safari",
        }
    }
}

fn chrome_tail<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "Chrome/{}.0.{}.{} Safari/{}.{}",
        rng.random_range(40..55),
        rng.random_range(1000..3000),
        rng.random_range(0..200),
        rng.random_range(500..550),
        rng.random_range(0..100),
    )
}

/// Uniform calendar date inside the Gecko window, formatted `YYYYMMDD`.
pub(crate) fn random_gecko_date<R: Rng + ?Sized>(rng: &mut R) -> String {
    let offset = rng.random_range(0..GECKO_WINDOW_DAYS);
    let (y, m, d) = GECKO_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|epoch| epoch.checked_add_days(Days::new(offset)))
        .map(|date| date.format(GECKO_DATE_FORMAT).to_string())
        .unwrap_or_else(|| format!("{:04}{:02}{:02}", y, m, d))
}
