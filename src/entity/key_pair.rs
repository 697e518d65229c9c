//! Client certificates issued by a provider

use chrono::{DateTime, Utc};

use super::instance::Instance;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3600;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// PEM encoded certificate and matching private key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub certificate: String,
    pub private_key: String,
    /// Certificate expiry as epoch milliseconds, if known
    pub expiry_time_millis: Option<i64>,
}

impl KeyPair {
    pub fn new(certificate: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            certificate: certificate.into(),
            private_key: private_key.into(),
            expiry_time_millis: None,
        }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_time_millis = Some(expiry.timestamp_millis());
        self
    }

    /// Remaining certificate lifetime at `now`, `None` when expiry is unknown
    pub fn validity_at(&self, now: DateTime<Utc>) -> Option<CertValidity> {
        let expiry = self.expiry_time_millis?;
        let remaining = expiry.saturating_sub(now.timestamp_millis()) / 1000;
        Some(CertValidity::from_seconds(remaining))
    }
}

/// Key pair issued for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedKeyPair {
    pub instance: Instance,
    pub key_pair: KeyPair,
}

impl SavedKeyPair {
    pub fn new(instance: Instance, key_pair: KeyPair) -> Self {
        Self { instance, key_pair }
    }
}

/// Remaining certificate lifetime, split into the two most significant units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertValidity {
    Expired,
    /// Less than a minute left
    Seconds(i64),
    /// Less than an hour left
    MinutesSeconds(i64, i64),
    /// Less than a day left
    HoursMinutes(i64, i64),
    /// Less than 30 days left
    DaysHours(i64, i64),
    Days(i64),
}

impl CertValidity {
    pub fn from_seconds(remaining: i64) -> Self {
        if remaining < 0 {
            CertValidity::Expired
        } else if remaining < SECONDS_PER_MINUTE {
            CertValidity::Seconds(remaining)
        } else if remaining < SECONDS_PER_HOUR {
            CertValidity::MinutesSeconds(remaining / SECONDS_PER_MINUTE, remaining % SECONDS_PER_MINUTE)
        } else if remaining < SECONDS_PER_DAY {
            CertValidity::HoursMinutes(
                remaining / SECONDS_PER_HOUR,
                (remaining % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
            )
        } else if remaining < 30 * SECONDS_PER_DAY {
            CertValidity::DaysHours(
                remaining / SECONDS_PER_DAY,
                (remaining % SECONDS_PER_DAY) / SECONDS_PER_HOUR,
            )
        } else {
            CertValidity::Days(remaining / SECONDS_PER_DAY)
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, CertValidity::Expired)
    }
}
