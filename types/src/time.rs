//! Timestamps attached to transaction records.
//!
//! Unix epoch seconds (UTC). A mempool transaction carries its receipt time
//! until a block confirms it, after which the crawler overwrites it with the
//! block time. Mempool eviction compares record times against a cutoff
//! derived with [`Timestamp::rewound_by`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// The current system time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp moved `secs` into the past, saturating at the epoch.
    /// The mempool eviction cutoff is `now().rewound_by(expiry_secs)`:
    /// records strictly older than it are stale.
    pub fn rewound_by(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewound_cutoff_classifies_records() {
        let now = Timestamp::new(10_000);
        let cutoff = now.rewound_by(3_600);
        assert_eq!(cutoff, Timestamp::new(6_400));
        assert!(Timestamp::new(6_399) < cutoff);
        assert!(Timestamp::new(6_400) >= cutoff);
    }

    #[test]
    fn rewound_saturates_at_epoch() {
        assert_eq!(Timestamp::new(100).rewound_by(500), Timestamp::new(0));
    }
}
