// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Classification of cached entries by age.
//!
//! A pure function of an entry's timestamps and the resolved configuration.
//! The refresh bound is consulted before the hard expiry bounds, so a value
//! past its refresh age is reported as refreshable rather than dropped. A
//! refresh interval larger than an expiry bound makes the refresh
//! unreachable; that configuration is the caller's responsibility.

use std::time::Instant;

use crate::builder::Config;

/// How usable a cached entry is at a given point in time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Freshness {
    /// Within every configured bound; serve as-is.
    Fresh,
    /// Past the refresh-after-write bound; still returnable, but a reload
    /// should be arranged.
    Stale,
    /// Past an expiry bound; must not be returned.
    Expired,
}

/// Classifies an entry from its timestamps. Disabled bounds are `None`.
pub(crate) fn classify(last_access: Instant, last_write: Instant, config: &Config, now: Instant) -> Freshness {
    let access_age = now.saturating_duration_since(last_access);
    let write_age = now.saturating_duration_since(last_write);

    if let Some(refresh) = config.refresh_after_write {
        if write_age > refresh {
            return Freshness::Stale;
        }
    }

    let access_expired = config.expire_after_access.is_some_and(|bound| access_age >= bound);
    let write_expired = config.expire_after_write.is_some_and(|bound| write_age >= bound);
    if access_expired || write_expired {
        return Freshness::Expired;
    }

    Freshness::Fresh
}
