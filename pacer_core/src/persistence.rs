//! Checksummed persistence of milestone finish times.
//!
//! Record layout (JSON): `{"version":1,"finishTimes":[1800000,null,...],"checksum":123}`.
//! A record that fails any check is deleted and the engine starts fresh;
//! there is no partial recovery and no migration between versions.

use std::sync::Arc;
use std::time::Instant;

use pacer_traits::{BoxError, Clock, KvStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{MAX_PLAUSIBLE_CAP_MS, PersistenceCfg, RECORD_VERSION};

const CHECKSUM_MODULUS: u64 = 1_000_000_007;
const CHECKSUM_BASE: u64 = 31;
/// Hash term for a pending entry. Equals `t + 1` only for
/// `t = 999_999_998`, which is above `MAX_PLAUSIBLE_CAP_MS` and so never
/// passes `validate_record`.
const NULL_TERM: u64 = 999_999_999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub version: u32,
    pub finish_times: Vec<Option<u32>>,
    pub checksum: u32,
}

impl PersistedRecord {
    pub fn new(finish_times: Vec<Option<u32>>) -> Self {
        let checksum = checksum(RECORD_VERSION, &finish_times);
        Self {
            version: RECORD_VERSION,
            finish_times,
            checksum,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Corruption> {
        serde_json::from_slice(bytes).map_err(|_| Corruption::Malformed)
    }
}

/// Polynomial rolling hash over the finish times, seeded with the version.
pub fn checksum(version: u32, finish_times: &[Option<u32>]) -> u32 {
    let mut h = u64::from(version) % CHECKSUM_MODULUS;
    for t in finish_times {
        let term = t.map_or(NULL_TERM, |v| u64::from(v) + 1) % CHECKSUM_MODULUS;
        h = (h * CHECKSUM_BASE + term) % CHECKSUM_MODULUS;
    }
    // h < 1_000_000_007 < u32::MAX
    h as u32
}

/// Why a stored record was discarded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    #[error("record is not valid JSON of the expected shape")]
    Malformed,
    #[error("record version {found} does not match {expected}")]
    Version { found: u32, expected: u32 },
    #[error("record holds {found} entries, expected {expected}")]
    Length { found: usize, expected: usize },
    #[error("finish time at index {index} out of range")]
    OutOfRange { index: usize },
    #[error("completed entry at index {index} follows a pending one")]
    Gap { index: usize },
    #[error("finish time at index {index} is earlier than its predecessor")]
    NonMonotonic { index: usize },
    #[error("checksum mismatch")]
    Checksum,
}

/// Check every load-time invariant of a decoded record.
pub fn validate_record(
    rec: &PersistedRecord,
    expected_len: usize,
    max_plausible_ms: u32,
) -> Result<(), Corruption> {
    if rec.version != RECORD_VERSION {
        return Err(Corruption::Version {
            found: rec.version,
            expected: RECORD_VERSION,
        });
    }
    if rec.finish_times.len() != expected_len {
        return Err(Corruption::Length {
            found: rec.finish_times.len(),
            expected: expected_len,
        });
    }
    let mut seen_pending = false;
    let mut prev: Option<u32> = None;
    for (index, entry) in rec.finish_times.iter().enumerate() {
        match *entry {
            None => seen_pending = true,
            Some(t) => {
                if t > max_plausible_ms {
                    return Err(Corruption::OutOfRange { index });
                }
                if seen_pending {
                    return Err(Corruption::Gap { index });
                }
                if prev.is_some_and(|p| t < p) {
                    return Err(Corruption::NonMonotonic { index });
                }
                prev = Some(t);
            }
        }
    }
    if checksum(rec.version, &rec.finish_times) != rec.checksum {
        return Err(Corruption::Checksum);
    }
    Ok(())
}

/// Copy of `finish_times` that `validate_record` will accept for the same
/// bound: the first implausible entry and everything after it become
/// pending. Returns the number of entries blanked.
fn persistable(finish_times: &[Option<u32>], max_plausible_ms: u32) -> (Vec<Option<u32>>, usize) {
    let cap = max_plausible_ms.min(MAX_PLAUSIBLE_CAP_MS);
    let cut = finish_times
        .iter()
        .position(|t| t.is_some_and(|v| v > cap))
        .unwrap_or(finish_times.len());
    let mut times = finish_times.to_vec();
    let dropped = times[cut..].iter().filter(|t| t.is_some()).count();
    for t in &mut times[cut..] {
        *t = None;
    }
    (times, dropped)
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage io: {0}")]
    Io(BoxError),
    #[error("record discarded: {0}")]
    Corrupt(Corruption),
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Owns the store and the write throttle.
pub struct PersistenceGateway<S: KvStore> {
    store: S,
    key: String,
    min_interval_ms: u64,
    max_plausible_ms: u32,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    last_save_ms: Option<u64>,
    implausible_dropped: u64,
}

impl<S: KvStore> core::fmt::Debug for PersistenceGateway<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("key", &self.key)
            .field("min_interval_ms", &self.min_interval_ms)
            .field("last_save_ms", &self.last_save_ms)
            .finish_non_exhaustive()
    }
}

impl<S: KvStore> PersistenceGateway<S> {
    pub fn new(store: S, cfg: &PersistenceCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self {
            store,
            key: cfg.key.clone(),
            min_interval_ms: cfg.min_save_interval_ms,
            max_plausible_ms: cfg.max_plausible_time_ms,
            clock,
            epoch,
            last_save_ms: None,
            implausible_dropped: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Read and validate the stored record.
    ///
    /// `Ok(None)` means nothing was stored. A record that fails validation
    /// is deleted and reported as `PersistError::Corrupt`.
    pub fn load(&mut self, expected_len: usize) -> Result<Option<Vec<Option<u32>>>, PersistError> {
        let Some(bytes) = self.store.get(&self.key).map_err(PersistError::Io)? else {
            return Ok(None);
        };
        let checked = PersistedRecord::decode(&bytes).and_then(|rec| {
            validate_record(&rec, expected_len, self.max_plausible_ms).map(|()| rec)
        });
        match checked {
            Ok(rec) => Ok(Some(rec.finish_times)),
            Err(c) => {
                tracing::warn!(error = %c, key = %self.key, "discarding persisted record");
                if let Err(e) = self.store.delete(&self.key) {
                    tracing::warn!(error = %e, "failed to delete corrupt record");
                }
                Err(PersistError::Corrupt(c))
            }
        }
    }

    /// True when a throttled save would be allowed now.
    pub fn is_due(&self) -> bool {
        let now = self.clock.ms_since(self.epoch);
        self.last_save_ms
            .is_none_or(|last| now.saturating_sub(last) >= self.min_interval_ms)
    }

    /// Save unless a write happened within the minimum interval.
    /// Returns whether a write was attempted and succeeded.
    pub fn save_if_due(&mut self, finish_times: &[Option<u32>]) -> Result<bool, PersistError> {
        if !self.is_due() {
            return Ok(false);
        }
        self.flush(finish_times)?;
        Ok(true)
    }

    /// Finish times left out of written records because they exceeded the
    /// plausibility bound. Counted per write.
    pub fn implausible_dropped(&self) -> u64 {
        self.implausible_dropped
    }

    /// Write immediately, ignoring the throttle.
    ///
    /// Entries above the plausibility bound are written as pending so the
    /// record still loads; earlier entries are kept.
    pub fn flush(&mut self, finish_times: &[Option<u32>]) -> Result<(), PersistError> {
        let (times, dropped) = persistable(finish_times, self.max_plausible_ms);
        if dropped > 0 {
            self.implausible_dropped += dropped as u64;
            tracing::warn!(
                dropped,
                max_ms = self.max_plausible_ms,
                "finish times beyond plausible range not persisted"
            );
        }
        let bytes = PersistedRecord::new(times).encode()?;
        // A failed write still starts a new interval.
        self.last_save_ms = Some(self.clock.ms_since(self.epoch));
        self.store.put(&self.key, &bytes).map_err(PersistError::Io)?;
        tracing::debug!(key = %self.key, bytes = bytes.len(), "record saved");
        Ok(())
    }

    /// Delete the stored record and forget the throttle.
    pub fn clear(&mut self) -> Result<(), PersistError> {
        self.last_save_ms = None;
        self.store.delete(&self.key).map_err(PersistError::Io)
    }
}
