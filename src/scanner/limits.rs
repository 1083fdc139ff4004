//! Open-file budget for the parallel readers.
//!
//! Byte verification keeps one descriptor (and one thread) per member open
//! for as long as the member is compared. [`readers_per_group`] turns the
//! process's soft `RLIMIT_NOFILE` into the number of readers one
//! verification may hold at a time; larger groups are verified in batches.

/// Upper bound on readers one verification holds open, whatever the limit.
pub const MAX_READERS_PER_GROUP: usize = 128;

/// Smallest useful batch: two files to compare.
pub const MIN_READERS_PER_GROUP: usize = 2;

/// Soft limit assumed where the platform has no `RLIMIT_NOFILE`.
const FALLBACK_OPEN_FILES: u64 = 512;

/// Raise the soft open-file limit as far as the hard limit allows.
///
/// Returns the soft limit in effect afterwards. Failure is logged, never
/// fatal: the scan still runs within the current limit.
pub fn raise_open_file_limit() -> u64 {
    match rlimit::increase_nofile_limit(u64::MAX) {
        Ok(limit) => {
            log::debug!("Open file limit is {}", limit);
            limit
        }
        Err(e) => {
            log::warn!("Could not raise open file limit: {}", e);
            open_file_limit()
        }
    }
}

/// Current soft open-file limit.
#[must_use]
pub fn open_file_limit() -> u64 {
    #[cfg(unix)]
    {
        match rlimit::getrlimit(rlimit::Resource::NOFILE) {
            Ok((soft, _)) => soft,
            Err(e) => {
                log::debug!("Could not query open file limit: {}", e);
                FALLBACK_OPEN_FILES
            }
        }
    }
    #[cfg(not(unix))]
    {
        FALLBACK_OPEN_FILES
    }
}

/// Readers each of `concurrent` simultaneous verifications may hold open
/// under the current soft limit.
#[must_use]
pub fn readers_per_group(concurrent: usize) -> usize {
    reader_budget(open_file_limit(), concurrent)
}

/// Readers each of `concurrent` verifications may hold under `limit`.
///
/// Half the limit is shared among the verifications. The other half stays
/// with the walker, the hash stage, the result file and the process itself.
#[must_use]
pub fn reader_budget(limit: u64, concurrent: usize) -> usize {
    let share = limit / 2 / concurrent.max(1) as u64;
    usize::try_from(share)
        .unwrap_or(usize::MAX)
        .clamp(MIN_READERS_PER_GROUP, MAX_READERS_PER_GROUP)
}
