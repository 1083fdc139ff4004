//! Bytewise verification of hash candidates.
//!
//! # Overview
//!
//! [`verify_group`] opens one reader per candidate and walks all of them in
//! lock-step, one chunk at a time. At every position the live readers of a
//! partition are split in two: those whose chunk equals the first reader's
//! chunk, and the rest. Each side continues as an independent partition, in
//! parallel, as long as it has 2+ members. A partition whose members all hit
//! end-of-stream at the same position is a confirmed duplicate group.
//!
//! End-of-stream compares like any other chunk, so a reader that ends while
//! another still has data lands on the other side of the split. Files of
//! different length are never grouped, even if one is a prefix of the other.
//!
//! Members of the unequal side keep the chunk they already read. They have
//! not been compared with each other yet, so the child partition compares
//! those pending chunks before reading further.
//!
//! Every reader belongs to exactly one partition at a time and is moved, not
//! shared, into the child that keeps it. A reader is closed the moment its
//! partition drops it, and all reading threads of one call are joined before
//! [`verify_group`] returns.
//!
//! ## Batches
//!
//! At most `max_open` readers are open at once. A larger group is verified
//! in batches: each batch holds the first member of every class found so
//! far plus as many new members as still fit, and a new member joins the
//! class whose first member it matches. When there are more classes than
//! fit in one batch, new members are compared against them window by
//! window. Empty members are grouped without being opened.
//!
//! # Example
//!
//! ```no_run
//! use dupefind::duplicates::verify_group;
//! use dupefind::signal::CancelToken;
//! use std::path::PathBuf;
//!
//! let paths = vec![PathBuf::from("a.bin"), PathBuf::from("b.bin")];
//! for group in verify_group(&paths, 104_856, &CancelToken::new()) {
//!     println!("identical: {:?}", group);
//! }
//! ```

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::thread;

use crossbeam_channel::Receiver;

use super::groups::{split_empty, CandidateGroup};
use super::stage::WorkerPool;
use crate::scanner::limits::MIN_READERS_PER_GROUP;
use crate::scanner::{readers_per_group, Chunk, ParallelReaderSet, ReaderHandle, DEFAULT_CHUNK_SIZE};
use crate::signal::CancelToken;

/// Default number of verification workers.
pub const VERIFY_WORKERS: usize = 4;

/// Capacity of the verification stage's output queue.
pub const RESULT_QUEUE_CAPACITY: usize = 128;

/// Find the byte-identical groups among `paths`, keeping at most the
/// current open-file budget of one verification open at once.
///
/// Paths that cannot be opened or read are logged and left out. If `cancel`
/// is raised before the call completes, no result is returned at all.
#[must_use]
pub fn verify_group(paths: &[PathBuf], chunk_size: usize, cancel: &CancelToken) -> Vec<CandidateGroup> {
    verify_group_within(paths, chunk_size, readers_per_group(1), cancel)
}

/// Find the byte-identical groups among `paths` with at most `max_open`
/// files open at once.
///
/// `max_open` is raised to 2 if lower. Otherwise behaves like
/// [`verify_group`].
#[must_use]
pub fn verify_group_within(
    paths: &[PathBuf],
    chunk_size: usize,
    max_open: usize,
    cancel: &CancelToken,
) -> Vec<CandidateGroup> {
    if paths.len() < 2 {
        return Vec::new();
    }
    let max_open = max_open.max(MIN_READERS_PER_GROUP);

    let (empty, sized) = split_empty(paths);
    let mut classes = if sized.len() <= max_open {
        partition(&sized, chunk_size, cancel)
    } else {
        partition_in_batches(&sized, chunk_size, max_open, cancel)
    };
    classes.push(empty);

    if cancel.is_cancelled() {
        log::debug!("Verification cancelled, discarding {} classes", classes.len());
        return Vec::new();
    }

    let groups: Vec<CandidateGroup> = classes.into_iter().filter(|class| class.len() > 1).collect();
    for group in &groups {
        log::debug!("Confirmed duplicate group of {} files", group.len());
    }
    groups
}

/// Split `paths` into classes of identical content, singletons included,
/// with every path open at once.
fn partition(paths: &[PathBuf], chunk_size: usize, cancel: &CancelToken) -> Vec<CandidateGroup> {
    if paths.is_empty() {
        return Vec::new();
    }
    let readers = ParallelReaderSet::open(paths, chunk_size);

    thread::scope(|s| {
        let members = readers.drive(s, cancel).into_iter().map(Member::new).collect();
        resolve(members, cancel)
    })
}

/// Split `paths` into classes of identical content, at most `max_open`
/// files at a time.
fn partition_in_batches(
    paths: &[PathBuf],
    chunk_size: usize,
    max_open: usize,
    cancel: &CancelToken,
) -> Vec<CandidateGroup> {
    log::debug!(
        "Verifying {} candidates in batches of at most {} open files",
        paths.len(),
        max_open
    );

    let mut classes: Vec<CandidateGroup> = Vec::new();
    let mut rest = paths;

    while !rest.is_empty() {
        if cancel.is_cancelled() {
            return Vec::new();
        }
        // Leave at least half of every batch for new members.
        let reserved = classes.len().min(max_open / 2);
        let (batch, tail) = rest.split_at((max_open - reserved).min(rest.len()));
        rest = tail;
        place_newcomers(&mut classes, batch.to_vec(), chunk_size, max_open, cancel);
    }

    classes
}

/// Add `newcomers` to the class whose first member they match, or as new
/// classes.
fn place_newcomers(
    classes: &mut Vec<CandidateGroup>,
    mut newcomers: Vec<PathBuf>,
    chunk_size: usize,
    max_open: usize,
    cancel: &CancelToken,
) {
    let mut next = 0;

    loop {
        let window = next..next + (max_open - newcomers.len()).min(classes.len() - next);
        next = window.end;

        let firsts: Vec<PathBuf> = classes[window.clone()].iter().map(|c| c[0].clone()).collect();
        let index_of: HashMap<&PathBuf, usize> = firsts.iter().zip(window).collect();
        let mut batch = firsts.clone();
        batch.extend(newcomers);

        let mut unplaced = Vec::new();
        for class in partition(&batch, chunk_size, cancel) {
            match class.iter().find_map(|path| index_of.get(path)) {
                Some(&index) => {
                    let joined = class.into_iter().filter(|path| !index_of.contains_key(path));
                    classes[index].extend(joined);
                }
                None => unplaced.push(class),
            }
        }

        if cancel.is_cancelled() {
            return;
        }
        if unplaced.is_empty() || next >= classes.len() {
            classes.extend(unplaced);
            return;
        }
        newcomers = unplaced.concat();
    }
}

/// A reader in a partition, plus the chunk it already read at the current
/// position if it was split off before being compared.
#[derive(Debug)]
struct Member {
    handle: ReaderHandle,
    pending: Option<Chunk>,
}

impl Member {
    fn new(handle: ReaderHandle) -> Self {
        Self {
            handle,
            pending: None,
        }
    }

    fn take_chunk(&mut self) -> Chunk {
        self.pending
            .take()
            .unwrap_or_else(|| self.handle.next_chunk())
    }

    fn into_path(self) -> PathBuf {
        self.handle.into_path()
    }
}

fn same_content(a: &Chunk, b: &Chunk) -> bool {
    match (a, b) {
        (Chunk::Data(a), Chunk::Data(b)) => a == b,
        (Chunk::End, Chunk::End) => true,
        _ => false,
    }
}

fn into_class(members: Vec<Member>) -> CandidateGroup {
    members.into_iter().map(Member::into_path).collect()
}

/// Resolve one partition into its classes of identical content.
///
/// Singletons are closed and returned as soon as they split off. Loops while
/// only one side of a split can still split further, and recurses (in
/// parallel) when both can.
fn resolve(mut members: Vec<Member>, cancel: &CancelToken) -> Vec<CandidateGroup> {
    let mut classes = Vec::new();

    loop {
        if cancel.is_cancelled() {
            return Vec::new();
        }
        if members.len() < 2 {
            classes.extend(members.into_iter().map(|m| vec![m.into_path()]));
            return classes;
        }

        let mut lead: Option<Chunk> = None;
        let mut equal = Vec::with_capacity(members.len());
        let mut unequal = Vec::new();

        for mut member in members {
            let chunk = member.take_chunk();
            if let Chunk::Failed(e) = &chunk {
                if !e.is_cancelled() {
                    log::warn!("Dropping unreadable candidate: {}", e);
                }
                continue;
            }
            match &lead {
                None => {
                    lead = Some(chunk);
                    equal.push(member);
                }
                Some(lead_chunk) if same_content(lead_chunk, &chunk) => equal.push(member),
                Some(_) => {
                    member.pending = Some(chunk);
                    unequal.push(member);
                }
            }
        }

        if matches!(lead, Some(Chunk::End)) {
            // The whole equal side ended together.
            classes.push(into_class(equal));
            members = unequal;
            continue;
        }

        if equal.len() > 1 && unequal.len() > 1 {
            let (left, right) = rayon::join(|| resolve(equal, cancel), || resolve(unequal, cancel));
            if cancel.is_cancelled() {
                return Vec::new();
            }
            classes.extend(left);
            classes.extend(right);
            return classes;
        }

        // At most one side can still split; the other is a singleton or empty.
        let (rest, single) = if equal.len() > 1 { (equal, unequal) } else { (unequal, equal) };
        classes.extend(single.into_iter().map(|m| vec![m.into_path()]));
        members = rest;
    }
}

/// Bounded pool of verification workers.
#[derive(Debug, Clone)]
pub struct ByteVerifyStage {
    workers: usize,
    chunk_size: usize,
    cancel: CancelToken,
}

impl Default for ByteVerifyStage {
    fn default() -> Self {
        Self {
            workers: VERIFY_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: CancelToken::new(),
        }
    }
}

impl ByteVerifyStage {
    /// Create a verification stage with the given chunk size and default
    /// worker count.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            ..Self::default()
        }
    }

    /// Set the number of workers.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the token every verification derives its own token from.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Start the workers on `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be started.
    pub fn spawn(self, input: Receiver<CandidateGroup>) -> io::Result<WorkerPool<CandidateGroup>> {
        let Self {
            workers,
            chunk_size,
            cancel,
        } = self;
        let max_open = readers_per_group(workers);
        log::debug!(
            "Starting verification stage with {} workers, up to {} open files each",
            workers,
            max_open
        );

        WorkerPool::spawn(
            "dupefind-verify",
            workers,
            input,
            RESULT_QUEUE_CAPACITY,
            move |group: CandidateGroup| verify_group_within(&group, chunk_size, max_open, &cancel.child()),
        )
    }
}
