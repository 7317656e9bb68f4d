//! Per-file write queues.
//!
//! Every mutation of a collection file runs through [`WriteQueues::enqueue`].
//! Operations on the same file run one at a time, in the order they were
//! submitted; operations on different files don't wait on each other.
//!
//! Each file gets a lane: a ticket counter guarded by a `parking_lot` mutex
//! plus a condvar. Submitting takes the next ticket; an operation starts once
//! the lane is serving its ticket and hands the lane to the next ticket when
//! it finishes, including when it returns an error or panics.

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};

static PROCESS_QUEUES: OnceLock<Arc<WriteQueues>> = OnceLock::new();

/// Registry of write lanes keyed by file path.
///
/// Starts empty. Lanes are created on first use and live as long as the
/// registry. Nothing needs tearing down: a restart starts from an empty
/// registry again.
#[derive(Default)]
pub struct WriteQueues {
    lanes: DashMap<PathBuf, Arc<Lane>>,
}

impl WriteQueues {
    /// Fresh, empty registry. Handles sharing a file must share a registry
    /// to be serialized against each other.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by everything in this process that doesn't bring
    /// its own. Store builders use it by default.
    pub fn process() -> Arc<Self> {
        Arc::clone(PROCESS_QUEUES.get_or_init(|| Arc::new(Self::new())))
    }

    /// Run `op` once every operation previously submitted for `key` has
    /// finished, and return its result to this caller only.
    ///
    /// Keys are compared after dropping `.` components and are not resolved
    /// against the working directory. [`Collection`](crate::Collection)
    /// always passes an absolute path.
    ///
    /// `op` should do the whole read-modify-write cycle, reads included, so
    /// it sees the latest committed state.
    pub fn enqueue<T, F>(&self, key: &Path, op: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.lane(key).run(op)
    }

    /// Operations queued or running for `key` right now.
    #[must_use]
    pub fn pending(&self, key: &Path) -> usize {
        match self.lanes.get(&lane_key(key)) {
            Some(lane) => lane.pending(),
            None => 0,
        }
    }

    /// Number of files that have had a lane created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// `true` when no lane has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    fn lane(&self, key: &Path) -> Arc<Lane> {
        // Clone the Arc out so the map shard isn't locked while we wait.
        self.lanes.entry(lane_key(key)).or_default().value().clone()
    }
}

impl std::fmt::Debug for WriteQueues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteQueues")
            .field("lanes", &self.lanes.len())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Lane {
    tickets: Mutex<Tickets>,
    turn: Condvar,
}

#[derive(Default)]
struct Tickets {
    next: u64,
    serving: u64,
}

impl Lane {
    fn run<T, F>(&self, op: F) -> T
    where
        F: FnOnce() -> T,
    {
        {
            let mut tickets = self.tickets.lock();
            let mine = tickets.next;
            tickets.next += 1;
            while tickets.serving != mine {
                self.turn.wait(&mut tickets);
            }
        }
        let _turn = Turn { lane: self };
        op()
    }

    fn pending(&self) -> usize {
        let tickets = self.tickets.lock();
        (tickets.next - tickets.serving) as usize
    }
}

/// Passes the lane on when dropped, so a panicking operation can't stall
/// the operations queued behind it.
struct Turn<'a> {
    lane: &'a Lane,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        self.lane.tickets.lock().serving += 1;
        self.lane.turn.notify_all();
    }
}

/// `.`-free form of `path`, so different spellings of one file share a lane.
/// Symlinks and `..` are not resolved.
fn lane_key(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// `path` made absolute against the working directory, in the same
/// normalized form lanes are keyed by.
pub(crate) fn absolute_key(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(lane_key(path))
    } else {
        Ok(lane_key(&std::env::current_dir()?.join(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spellings_of_one_path_share_a_key() {
        assert_eq!(
            lane_key(Path::new("/srv/data/x.json")),
            lane_key(Path::new("/srv/./data/./x.json"))
        );
        assert_ne!(
            lane_key(Path::new("/srv/data/x.json")),
            lane_key(Path::new("/srv/data/y.json"))
        );
    }

    #[test]
    fn absolute_key_resolves_against_working_dir() {
        let cwd = std::env::current_dir().unwrap();
        let key = absolute_key(Path::new("./data/x.json")).unwrap();
        assert!(key.is_absolute());
        assert_eq!(key, cwd.join("data").join("x.json"));
        assert_eq!(key, absolute_key(Path::new("data/x.json")).unwrap());
        assert_eq!(
            absolute_key(Path::new("/srv/./x.json")).unwrap(),
            PathBuf::from("/srv/x.json")
        );
    }

    #[test]
    fn lanes_are_created_lazily() {
        let queues = WriteQueues::new();
        assert!(queues.is_empty());
        assert_eq!(queues.pending(Path::new("/tmp/a.json")), 0);
        assert!(queues.is_empty());

        let out = queues.enqueue(Path::new("/tmp/a.json"), || 7);
        assert_eq!(out, 7);
        assert_eq!(queues.len(), 1);
        assert_eq!(queues.pending(Path::new("/tmp/a.json")), 0);
    }

    #[test]
    fn process_registry_is_shared() {
        assert!(Arc::ptr_eq(&WriteQueues::process(), &WriteQueues::process()));
    }
}
