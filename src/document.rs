//! A JSON collection file and the read-modify-write cycle around it.

use crate::error::{Error, Result};
use crate::persist::{atomic_write, load};
use crate::queue::{absolute_key, WriteQueues};
use crate::serializer::{JsonSerializer, Serializer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// What a [`Collection::transact`] closure did to the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    /// Nothing changed; no write happens.
    Unchanged(R),
    /// The collection was changed and gets written back in full.
    Modified(R),
}

impl<R> Outcome<R> {
    /// The value handed back to the caller.
    pub fn into_inner(self) -> R {
        match self {
            Outcome::Unchanged(r) | Outcome::Modified(r) => r,
        }
    }
}

/// One JSON array on disk holding every record of type `T`.
///
/// Holds no records in memory. Each call reads the file fresh, and every
/// mutation rewrites the whole file atomically. Mutations go through the
/// file's lane in a [`WriteQueues`] registry, so read-modify-write cycles on
/// the same file never interleave within this process.
pub struct Collection<T> {
    path: PathBuf,
    serializer: JsonSerializer,
    queues: Arc<WriteQueues>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Collection at `path` with pretty JSON and the process-wide queues.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder(path).build()
    }

    /// Start configuring a collection.
    pub fn builder(path: impl AsRef<Path>) -> CollectionBuilder<T> {
        CollectionBuilder::new(path)
    }

    /// Path to the backing JSON file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The registry this collection queues its writes on.
    #[must_use]
    pub fn queues(&self) -> &Arc<WriteQueues> {
        &self.queues
    }

    /// Mutations queued or running on this file.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queues.pending(&self.path)
    }

    // ---- reads ----

    /// Read the collection; a missing file reads as empty.
    ///
    /// Not queued. Outside [`transact`](Self::transact) the result may
    /// already be stale relative to a write in flight.
    pub fn load(&self) -> Result<Vec<T>> {
        self.load_or(Vec::new())
    }

    /// Read the collection; a missing file reads as `empty_default`.
    pub fn load_or(&self, empty_default: Vec<T>) -> Result<Vec<T>> {
        load(&self.path, empty_default, &self.serializer)
    }

    // ---- writes ----

    /// Run one read-modify-write cycle on the file's queue.
    ///
    /// `f` gets the freshly loaded collection. Returning
    /// [`Outcome::Modified`] writes the whole collection back before the next
    /// queued operation starts; [`Outcome::Unchanged`] or an error writes
    /// nothing.
    pub fn transact<R, E, F>(&self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&mut Vec<T>) -> std::result::Result<Outcome<R>, E>,
        E: From<Error>,
    {
        self.transact_with(|| Ok(()), |(), items| f(items))
    }

    /// Like [`transact`](Self::transact), but runs `prepare` on the queue
    /// before the file is read.
    ///
    /// An error from `prepare` ends the cycle without loading the collection,
    /// so a check that doesn't depend on this file fails the same way whether
    /// or not the file is readable.
    pub fn transact_with<P, R, E, G, F>(&self, prepare: G, f: F) -> std::result::Result<R, E>
    where
        G: FnOnce() -> std::result::Result<P, E>,
        F: FnOnce(P, &mut Vec<T>) -> std::result::Result<Outcome<R>, E>,
        E: From<Error>,
    {
        self.queues.enqueue(&self.path, || {
            let prepared = prepare()?;
            let mut items = self.load()?;
            match f(prepared, &mut items)? {
                Outcome::Unchanged(r) => Ok(r),
                Outcome::Modified(r) => {
                    self.write(&items)?;
                    Ok(r)
                }
            }
        })
    }

    /// Replace the whole collection with `items`.
    pub fn save(&self, items: &[T]) -> Result<()> {
        self.queues.enqueue(&self.path, || self.write(items))
    }

    fn write(&self, items: &[T]) -> Result<()> {
        let bytes = self.serializer.serialize(items)?;
        atomic_write(&self.path, &bytes)?;
        debug!(path = %self.path.display(), records = items.len(), bytes = bytes.len(), "collection written");
        Ok(())
    }
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            serializer: self.serializer.clone(),
            queues: Arc::clone(&self.queues),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("path", &self.path)
            .field("pretty", &self.serializer.is_pretty())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures a [`Collection`].
///
/// ```rust,no_run
/// use loyalty_store::{Collection, Reward};
///
/// let rewards = Collection::<Reward>::builder("data/rewards.json")
///     .pretty(false)
///     .build()
///     .unwrap();
/// ```
pub struct CollectionBuilder<T> {
    path: PathBuf,
    pretty: bool,
    queues: Option<Arc<WriteQueues>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CollectionBuilder<T>
where
    T: Serialize + DeserializeOwned,
{
    fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pretty: true,
            queues: None,
            _marker: PhantomData,
        }
    }

    /// Indented JSON (default) or compact single-line JSON.
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }

    /// Queue writes on `queues` instead of the process-wide registry.
    pub fn queues(mut self, queues: Arc<WriteQueues>) -> Self {
        self.queues = Some(queues);
        self
    }

    /// Validate the path and return the collection. Doesn't touch the disk.
    ///
    /// A relative path is resolved against the working directory here, once;
    /// [`Collection::path`] is always absolute.
    pub fn build(self) -> Result<Collection<T>> {
        if self.path.file_name().is_none() {
            return Err(Error::Config(format!(
                "collection path {} has no file name",
                self.path.display()
            )));
        }
        let path = absolute_key(&self.path)
            .map_err(|e| Error::Io(format!("{}: {e}", self.path.display())))?;
        let serializer = if self.pretty {
            JsonSerializer::pretty()
        } else {
            JsonSerializer::new()
        };
        Ok(Collection {
            path,
            serializer,
            queues: self.queues.unwrap_or_else(WriteQueues::process),
            _marker: PhantomData,
        })
    }
}

impl<T> std::fmt::Debug for CollectionBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionBuilder")
            .field("path", &self.path)
            .field("pretty", &self.pretty)
            .finish_non_exhaustive()
    }
}
