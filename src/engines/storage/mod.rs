//! Storage containers
//!
//! [`Temp`] owns a file created for an intermediate result and removes it
//! when dropped. [`Chunks`] is a restartable, lazily evaluated sequence of
//! batches: every call to [`Chunks::iter`] re-runs the producer from the start.

pub mod formats;

use std::fmt;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

/// A resource backed by a temporary file.
///
/// The file is deleted when the `Temp` goes out of scope unless
/// [`Temp::persist`] is called first.
pub struct Temp<T> {
    inner: T,
    path: TempPath,
}

impl<T> Temp<T> {
    /// Reserve a uniquely named hidden file in `dir` ending with `suffix`
    /// and build the resource on top of its path.
    pub fn create_in<P, F>(dir: P, suffix: &str, build: F) -> io::Result<Self>
    where
        P: AsRef<Path>,
        F: FnOnce(&Path) -> T,
    {
        let path = tempfile::Builder::new()
            .prefix(".")
            .suffix(suffix)
            .tempfile_in(dir)?
            .into_temp_path();
        let inner = build(&path);

        Ok(Self { inner, path })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the backing file on disk and return the bare resource
    pub fn persist(self) -> io::Result<(T, PathBuf)> {
        let path = self.path.keep().map_err(|e| e.error)?;
        Ok((self.inner, path))
    }
}

impl<T> Deref for Temp<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> AsRef<T> for Temp<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for Temp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Temp")
            .field("inner", &self.inner)
            .field("path", &self.path.to_path_buf())
            .finish()
    }
}

/// Restartable lazy sequence of batches
pub struct Chunks<T> {
    producer: Box<dyn Fn() -> Box<dyn Iterator<Item = T>>>,
}

impl<T: 'static> Chunks<T> {
    /// Wrap a producer that yields a fresh iterator on every call
    pub fn new<F, I>(producer: F) -> Self
    where
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Self {
            producer: Box::new(move || -> Box<dyn Iterator<Item = T>> {
                Box::new(producer().into_iter())
            }),
        }
    }

    /// Chunks over an already materialized list
    pub fn from_vec(items: Vec<T>) -> Self
    where
        T: Clone,
    {
        Self::new(move || items.clone())
    }

    /// Start a new pass over the batches
    pub fn iter(&self) -> Box<dyn Iterator<Item = T>> {
        (self.producer)()
    }

    /// Lazily transform every batch, keeping the result restartable
    pub fn map<U, F>(self, f: F) -> Chunks<U>
    where
        U: 'static,
        F: Fn(T) -> U + Clone + 'static,
    {
        Chunks::new(move || self.iter().map(f.clone()))
    }
}

impl<T: 'static> IntoIterator for &Chunks<T> {
    type Item = T;
    type IntoIter = Box<dyn Iterator<Item = T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> fmt::Debug for Chunks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunks").finish_non_exhaustive()
    }
}
