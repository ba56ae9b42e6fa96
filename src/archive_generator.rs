use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::ArchiveError;

type Result<T> = std::result::Result<T, ArchiveError>;

/// Closure that materialises the content of one archive entry.
pub type Producer<'a> = Box<dyn FnOnce() -> Result<Vec<u8>> + 'a>;

/// Pull-based source of archive entry content, keyed by entry.
pub trait ArchiveFileGenerator<K> {
    fn count(&self) -> usize;

    fn contains(&self, key: &K) -> bool;

    /// Returns the content for `key`.
    fn take(&mut self, key: &K) -> Result<Vec<u8>>;
}

enum Slot<'a> {
    Pending(Producer<'a>),
    Consumed,
}

/// Writer-side generator. Each producer runs at most once; taking the same key
/// twice is an error.
pub struct FileGenerator<'a, K> {
    producers: IndexMap<K, Slot<'a>>,
}

impl<'a, K: Hash + Eq + Debug> FileGenerator<'a, K> {
    pub fn new() -> Self {
        FileGenerator {
            producers: IndexMap::new(),
        }
    }

    pub fn add<F>(&mut self, key: K, producer: F) -> Result<()>
    where
        F: FnOnce() -> Result<Vec<u8>> + 'a,
    {
        if self.producers.contains_key(&key) {
            return Err(ArchiveError::DuplicateGeneratorKey(format!("{:?}", key)));
        }
        self.producers.insert(key, Slot::Pending(Box::new(producer)));
        Ok(())
    }

    pub fn add_bytes(&mut self, key: K, bytes: Vec<u8>) -> Result<()> {
        self.add(key, move || Ok(bytes))
    }

    /// Number of producers that have not run yet.
    pub fn remaining(&self) -> usize {
        self.producers
            .values()
            .filter(|slot| matches!(slot, Slot::Pending(_)))
            .count()
    }
}

impl<'a, K: Hash + Eq + Debug> Default for FileGenerator<'a, K> {
    fn default() -> Self {
        FileGenerator::new()
    }
}

impl<'a, K: Hash + Eq + Debug> ArchiveFileGenerator<K> for FileGenerator<'a, K> {
    fn count(&self) -> usize {
        self.producers.len()
    }

    fn contains(&self, key: &K) -> bool {
        self.producers.contains_key(key)
    }

    fn take(&mut self, key: &K) -> Result<Vec<u8>> {
        let slot = self
            .producers
            .get_mut(key)
            .ok_or_else(|| ArchiveError::UnknownGeneratorKey(format!("{:?}", key)))?;
        match std::mem::replace(slot, Slot::Consumed) {
            Slot::Pending(producer) => producer(),
            Slot::Consumed => Err(ArchiveError::GeneratorKeyConsumed(format!("{:?}", key))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn producers_run_on_take() {
        let calls = Cell::new(0);
        let mut generator = FileGenerator::new();
        generator
            .add("a", || {
                calls.set(calls.get() + 1);
                Ok(vec![1, 2])
            })
            .unwrap();
        assert_eq!(0, calls.get());
        assert_eq!(vec![1, 2], generator.take(&"a").unwrap());
        assert_eq!(1, calls.get());
        assert_eq!(0, generator.remaining());
        assert_eq!(1, generator.count());
    }

    #[test]
    fn second_take_fails() {
        let mut generator = FileGenerator::new();
        generator.add_bytes("a", vec![1]).unwrap();
        generator.take(&"a").unwrap();
        assert!(matches!(
            generator.take(&"a"),
            Err(ArchiveError::GeneratorKeyConsumed(_))
        ));
    }

    #[test]
    fn unknown_key_fails() {
        let mut generator: FileGenerator<&str> = FileGenerator::new();
        assert!(matches!(
            generator.take(&"missing"),
            Err(ArchiveError::UnknownGeneratorKey(_))
        ));
    }

    #[test]
    fn duplicate_key_fails() {
        let mut generator = FileGenerator::new();
        generator.add_bytes(1, vec![]).unwrap();
        assert!(matches!(
            generator.add_bytes(1, vec![]),
            Err(ArchiveError::DuplicateGeneratorKey(_))
        ));
    }

    #[test]
    fn producer_errors_propagate() {
        let mut generator = FileGenerator::new();
        generator
            .add("broken", || {
                Err(ArchiveError::IOError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "gone",
                )))
            })
            .unwrap();
        assert!(generator.take(&"broken").is_err());
        assert_eq!(0, generator.remaining());
    }
}
