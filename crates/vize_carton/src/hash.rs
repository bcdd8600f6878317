//! Source-text hashing with xxHash3.
//!
//! Compiled templates and synthesized render functions are cached by the hash
//! of the source they were built from. A hash only narrows the lookup; hits
//! are confirmed against the full source text.

use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::xxh3_64;

#[inline]
pub fn hash_str(source: &str) -> u64 {
    xxh3_64(source.as_bytes())
}

/// Fixed-width hex form of a hash, as shown in debug output.
#[inline]
pub fn hash_to_hex(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Values built from source text, keyed by that text
#[derive(Debug, Clone)]
pub struct SourceCache<V> {
    buckets: FxHashMap<u64, Vec<(Box<str>, V)>>,
    len: usize,
}

impl<V> Default for SourceCache<V> {
    fn default() -> Self {
        Self {
            buckets: FxHashMap::default(),
            len: 0,
        }
    }
}

impl<V: Clone> SourceCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str) -> Option<V> {
        self.buckets
            .get(&hash_str(source))?
            .iter()
            .find(|(text, _)| &**text == source)
            .map(|(_, value)| value.clone())
    }

    /// Store `value` for `source`, replacing any previous entry.
    pub fn insert(&mut self, source: &str, value: V) {
        let bucket = self.buckets.entry(hash_str(source)).or_default();
        match bucket.iter_mut().find(|(text, _)| &**text == source) {
            Some(entry) => entry.1 = value,
            None => {
                bucket.push((source.into(), value));
                self.len += 1;
            }
        }
    }

    /// The cached value for `source`, building and storing it on a miss.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        source: &str,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(source) {
            return Ok(value);
        }
        let value = build()?;
        self.insert(source, value.clone());
        Ok(value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
