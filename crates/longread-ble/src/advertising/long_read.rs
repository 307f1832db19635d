//! Offset bookkeeping for long characteristic reads
//!
//! A central reads a value longer than one ATT response as a series of
//! requests with increasing offsets. Identity values are regenerated on every
//! fresh read, so continuation requests must be served from the value that
//! answered the first request of the same central.

use std::collections::HashMap;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LongReadError {
    /// Offset past the end of the value, or no read in progress
    InvalidOffset,
    /// The event handler produced no value
    Unavailable,
}

#[derive(Debug, Default)]
pub(crate) struct LongReadCache {
    values: HashMap<(String, Uuid), Vec<u8>>,
}

impl LongReadCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve a read at `offset`, producing a fresh value for offset 0.
    ///
    /// The value is kept only while the remainder does not fit in one
    /// response of `mtu` bytes.
    pub(crate) fn read(
        &mut self,
        central: &str,
        characteristic: Uuid,
        offset: usize,
        mtu: usize,
        fresh: impl FnOnce() -> Option<Vec<u8>>,
    ) -> Result<Vec<u8>, LongReadError> {
        let key = (central.to_string(), characteristic);

        let value = if offset == 0 {
            let value = fresh().ok_or(LongReadError::Unavailable)?;
            self.values.insert(key.clone(), value);
            &self.values[&key]
        } else {
            self.values.get(&key).ok_or(LongReadError::InvalidOffset)?
        };

        if offset > value.len() {
            self.values.remove(&key);
            return Err(LongReadError::InvalidOffset);
        }

        let remainder = value[offset..].to_vec();
        // ATT read responses carry at most MTU - 1 bytes
        if remainder.len() < mtu.saturating_sub(1) {
            self.values.remove(&key);
        }
        Ok(remainder)
    }

    pub(crate) fn pending(&self) -> usize {
        self.values.len()
    }
}
