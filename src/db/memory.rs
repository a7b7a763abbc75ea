use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::{Engine, Write};
use crate::error::BackendError;

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug)]
struct State {
    entries: HashMap<String, Entry>,
    skew: Duration,
}

fn later(now: Instant, by: Duration) -> Result<Instant, BackendError> {
    now.checked_add(by).ok_or(BackendError::ClockOverflow(by))
}

impl State {
    fn now(&self) -> Result<Instant, BackendError> {
        later(Instant::now(), self.skew)
    }

    fn live(&self, key: &str, now: Instant) -> Option<&Entry> {
        self.entries.get(key).filter(|e| e.is_live(now))
    }

    fn write(&mut self, write: &Write, now: Instant) -> Result<(), BackendError> {
        match write {
            Write::Set { key, value } => {
                self.entries.insert(
                    key.clone(),
                    Entry {
                        value: value.clone(),
                        expires_at: None,
                    },
                );
            }
            Write::SetEx {
                key,
                value,
                ttl_secs,
            } => {
                let expires_at = later(now, Duration::from_secs(*ttl_secs))?;
                self.entries.insert(
                    key.clone(),
                    Entry {
                        value: value.clone(),
                        expires_at: Some(expires_at),
                    },
                );
            }
            Write::Del { key } => {
                self.entries.remove(key);
            }
            Write::DelIfEq { key, expected } => {
                if self.live(key, now).map_or(false, |e| &e.value == expected) {
                    self.entries.remove(key);
                }
            }
        }
        Ok(())
    }

    fn purge_expired(&mut self, now: Instant) {
        self.entries.retain(|_, e| e.is_live(now));
    }
}

/// An in-process engine with the same expiry semantics as Redis.
///
/// Clones share the same key-space. The engine clock can be moved forward
/// with [`MemoryEngine::advance`] so expiry can be observed without waiting.
/// Expired entries are dropped when read and whenever a batch is applied.
#[derive(Clone, Debug)]
pub struct MemoryEngine {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
                skew: Duration::from_secs(0),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn advance(&self, by: Duration) -> Result<(), BackendError> {
        let mut state = self.lock();
        let skew = state
            .skew
            .checked_add(by)
            .ok_or(BackendError::ClockOverflow(by))?;
        later(Instant::now(), skew)?;
        state.skew = skew;
        Ok(())
    }

    /// Live keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let state = self.lock();
        let now = match state.now() {
            Ok(now) => now,
            Err(_) => return Vec::new(),
        };
        let mut keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Engine for MemoryEngine {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let mut state = self.lock();
        let now = state.now()?;
        let value = match state.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => None,
            None => return Ok(None),
        };
        state.entries.remove(key);
        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        self.apply(&[Write::Set {
            key: key.to_string(),
            value: value.to_vec(),
        }])
    }

    fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), BackendError> {
        self.apply(&[Write::SetEx {
            key: key.to_string(),
            value: value.to_vec(),
            ttl_secs,
        }])
    }

    fn del(&self, key: &str) -> Result<(), BackendError> {
        self.apply(&[Write::Del {
            key: key.to_string(),
        }])
    }

    fn apply(&self, batch: &[Write]) -> Result<(), BackendError> {
        let mut state = self.lock();
        let now = state.now()?;

        // Reject the whole batch before touching any entry.
        for write in batch {
            if let Write::SetEx { ttl_secs, .. } = write {
                later(now, Duration::from_secs(*ttl_secs))?;
            }
        }

        state.purge_expired(now);
        for write in batch {
            state.write(write, now)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_del() {
        let engine = MemoryEngine::new();
        engine.set("k", b"v").unwrap();
        assert_eq!(engine.get("k").unwrap(), Some(b"v".to_vec()));

        engine.del("k").unwrap();
        assert_eq!(engine.get("k").unwrap(), None);
        engine.del("k").unwrap();
    }

    #[test]
    fn ttl_elapses_with_the_clock() {
        let engine = MemoryEngine::new();
        engine.set_ex("k", b"v", 10).unwrap();

        engine.advance(Duration::from_secs(9)).unwrap();
        assert!(engine.get("k").unwrap().is_some());

        engine.advance(Duration::from_secs(1)).unwrap();
        assert_eq!(engine.get("k").unwrap(), None);
        assert!(engine.is_empty());
    }

    #[test]
    fn plain_set_clears_a_previous_ttl() {
        let engine = MemoryEngine::new();
        engine.set_ex("k", b"old", 1).unwrap();
        engine.set("k", b"new").unwrap();

        engine.advance(Duration::from_secs(5)).unwrap();
        assert_eq!(engine.get("k").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn batches_apply_in_order() {
        let engine = MemoryEngine::new();
        engine
            .apply(&[
                Write::Set {
                    key: "a".into(),
                    value: b"1".to_vec(),
                },
                Write::Set {
                    key: "b".into(),
                    value: b"2".to_vec(),
                },
                Write::Del { key: "a".into() },
            ])
            .unwrap();
        assert_eq!(engine.keys(), vec!["b".to_string()]);
    }

    fn stored(engine: &MemoryEngine) -> usize {
        engine.lock().entries.len()
    }

    #[test]
    fn expired_entries_are_dropped_on_read() {
        let engine = MemoryEngine::new();
        engine.set_ex("k", b"v", 1).unwrap();
        engine.advance(Duration::from_secs(2)).unwrap();
        assert_eq!(stored(&engine), 1);

        assert_eq!(engine.get("k").unwrap(), None);
        assert_eq!(stored(&engine), 0);
    }

    #[test]
    fn expired_entries_are_dropped_by_writes() {
        let engine = MemoryEngine::new();
        engine.set_ex("a", b"1", 1).unwrap();
        engine.set_ex("b", b"2", 1).unwrap();
        engine.advance(Duration::from_secs(2)).unwrap();

        engine.set("c", b"3").unwrap();
        assert_eq!(stored(&engine), 1);
        assert_eq!(engine.keys(), vec!["c".to_string()]);
    }

    #[test]
    fn ttl_beyond_the_clock_is_an_error() {
        let engine = MemoryEngine::new();
        let err = engine.set_ex("k", b"v", u64::MAX).unwrap_err();
        assert!(matches!(err, BackendError::ClockOverflow(_)), "{:?}", err);
        assert!(engine.is_empty());
    }

    #[test]
    fn failed_batches_write_nothing() {
        let engine = MemoryEngine::new();
        let err = engine.apply(&[
            Write::Set {
                key: "a".into(),
                value: b"1".to_vec(),
            },
            Write::SetEx {
                key: "b".into(),
                value: b"2".to_vec(),
                ttl_secs: u64::MAX,
            },
        ]);
        assert!(err.is_err());
        assert!(engine.is_empty());
    }

    #[test]
    fn advancing_past_the_clock_is_an_error() {
        let engine = MemoryEngine::new();
        engine.set_ex("k", b"v", 10).unwrap();

        assert!(engine.advance(Duration::MAX).is_err());
        assert_eq!(engine.get("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn conditional_delete_compares_the_current_value() {
        let engine = MemoryEngine::new();
        engine.set("k", b"mine").unwrap();

        engine
            .apply(&[Write::DelIfEq {
                key: "k".into(),
                expected: b"theirs".to_vec(),
            }])
            .unwrap();
        assert_eq!(engine.get("k").unwrap(), Some(b"mine".to_vec()));

        engine
            .apply(&[Write::DelIfEq {
                key: "k".into(),
                expected: b"mine".to_vec(),
            }])
            .unwrap();
        assert_eq!(engine.get("k").unwrap(), None);
    }
}
