//! Lockable configuration objects
//!
//! Locking turns a previously mutable object into an immutable one. Once an
//! instance is locked every mutation attempt fails and there is no way back:
//! a locked instance can be shared between any number of consumers without
//! copying it first.

use thiserror::Error;

/// Error raised when a locked instance is mutated
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("instance locked: {type_name} cannot be modified after lock()")]
pub struct LockError {
    type_name: &'static str,
}

impl LockError {
    /// Create a lock error for the given type
    pub fn new(type_name: &'static str) -> Self {
        Self { type_name }
    }

    /// Name of the type whose mutation was rejected
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Capability shared by every freeze-once configuration object.
///
/// Implementors must treat `lock` as idempotent and irreversible. After the
/// first call `is_locked` returns `true` for the rest of the instance's life.
pub trait Lockable {
    /// Lock the instance. Subsequent calls are ignored.
    fn lock(&mut self);

    /// Whether the instance has been locked
    fn is_locked(&self) -> bool;

    /// Fail with a [`LockError`] if the instance is locked.
    ///
    /// Mutators call this before touching any state.
    fn enforce_lock(&self) -> Result<(), LockError> {
        if self.is_locked() {
            Err(LockError::new(std::any::type_name::<Self>()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Settings {
        value: u32,
        locked: bool,
    }

    impl Settings {
        fn set_value(&mut self, value: u32) -> Result<&mut Self, LockError> {
            self.enforce_lock()?;
            self.value = value;
            Ok(self)
        }
    }

    impl Lockable for Settings {
        fn lock(&mut self) {
            self.locked = true;
        }

        fn is_locked(&self) -> bool {
            self.locked
        }
    }

    #[test]
    fn test_unlocked_allows_mutation() {
        let mut settings = Settings::default();
        assert!(settings.enforce_lock().is_ok());
        settings.set_value(3).unwrap().set_value(4).unwrap();
        assert_eq!(settings.value, 4);
    }

    #[test]
    fn test_lock_is_irreversible() {
        let mut settings = Settings::default();
        settings.lock();
        settings.lock();
        assert!(settings.is_locked());

        let err = settings.set_value(7).unwrap_err();
        assert!(err.type_name().contains("Settings"));
        assert_eq!(settings.value, 0);
        assert!(settings.is_locked());
    }
}
