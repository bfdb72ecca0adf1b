//! Key-value backends able to hold the record document.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::app_response::AppResponse;

/// A string-keyed store of string values.
///
/// `write` replaces the previous value in a single step; a reader never
/// observes a partially written document.
pub trait DocumentStorage {
    fn read(&self, key: &str) -> Result<Option<String>, AppResponse>;
    fn write(&self, key: &str, value: &str) -> Result<(), AppResponse>;
}

/// Non-durable backend kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, AppResponse> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: DocumentStorage + ?Sized> DocumentStorage for &S {
    fn read(&self, key: &str) -> Result<Option<String>, AppResponse> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        (**self).write(key, value)
    }
}
