use dashmap::DashMap;

/// Last select payload per table key. Any write to a table drops its entry.
///
/// A write racing a read may leave a stale entry behind; reads are not
/// guaranteed to observe the caller's own writes.
#[derive(Default)]
pub struct ResultCache {
    entries: DashMap<String, String>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn put(&self, key: &str, payload: String) {
        self.entries.insert(key.to_string(), payload);
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
