use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;

use crate::gateway::UserId;
use crate::store::JsonFile;

/// Per-user banned-phrase hit counter. What a given count leads to is the
/// caller's business.
pub struct ViolationTracker {
    counts: Mutex<HashMap<UserId, u32>>,
    file: JsonFile,
}

impl ViolationTracker {
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let file = JsonFile::new(dir, "violations");
        Self {
            counts: Mutex::new(file.load()),
            file,
        }
    }

    /// Bumps the count and returns the new value.
    pub fn increment(&self, user: UserId) -> u32 {
        let mut counts = self.counts.lock();
        let count = counts.entry(user).or_insert(0);
        *count += 1;
        let count = *count;
        self.file.save_or_log(&*counts);
        count
    }

    pub fn count(&self, user: UserId) -> u32 {
        self.counts.lock().get(&user).copied().unwrap_or(0)
    }

    pub fn clear(&self, user: UserId) {
        let mut counts = self.counts.lock();
        if counts.remove(&user).is_some() {
            self.file.save_or_log(&*counts);
        }
    }
}
