use std::fmt;
use std::sync::Arc;

use blake3::Hasher;

/// Content-derived identity of a physical build artifact.
///
/// Independent of task identity: two different tasks (e.g. the same named
/// target reached through two import chains) can map to the same
/// `TargetId`, which is what lets the engine build the artifact only once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(Arc<str>);

impl TargetId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        TargetId(id.into())
    }

    /// Derive an identity by hashing the given parts in order.
    ///
    /// Parts are length-prefixed so `["ab", "c"]` and `["a", "bc"]` hash
    /// differently.
    pub fn from_content<I, B>(parts: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut hasher = Hasher::new();
        for part in parts {
            let bytes = part.as_ref();
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        TargetId::new(hasher.finalize().to_hex().as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        TargetId::new(s)
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        TargetId::new(s)
    }
}
