//! The routing key a dispatch is hashed on, as distinct from the key
//! actually forwarded to the backend.

use bytes::Bytes;

/// A byte string argument to a command.
pub type Arg = Bytes;

/// What a dispatch is hashed and routed on.
///
/// [`Key::Plain`] hashes and forwards the same bytes. [`Key::Grouped`]
/// hashes on `group`, so every key sharing a group lands on the same node,
/// but forwards only `key` to the backend: useful for co-locating related
/// keys on one shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Plain(Arg),
    Grouped { group: Arg, key: Arg },
}

impl Key {
    pub fn grouped(group: impl Into<Arg>, key: impl Into<Arg>) -> Self {
        Key::Grouped {
            group: group.into(),
            key: key.into(),
        }
    }

    /// The bytes the hash ring sees.
    pub fn hash_bytes(&self) -> &[u8] {
        match self {
            Key::Plain(k) => k,
            Key::Grouped { group, .. } => group,
        }
    }

    /// The bytes forwarded to the backend as the command's key argument.
    pub fn forwarded(&self) -> Bytes {
        match self {
            Key::Plain(k) => k.clone(),
            Key::Grouped { key, .. } => key.clone(),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Plain(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Plain(Bytes::from(s.into_bytes()))
    }
}

impl From<&[u8]> for Key {
    fn from(b: &[u8]) -> Self {
        Key::Plain(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for Key {
    fn from(b: Vec<u8>) -> Self {
        Key::Plain(Bytes::from(b))
    }
}

impl From<Bytes> for Key {
    fn from(b: Bytes) -> Self {
        Key::Plain(b)
    }
}
