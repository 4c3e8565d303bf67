//! The polymorphic reply value handed to every dispatch callback.

/// A backend reply, shaped the way the wire protocol shapes it rather than
/// any particular command's semantics. The dispatcher never interprets
/// these; it only converts and forwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// No value (key missing, or a cancelled/refused request).
    Nil,
    /// A signed integer reply (`INCR`, `EXISTS`, ...).
    Integer(i64),
    /// A bulk string reply, kept as raw bytes.
    Bulk(Vec<u8>),
    /// An ordered sequence of replies (`MGET`, `LRANGE`, ...).
    Array(Vec<Reply>),
    /// A `-ERR ...`-style application error, surfaced verbatim.
    Error(String),
}

impl Reply {
    /// True for everything except [`Reply::Nil`].
    pub fn is_some(&self) -> bool {
        !matches!(self, Reply::Nil)
    }

    /// Borrow the bulk bytes, if this is a [`Reply::Bulk`].
    pub fn as_bulk(&self) -> Option<&[u8]> {
        match self {
            Reply::Bulk(b) => Some(b),
            _ => None,
        }
    }

    /// Borrow the reply as a UTF-8 string, if it is bulk and valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bulk().and_then(|b| std::str::from_utf8(b).ok())
    }
}

impl From<redis::Value> for Reply {
    fn from(value: redis::Value) -> Self {
        match value {
            redis::Value::Nil => Reply::Nil,
            redis::Value::Int(i) => Reply::Integer(i),
            redis::Value::BulkString(bytes) => Reply::Bulk(bytes),
            redis::Value::SimpleString(s) => Reply::Bulk(s.into_bytes()),
            redis::Value::Okay => Reply::Bulk(b"OK".to_vec()),
            redis::Value::Boolean(b) => Reply::Integer(i64::from(b)),
            redis::Value::Double(d) => Reply::Bulk(d.to_string().into_bytes()),
            redis::Value::BigNumber(n) => Reply::Bulk(n.to_string().into_bytes()),
            redis::Value::VerbatimString { text, .. } => Reply::Bulk(text.into_bytes()),
            redis::Value::Array(items) | redis::Value::Set(items) => {
                Reply::Array(items.into_iter().map(Reply::from).collect())
            }
            redis::Value::Map(pairs) => Reply::Array(
                pairs
                    .into_iter()
                    .flat_map(|(k, v)| [Reply::from(k), Reply::from(v)])
                    .collect(),
            ),
            redis::Value::Attribute { data, .. } => Reply::from(*data),
            redis::Value::Push { kind, data } => {
                let mut items: Vec<Reply> = vec![Reply::Bulk(format!("{kind:?}").into_bytes())];
                items.extend(data.into_iter().map(Reply::from));
                Reply::Array(items)
            }
            redis::Value::ServerError(e) => Reply::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_round_trips() {
        assert_eq!(Reply::from(redis::Value::Nil), Reply::Nil);
    }

    #[test]
    fn integer_round_trips() {
        assert_eq!(Reply::from(redis::Value::Int(42)), Reply::Integer(42));
    }

    #[test]
    fn bulk_string_round_trips() {
        let v = redis::Value::BulkString(b"bar1".to_vec());
        assert_eq!(Reply::from(v), Reply::Bulk(b"bar1".to_vec()));
    }

    #[test]
    fn nested_array_round_trips() {
        let v = redis::Value::Array(vec![
            redis::Value::BulkString(b"a".to_vec()),
            redis::Value::Int(1),
            redis::Value::Nil,
        ]);
        assert_eq!(
            Reply::from(v),
            Reply::Array(vec![
                Reply::Bulk(b"a".to_vec()),
                Reply::Integer(1),
                Reply::Nil,
            ])
        );
    }

    #[test]
    fn is_some_is_false_only_for_nil() {
        assert!(!Reply::Nil.is_some());
        assert!(Reply::Integer(0).is_some());
        assert!(Reply::Bulk(vec![]).is_some());
    }
}
