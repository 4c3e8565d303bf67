//! Dispatcher: per-request connection acquisition, wire send/recv, and the
//! connection-error-vs-protocol-error classification.

use std::cell::RefCell;
use std::rc::Rc;

use bytes::Bytes;
use tracing::debug;

use crate::client::ClientInner;
use crate::connection::ConnectionCache;
use crate::key::Key;
use crate::reply::Reply;
use crate::request_book::RequestId;

/// Verbs that never forward the routing key as a command argument:
/// `MULTI`/`EXEC` bracket a transaction on whatever connection is already
/// selected and carry no key of their own.
fn takes_no_forwarded_args(verb: &str) -> bool {
    matches!(verb.to_ascii_lowercase().as_str(), "multi" | "exec")
}

pub(crate) fn build_args(verb: &str, key: &Key, rest: Vec<Bytes>) -> Vec<Bytes> {
    if takes_no_forwarded_args(verb) {
        return Vec::new();
    }
    let mut args = Vec::with_capacity(1 + rest.len());
    args.push(key.forwarded());
    args.extend(rest);
    args
}

/// Runs the suspension points of one dispatched request: acquire a
/// connection, send the command, classify the outcome, and invoke the
/// caller's callback exactly once.
///
/// Spawned via `tokio::task::spawn_local` by `dispatch`, so many of these
/// run concurrently within the same `LocalSet`. No `RefCell` borrow of
/// `inner` is ever held across an `.await` point: every await here operates
/// on values already extracted from (and, on return, written back into) a
/// short-lived borrow, so two requests racing on the same connection cannot
/// trigger "already borrowed" panics.
pub(crate) async fn run_request(
    inner: Rc<RefCell<ClientInner>>,
    id: RequestId,
    node: crate::config::NodeName,
    addr: String,
    verb: String,
    args: Vec<Bytes>,
) {
    let cached = inner.borrow_mut().connections.try_get_fresh(&addr);
    let conn = match cached {
        Some(conn) => conn,
        None => {
            let connect_timeout = inner.borrow().connections.connect_timeout();
            match ConnectionCache::open(&addr, connect_timeout).await {
                Ok(conn) => {
                    inner.borrow_mut().connections.insert(addr.clone(), conn.clone());
                    conn
                }
                Err(err) => {
                    debug!(address = %addr, error = %err, "failed to open backend connection");
                    on_connection_error(&inner, id, &node, &addr);
                    return;
                }
            }
        }
    };

    let mut cmd = redis::cmd(&verb);
    for arg in &args {
        cmd.arg(arg.as_ref());
    }

    let mut conn = conn;
    let outcome: Result<redis::Value, redis::RedisError> = cmd.query_async(&mut conn).await;

    match outcome {
        Ok(value) => on_success(&inner, id, &addr, Reply::from(value)),
        Err(err) if err.is_connection_dropped() || err.is_io_error() || err.is_timeout() => {
            debug!(address = %addr, error = %err, "transport error on dispatch");
            on_connection_error(&inner, id, &node, &addr);
        }
        Err(err) => on_success(&inner, id, &addr, Reply::Error(err.to_string())),
    }
}

/// A reply arrived (possibly a protocol-level `-ERR`, which still counts as
/// the backend being reachable and healthy).
fn on_success(inner: &Rc<RefCell<ClientInner>>, id: RequestId, addr: &str, reply: Reply) {
    let settled = {
        let mut inner_mut = inner.borrow_mut();
        match inner_mut.book.take(id) {
            Some(record) => {
                inner_mut.health.mark_up(addr);
                inner_mut.connections.touch(addr);
                Some((record.callback, reply))
            }
            None => {
                // Already cancelled by the Poller; no callback to invoke, but
                // a reply did eventually show up so the backend is alive.
                inner_mut.health.mark_up(addr);
                None
            }
        }
    };
    if let Some((callback, reply)) = settled {
        callback(reply);
    }
}

/// Connection acquisition or send/recv failed at the transport level.
/// Marks the address down, rotates to an alternate if one exists, evicts
/// the dead connection, and resolves the request with `Reply::Nil`.
fn on_connection_error(
    inner: &Rc<RefCell<ClientInner>>,
    id: RequestId,
    node: &crate::config::NodeName,
    addr: &str,
) {
    let settled = {
        let mut inner_mut = inner.borrow_mut();
        inner_mut.health.mark_down(addr);
        inner_mut.connections.evict(addr);
        if inner_mut.registry.has_alternates(node) {
            inner_mut.registry.rotate(node);
        }
        inner_mut.book.take(id).map(|record| record.callback)
    };
    if let Some(callback) = settled {
        callback(Reply::Nil);
    }
}
