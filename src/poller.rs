//! Poller: waits on the completion barrier for at most one command
//! timeout, cancelling stragglers on elapse.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::warn;

use crate::client::ClientInner;
use crate::reply::Reply;

/// Wait for every request dispatched so far to settle, or for
/// `command_timeout` to elapse, whichever comes first.
///
/// A zero `command_timeout` disables the timer entirely and waits
/// indefinitely. If nothing is in flight, returns immediately without
/// touching the barrier.
pub(crate) async fn poll(inner: Rc<RefCell<ClientInner>>, command_timeout: Duration) {
    let wait_for_drain = {
        let inner = Rc::clone(&inner);
        async move {
            loop {
                let barrier = inner.borrow().book.barrier();
                if inner.borrow().book.pending_count() == 0 {
                    return;
                }
                barrier.notified().await;
            }
        }
    };

    if command_timeout.is_zero() {
        wait_for_drain.await;
        return;
    }

    if tokio::time::timeout(command_timeout, wait_for_drain).await.is_err() {
        cancel_stragglers(&inner);
    }
}

fn cancel_stragglers(inner: &Rc<RefCell<ClientInner>>) {
    let drained = inner.borrow_mut().book.drain_all();
    if drained.is_empty() {
        return;
    }
    warn!(count = drained.len(), "command_timeout elapsed, cancelling pending requests");
    for (_, record) in drained {
        inner.borrow_mut().health.mark_down(&record.address);
        (record.callback)(Reply::Nil);
    }
}
