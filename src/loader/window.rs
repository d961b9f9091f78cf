//! The batching window.

use std::future::Future;
use std::pin::{pin, Pin};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::task::{waker, ArcWake, AtomicWaker};

/// Completes once the scheduler has finished the current poll of the task.
///
/// A batch future is shared by every caller of the window, and each of
/// them polls it during the same pass; `yield_now` alone would complete on
/// the second of those polls. Here the yield is registered with a private
/// waker, and only its deferred wake-up ends the window.
#[derive(Default)]
pub(crate) struct NextTurn {
    flag: Option<Arc<TurnFlag>>,
}

#[derive(Default)]
struct TurnFlag {
    turned: AtomicBool,
    waker: AtomicWaker,
}

impl ArcWake for TurnFlag {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.turned.store(true, Ordering::Release);
        arc_self.waker.wake();
    }
}

impl Future for NextTurn {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if let Some(flag) = &self.flag {
            flag.waker.register(cx.waker());
            return if flag.turned.load(Ordering::Acquire) {
                Poll::Ready(())
            } else {
                Poll::Pending
            };
        }

        let flag = Arc::new(TurnFlag::default());
        flag.waker.register(cx.waker());

        let turn_waker = waker(Arc::clone(&flag));
        let mut yield_now = pin!(tokio::task::yield_now());
        if yield_now
            .as_mut()
            .poll(&mut Context::from_waker(&turn_waker))
            .is_ready()
        {
            return Poll::Ready(());
        }

        self.flag = Some(flag);
        Poll::Pending
    }
}
