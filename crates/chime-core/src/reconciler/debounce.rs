use std::time::Duration;

use futures::{Stream, StreamExt};

/// Trailing-edge debounce: emits one tick once `quiet` has elapsed without
/// a new upstream item. A burst cut short by the upstream ending still emits
/// its tick before the stream finishes.
pub fn debounce<S>(mut upstream: S, quiet: Duration) -> impl Stream<Item = ()> + Send
where
    S: Stream<Item = ()> + Unpin + Send + 'static,
{
    async_stream::stream! {
        while upstream.next().await.is_some() {
            let mut upstream_done = false;
            loop {
                tokio::select! {
                    next = upstream.next() => {
                        if next.is_none() {
                            upstream_done = true;
                            break;
                        }
                    }
                    _ = tokio::time::sleep(quiet) => break,
                }
            }
            yield ();
            if upstream_done {
                break;
            }
        }
    }
}
