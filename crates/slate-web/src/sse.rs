//! Pipeline events to Server-Sent Events.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use slate_rs::pipeline::StreamEvent;
use tokio::sync::mpsc;

/// Forward every event from `rx` as one `data: <json>` frame until the
/// sender side is dropped.
pub fn event_stream(mut rx: mpsc::Receiver<StreamEvent>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Ok(Event::default().data(event.to_json()));
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}
