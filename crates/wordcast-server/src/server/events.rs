use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::stream;
use std::convert::Infallible;

/// Server-sent event stream of the live stream-client count.
///
/// The first event is the count at connect time; every membership change of
/// the stream audience pushes another.
pub async fn connections_handler(State(state): State<AppState>) -> Response {
    let (handle, outbox) = state.engine.observer_channel();

    let membership = match state.engine.connect_observer(handle) {
        Ok(membership) => membership,
        Err(e) => {
            tracing::warn!("Rejected observer: {}", e);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    // The membership rides along with the stream: when the client goes away
    // hyper drops the body and the observer leaves. Keep-alive comments make
    // that write happen even while the count is quiet.
    let events = stream::unfold((outbox, membership), |(mut outbox, membership)| async move {
        let frame = outbox.next().await?;
        let event = Event::default().data(&*frame);
        Some((Ok::<_, Infallible>(event), (outbox, membership)))
    });

    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(state.config.keep_alive()))
        .into_response()
}
