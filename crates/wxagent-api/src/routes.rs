//! Route table.

use std::convert::Infallible;

use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};
use wxagent_services::{NarrativeGenerator, WeatherSource};

use crate::error::{handle_rejection, BodyTooLarge};
use crate::handlers;
use crate::models::MAX_BODY_BYTES;
use crate::state::AppState;

/// Request body, rejected early when the declared length is over the cap.
/// A missing `Content-Length` is accepted; the handler checks the real size.
fn limited_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and_then(|declared: Option<u64>| async move {
            match declared {
                Some(len) if len > MAX_BODY_BYTES => Err(warp::reject::custom(BodyTooLarge)),
                _ => Ok(()),
            }
        })
        .untuple_one()
        .and(warp::body::bytes())
}

/// All endpoints with CORS, request logging and JSON error replies.
pub fn routes<S, N>(
    state: AppState<S, N>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone
where
    S: WeatherSource + 'static,
    N: NarrativeGenerator + 'static,
{
    let with_state = warp::any().map(move || state.clone());

    // Path before method so unknown paths are 404 rather than 405.
    let root = warp::path::end().and(warp::get()).and_then(handlers::root);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state.clone())
        .and_then(handlers::health::<S, N>);

    let station_info = warp::path("station-info")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state.clone())
        .and_then(handlers::station_info::<S, N>);

    let analyze = warp::path("analyze")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state)
        .and(limited_body())
        .and_then(handlers::analyze::<S, N>);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec![
            "accept",
            "authorization",
            "content-type",
            "origin",
            "x-requested-with",
        ]);

    // The outer recover catches preflights the CORS layer forbids.
    root.or(health)
        .or(station_info)
        .or(analyze)
        .recover(handle_rejection)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::log::custom(|info| {
            tracing::info!(
                method = %info.method(),
                path = info.path(),
                status = info.status().as_u16(),
                elapsed_ms = info.elapsed().as_millis() as u64,
                "request"
            );
        }))
}
