mod errors;
mod forward;
mod headers;
pub(crate) mod middleware;
pub(crate) mod proxy;
pub(crate) mod state;

use axum::handler::Handler;
use std::future::Future;
use tokio::net::TcpListener;

use self::state::ProxyState;

/// Serves every method and path through the proxy handler until `shutdown` resolves.
pub(crate) async fn serve<F>(listener: TcpListener, state: ProxyState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let make_service = proxy::proxy
        .layer(axum::middleware::from_fn(middleware::metrics))
        .with_state(state)
        .into_make_service();
    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown)
        .await
}
