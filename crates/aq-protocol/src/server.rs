//! Server-side glue shared by every stage that terminates the RPC surface.

use crate::{RpcAck, RpcData};
use axum::Json;

/// `check-connection` handler: every stage answers the same pong.
///
/// Mount with `axum::routing::post` at [`crate::ROUTE_CHECK_CONNECTION`].
pub async fn check_connection(Json(req): Json<RpcData>) -> Json<RpcAck> {
    Json(RpcAck::pong(&req))
}

/// Bind an ephemeral or configured listener and serve `router` in a task.
///
/// Returns the bound address (useful when binding to port 0 in tests).
pub async fn serve_in_background(
    bind: &str,
    router: axum::Router,
) -> std::io::Result<std::net::SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "rpc server exited");
        }
    });
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RpcClient;
    use crate::ROUTE_CHECK_CONNECTION;
    use axum::routing::post;
    use axum::Router;

    #[tokio::test]
    async fn pong_round_trip_over_http() {
        let router = Router::new().route(ROUTE_CHECK_CONNECTION, post(check_connection));
        let addr = serve_in_background("127.0.0.1:0", router).await.unwrap();

        let client = RpcClient::new(format!("http://{}", addr)).unwrap();
        let sample = client.check_connection().await.unwrap();
        assert_eq!(sample.ack.status, crate::STATUS_PONG);

        let rtt = sample.rtt_seconds().unwrap();
        assert!(rtt >= 0.0, "rtt must be non-negative on one host: {}", rtt);
    }
}
