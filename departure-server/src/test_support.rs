//! Helpers shared by tests that need a real HTTP listener.

use std::net::SocketAddr;

use axum::Router;

/// Serve `app` on an ephemeral localhost port and return its address.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
