pub use self::router::*;

pub mod matcher;
pub mod router;

use futures::FutureExt;

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(e) => {
            log::warn!("Could not intercept TERM signal: {}", e);
            futures::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    futures::future::pending::<()>().await
}

/// Resolves on Ctrl+C, on SIGTERM, or when the exit channel fires or is dropped
pub async fn shutdown_signal(exit_channel: futures::channel::oneshot::Receiver<()>) {
    let mut exit_channel = exit_channel.fuse();

    let mut ctrl_c = Box::pin(tokio::signal::ctrl_c()).fuse();

    let mut term = Box::pin(terminate()).fuse();

    futures::select! {
        c = ctrl_c => log::info!("Received Ctrl+C, exiting: {:?}", c),
        r = exit_channel => log::info!("Received exit signal: {:?}", r),
        _ = term => log::info!("Received terminate signal"),
    }
}

/// Serves the router on an already bound listener until `signal` resolves.
///
/// Each connection gets its own service and each request runs as its own task,
/// the router being shared between all of them.
pub async fn serve<F>(
    builder: hyper::server::Builder<hyper::server::conn::AddrIncoming>,
    router: std::sync::Arc<Router>,
    signal: F,
) -> Result<(), hyper::Error>
where
    F: std::future::Future<Output = ()>,
{
    let make_svc =
        hyper::service::make_service_fn(move |connection: &hyper::server::conn::AddrStream| {
            log::debug!("Got connection from {:?}", connection.remote_addr());

            let router = router.clone();
            async move {
                Ok::<_, std::convert::Infallible>(hyper::service::service_fn(move |req| {
                    let router = router.clone();
                    async move { router.handle(req).await }
                }))
            }
        });

    let server = builder.serve(make_svc);

    log::info!("Server now listening on {:?}", server.local_addr());

    server.with_graceful_shutdown(signal).await
}
