pub mod cache;
pub mod configuration;
pub mod error;
pub mod files;
pub mod handlers;
pub mod hosts;
pub mod metadata;
pub mod router;

pub use self::error::ServeError;

fn get_socketaddr(options: &configuration::Options) -> std::net::SocketAddr {
    std::net::SocketAddr::from(([0, 0, 0, 0], options.port))
}

async fn listen(
    options: &configuration::Options,
    hostname: &str,
    server: std::sync::Arc<handlers::files::CachingFileServer>,
    exit_channel: Option<futures::channel::oneshot::Receiver<()>>,
) -> Result<(), ServeError> {
    let address = get_socketaddr(options);
    let builder = hyper::Server::try_bind(&address)
        .map_err(|source| ServeError::Bind { address, source })?;

    let mut router = router::Router::new();
    router.add_handlers(handlers::files::get_file_handlers(server));
    let router = std::sync::Arc::new(router);

    // without a receiver from the caller, only signals stop the server
    let (_exit_sender, exit_receiver) = match exit_channel {
        Some(receiver) => (None, receiver),
        None => {
            let (sender, receiver) = futures::channel::oneshot::channel::<()>();
            (Some(sender), receiver)
        }
    };

    println!(
        "Starting server - - - http://{}:{}/www/index.html",
        hostname, options.port
    );

    let served = router::serve(builder, router, router::shutdown_signal(exit_receiver)).await;

    log::info!("Exiting");
    get_served(served)
}

fn get_served(served: Result<(), hyper::Error>) -> Result<(), ServeError> {
    served.map_err(|source| {
        log::error!("server error: {}", source);
        ServeError::Server { source }
    })
}

/// Serves `configuration.game.directory` until interrupted.
///
/// The hosts record is installed before the listener binds and removed once it
/// has stopped, whatever happened in between. The cache statistics are printed
/// on the way out and returned.
pub async fn serve(
    configuration: &configuration::ServeConfiguration,
    exit_channel: Option<futures::channel::oneshot::Receiver<()>>,
) -> Result<cache::CacheStats, ServeError> {
    let options = &configuration.game;

    let hostname = metadata::get_hostname(options)?;

    let transaction = hosts::HostsFileTransaction::open(&configuration.hosts.path, &hostname)?;

    let server = std::sync::Arc::new(handlers::files::CachingFileServer::new(
        &options.directory,
    ));

    let served = listen(options, &hostname, server.clone(), exit_channel).await;

    let stats = server.cache().stats();
    if let Some(report) = stats.report() {
        println!("{}", report);
    }

    match (served, transaction.close()) {
        (Ok(()), Ok(())) => Ok(stats),
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Err(e), Err(restore_error)) => {
            log::error!("{}", restore_error);
            Err(e)
        }
    }
}
