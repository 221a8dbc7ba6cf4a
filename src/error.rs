/// Failures of the startup and shutdown phases.
///
/// Per-request failures never end up here, they are answered through
/// [crate::router::RouterError] instead.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("could not read the game title from {path:?}: {reason}")]
    MetadataUnavailable {
        path: std::path::PathBuf,
        reason: String,
    },
    #[error("could not back up {path:?} to {backup:?}: {source}")]
    HostsBackupFailed {
        path: std::path::PathBuf,
        backup: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("could not add the temporary record to {path:?}: {source}")]
    HostsInstallFailed {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("could not restore {path:?}, a backup is kept in {backup:?}: {reason}")]
    HostsRestoreFailed {
        path: std::path::PathBuf,
        backup: std::path::PathBuf,
        reason: String,
    },
    #[error("could not listen on {address}: {source}")]
    Bind {
        address: std::net::SocketAddr,
        source: hyper::Error,
    },
    #[error("server stopped on error: {source}")]
    Server { source: hyper::Error },
}
