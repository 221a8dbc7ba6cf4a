mod handlers;

pub use self::handlers::{CachingFileServer, GetFileHandler};

fn map_error<T: std::fmt::Display>(e: &T, msg: &str, error_code: u16) -> crate::router::RouterError {
    crate::router::HandlerError(error_code, format!("{}: {}", msg, e))
}

fn get_matcher<T>(method: T) -> Box<dyn crate::router::matcher::Matcher>
where
    hyper::Method: std::convert::TryFrom<T>,
{
    crate::router::matcher::builder()
        .regex_path("^/")
        .with_method(method)
        .build()
        .unwrap()
}

/// `GET` and `HEAD` both go through the cache, `HEAD` answers without a body
pub fn get_file_handlers(
    server: std::sync::Arc<CachingFileServer>,
) -> Vec<Box<dyn crate::router::Handler>> {
    log::info!("Serving files from {:?}", server.root_path());
    vec![
        Box::from(GetFileHandler {
            server: server.clone(),
            matcher: get_matcher(&hyper::Method::GET),
        }),
        Box::from(GetFileHandler {
            server: server.clone(),
            matcher: get_matcher(&hyper::Method::HEAD),
        }),
    ]
}
