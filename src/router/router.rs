use super::matcher::MatcherResult;

pub use self::RouterError::*;

#[async_trait::async_trait]
pub trait Handler: Sync + Send {
    fn get_matcher(&self) -> &Box<dyn super::matcher::Matcher>;
    async fn handle(
        &self,
        request: hyper::Request<hyper::Body>,
    ) -> Result<hyper::Response<hyper::Body>, RouterError>;
}

#[derive(Debug, PartialEq)]
pub enum RouterError {
    HandlerError(u16, String),
    InvalidRequest(String),
    MethodNotAllowed,
    NotFound,
}

pub struct Router {
    handlers: Vec<Box<dyn Handler>>,
}

impl Router {
    pub fn new() -> Router {
        Router {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn Handler>) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    pub fn add_handlers<T>(&mut self, handlers: T) -> &mut Self
    where
        T: IntoIterator<Item = Box<dyn Handler>>,
    {
        for handler in handlers {
            self.handlers.push(handler);
        }
        self
    }

    async fn handle_inner(
        &self,
        request: hyper::Request<hyper::Body>,
    ) -> Result<hyper::Response<hyper::Body>, RouterError> {
        let handler = self.get_handler(&request)?;
        handler.handle(request).await
    }

    pub async fn handle(
        &self,
        request: hyper::Request<hyper::Body>,
    ) -> Result<hyper::Response<hyper::Body>, std::convert::Infallible> {
        Ok(self
            .handle_inner(request)
            .await
            .unwrap_or_else(|err| Router::error(err)))
    }

    fn get_handler(
        &self,
        request: &hyper::Request<hyper::Body>,
    ) -> Result<&Box<dyn Handler>, RouterError> {
        log::debug!("{:?} {:?}", request.method(), request.uri());
        log::trace!("Headers: {:?}", request.headers());
        let mut server_error = RouterError::NotFound;
        for handler in self.handlers.iter() {
            match handler.get_matcher().matches(request) {
                MatcherResult::OK => return Ok(handler),
                MatcherResult::UriOnly => server_error = RouterError::MethodNotAllowed,
                MatcherResult::KO => (),
            }
        }
        Err(server_error)
    }

    fn error(error: RouterError) -> hyper::Response<hyper::Body> {
        log::info!("Sending error response {:?}", &error);
        let status = match &error {
            RouterError::HandlerError(status, _) => *status,
            RouterError::InvalidRequest(_) => 400,
            RouterError::MethodNotAllowed => 405,
            RouterError::NotFound => 404,
        };
        let body = match error {
            RouterError::HandlerError(_, msg) => msg,
            RouterError::InvalidRequest(msg) => msg,
            RouterError::MethodNotAllowed => String::from("Method Not Allowed"),
            RouterError::NotFound => String::from("Not Found"),
        };
        hyper::Response::builder()
            .status(status)
            .header("content-type", "text/plain")
            .body(hyper::Body::from(body))
            .unwrap_or_else(|e| {
                log::error!("Could not build the error response: {}", e);
                let mut response = hyper::Response::new(hyper::Body::empty());
                *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
                response
            })
    }
}
