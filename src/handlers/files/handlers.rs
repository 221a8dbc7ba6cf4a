use crate::cache::{CacheEntry, ResponseCache};
use crate::files::{FileServer, ResolveError};

/// Static file server answering from memory once a path has been seen.
///
/// A path missing with its exact casing is looked up case-insensitively, and
/// whatever comes out, 404 included, is cached under the path as requested.
pub struct CachingFileServer {
    root_path: std::path::PathBuf,
    files: Box<dyn FileServer>,
    cache: ResponseCache,
}

/// Handler that takes care of GET and HEAD requests
pub struct GetFileHandler {
    pub server: std::sync::Arc<CachingFileServer>,
    pub matcher: Box<dyn crate::router::matcher::Matcher>,
}

impl CachingFileServer {
    pub fn new<T>(root_path: T) -> CachingFileServer
    where
        T: std::convert::Into<std::path::PathBuf>,
    {
        let root_path = root_path.into();
        let files = Box::new(crate::files::StaticFiles::new(root_path.clone()));
        CachingFileServer::with_file_server(root_path, files)
    }

    pub fn with_file_server<T>(root_path: T, files: Box<dyn FileServer>) -> CachingFileServer
    where
        T: std::convert::Into<std::path::PathBuf>,
    {
        CachingFileServer {
            root_path: root_path.into(),
            files,
            cache: ResponseCache::new(),
        }
    }

    pub fn root_path(&self) -> &std::path::Path {
        &self.root_path
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Returns the response for a raw URL path, from the cache when possible
    pub async fn get(
        &self,
        url_path: &str,
    ) -> Result<std::sync::Arc<CacheEntry>, crate::router::RouterError> {
        if let Some(entry) = self.cache.get(url_path) {
            if entry.is_not_found() {
                log::warn!("Not found: {}", url_path);
            }
            return Ok(entry);
        }

        log::info!("Cache miss: {}", url_path);

        let path = crate::files::decode_path(url_path).ok_or_else(|| {
            crate::router::InvalidRequest(format!("Invalid path {}", url_path))
        })?;

        let mut entry = self.fetch(&path).await?;

        if entry.is_not_found() {
            let root_path = self.root_path.clone();
            let lookup = path.clone();
            let resolved =
                tokio::task::spawn_blocking(move || crate::files::resolve(&lookup, &root_path))
                    .await
                    .map_err(|e| super::map_error(&e, "Could not resolve path", 500))?;
            match resolved {
                Ok(resolved) if resolved.url_path != path => {
                    log::info!("Falling back from {} to {}", url_path, resolved.url_path);
                    entry = self.fetch(&resolved.url_path).await?;
                }
                Ok(_) => (),
                Err(ResolveError::Ambiguous(matches)) => {
                    log::warn!("Ambiguous path {}, candidates: {:?}", url_path, matches);
                }
                Err(ResolveError::NotFound) => (),
            }
        }

        if entry.is_not_found() {
            log::warn!("Not found: {}", url_path);
        }

        Ok(self.cache.insert(url_path, entry))
    }

    async fn fetch(&self, path: &str) -> Result<CacheEntry, crate::router::RouterError> {
        let response = self.files.serve(path).await;
        CacheEntry::capture(response)
            .await
            .map_err(|e| super::map_error(&e, "Could not read file", 500))
    }
}

#[async_trait::async_trait]
impl crate::router::Handler for GetFileHandler {
    fn get_matcher(&self) -> &Box<dyn crate::router::matcher::Matcher> {
        &self.matcher
    }

    async fn handle(
        &self,
        request: hyper::Request<hyper::Body>,
    ) -> Result<hyper::Response<hyper::Body>, crate::router::RouterError> {
        let url_path = request.uri().path().to_owned();
        let entry = self.server.get(&url_path).await?;

        let map_write_error = |e: http::Error| {
            log::error!("Could not write response for {}: {}", url_path, e);
            super::map_error(&e, "Could not write response", 500)
        };

        if request.method() == hyper::Method::HEAD {
            return entry.to_response(false).map_err(map_write_error);
        }

        let (sender, body) = hyper::Body::channel();
        let response = entry
            .to_response_with_body(body)
            .map_err(map_write_error)?;
        tokio::spawn(write_body(sender, entry, url_path));
        Ok(response)
    }
}

/// Streams a cached body to the client.
///
/// The status line and headers have already left when this fails: the body is
/// aborted so the client sees a truncated response instead of a complete one.
pub async fn write_body(
    mut sender: hyper::body::Sender,
    entry: std::sync::Arc<CacheEntry>,
    url_path: String,
) -> Result<(), hyper::Error> {
    if entry.body.is_empty() {
        return Ok(());
    }
    if let Err(e) = sender.send_data(entry.body.clone()).await {
        log::error!("Could not write response for {}: {}", url_path, e);
        sender.abort();
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::files::tests::TestDir;
    use crate::router::Handler;
    use test_log::test;

    #[rstest::fixture]
    fn test_dir(#[default("test")] test_name: &str) -> TestDir {
        TestDir::new(&format!("file_handlers_tests/{}", test_name))
    }

    fn get_request(uri: &str, method: &hyper::Method) -> hyper::Request<hyper::Body> {
        hyper::Request::builder()
            .uri(uri)
            .method(method)
            .body(hyper::Body::empty())
            .unwrap()
    }

    fn get_handler(server: std::sync::Arc<super::CachingFileServer>) -> super::GetFileHandler {
        super::GetFileHandler {
            server,
            matcher: crate::handlers::files::get_matcher(&hyper::Method::GET),
        }
    }

    async fn get(
        handler: &super::GetFileHandler,
        uri: &str,
    ) -> (http::response::Parts, hyper::body::Bytes) {
        let response = handler
            .handle(get_request(uri, &hyper::Method::GET))
            .await
            .unwrap();
        let (parts, body) = response.into_parts();
        (parts, hyper::body::to_bytes(body).await.unwrap())
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn it_serves_exact_paths_from_cache(#[with("exact")] test_dir: TestDir) {
        test_dir.write("index.html", "<html>exact</html>");
        let server = std::sync::Arc::new(super::CachingFileServer::new(test_dir.root()));
        let handler = get_handler(server.clone());

        let (first_parts, first_body) = get(&handler, "/index.html").await;
        assert_eq!(200, first_parts.status);
        assert_eq!("<html>exact</html>", first_body);
        assert_eq!(1, server.cache().len());

        std::fs::remove_file(test_dir.get_path("index.html")).unwrap();

        let (second_parts, second_body) = get(&handler, "/index.html").await;
        assert_eq!(first_parts.status, second_parts.status);
        assert_eq!(first_parts.headers, second_parts.headers);
        assert_eq!(first_body, second_body);

        assert_eq!(
            crate::cache::CacheStats { hits: 1, misses: 1 },
            server.cache().stats()
        );
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    #[rstest::rstest]
    #[tokio::test]
    async fn it_falls_back_to_other_casings(#[with("casing")] test_dir: TestDir) {
        test_dir.write("Index.HTML", "<html>folded</html>");
        let server = std::sync::Arc::new(super::CachingFileServer::new(test_dir.root()));
        let handler = get_handler(server.clone());

        let (parts, body) = get(&handler, "/index.html").await;

        assert_eq!(200, parts.status);
        assert_eq!("<html>folded</html>", body);
        assert!(server.cache().get("/index.html").is_some());
        assert!(server.cache().get("/Index.HTML").is_none());
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    #[rstest::rstest]
    #[tokio::test]
    async fn it_prefers_exact_paths(#[with("prefers_exact")] test_dir: TestDir) {
        test_dir.write("a.txt", "lower");
        test_dir.write("A.txt", "upper");
        let server = std::sync::Arc::new(super::CachingFileServer::new(test_dir.root()));
        let handler = get_handler(server);

        let (parts, body) = get(&handler, "/a.txt").await;

        assert_eq!(200, parts.status);
        assert_eq!("lower", body);
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    #[rstest::rstest]
    #[tokio::test]
    async fn it_answers_404_when_ambiguous(#[with("ambiguous")] test_dir: TestDir) {
        test_dir.write("www/img/Actor1.png", "upper");
        test_dir.write("www/img/ACTOR1.png", "shouting");
        let server = std::sync::Arc::new(super::CachingFileServer::new(test_dir.root()));
        let handler = get_handler(server);

        let (parts, _) = get(&handler, "/www/img/actor1.png").await;

        assert_eq!(404, parts.status);
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn it_caches_missing_paths(#[with("missing")] test_dir: TestDir) {
        let server = std::sync::Arc::new(super::CachingFileServer::new(test_dir.root()));
        let handler = get_handler(server.clone());

        let (parts, _) = get(&handler, "/www/audio/bgm/Theme1.ogg").await;
        assert_eq!(404, parts.status);

        test_dir.write("www/audio/bgm/Theme1.ogg", "ogg");

        let (parts, _) = get(&handler, "/www/audio/bgm/Theme1.ogg").await;
        assert_eq!(404, parts.status);
        assert!(server
            .cache()
            .get("/www/audio/bgm/Theme1.ogg")
            .unwrap()
            .is_not_found());
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn it_decodes_request_paths(#[with("decodes")] test_dir: TestDir) {
        test_dir.write("www/img/faces/Actor1 Face.png", "face");
        let server = std::sync::Arc::new(super::CachingFileServer::new(test_dir.root()));
        let handler = get_handler(server.clone());

        let (parts, body) = get(&handler, "/www/img/faces/Actor1%20Face.png").await;

        assert_eq!(200, parts.status);
        assert_eq!("face", body);
        assert!(server
            .cache()
            .get("/www/img/faces/Actor1%20Face.png")
            .is_some());
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn it_answers_head_without_body(#[with("head")] test_dir: TestDir) {
        test_dir.write("www/index.html", "<html></html>");
        let server = std::sync::Arc::new(super::CachingFileServer::new(test_dir.root()));
        let handler = get_handler(server);

        let response = handler
            .handle(get_request("/www/index.html", &hyper::Method::HEAD))
            .await
            .unwrap();
        let (parts, body) = response.into_parts();

        assert_eq!(200, parts.status);
        assert_eq!("13", parts.headers.get("content-length").unwrap());
        assert!(hyper::body::to_bytes(body).await.unwrap().is_empty());
    }

    #[test(tokio::test)]
    async fn it_only_fetches_once() {
        let mut files = crate::files::static_files::MockFileServer::new();
        files
            .expect_serve()
            .withf(|path: &str| path == "/www/js/rpg_core.js")
            .times(1)
            .returning(|_| {
                hyper::Response::builder()
                    .status(200)
                    .header("content-type", "application/javascript")
                    .body(hyper::Body::from("function Bitmap() {}"))
                    .unwrap()
            });

        let server = super::CachingFileServer::with_file_server("unused", Box::new(files));

        for _ in 0..3 {
            let entry = server.get("/www/js/rpg_core.js").await.unwrap();
            assert_eq!(200, entry.status);
            assert_eq!("function Bitmap() {}", entry.body);
        }

        assert_eq!(
            crate::cache::CacheStats { hits: 2, misses: 1 },
            server.cache().stats()
        );
    }

    #[test(tokio::test)]
    async fn it_reports_bodies_the_client_did_not_receive() {
        let (sender, body) = hyper::Body::channel();
        drop(body);
        let entry = std::sync::Arc::new(crate::cache::CacheEntry {
            status: hyper::StatusCode::OK,
            headers: hyper::HeaderMap::new(),
            body: hyper::body::Bytes::from_static(b"<html></html>"),
        });

        let result = super::write_body(sender, entry, String::from("/www/index.html")).await;

        assert!(result.is_err());
    }

    #[test(tokio::test)]
    async fn it_writes_bodies_to_the_client() {
        let (sender, body) = hyper::Body::channel();
        let entry = std::sync::Arc::new(crate::cache::CacheEntry {
            status: hyper::StatusCode::OK,
            headers: hyper::HeaderMap::new(),
            body: hyper::body::Bytes::from_static(b"<html></html>"),
        });

        let writer = tokio::spawn(super::write_body(
            sender,
            entry,
            String::from("/www/index.html"),
        ));

        assert_eq!("<html></html>", hyper::body::to_bytes(body).await.unwrap());
        assert!(writer.await.unwrap().is_ok());
    }

    #[test(tokio::test)]
    async fn it_refuses_undecodable_paths() {
        let files = crate::files::static_files::MockFileServer::new();
        let server = super::CachingFileServer::with_file_server("unused", Box::new(files));

        assert_eq!(
            Err(crate::router::InvalidRequest(String::from(
                "Invalid path /www/%FF.png"
            ))),
            server.get("/www/%FF.png").await.map(|_| ())
        );
        assert!(server.cache().is_empty());
    }
}
