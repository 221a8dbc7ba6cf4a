/// Serves a single decoded URL path from a document root
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FileServer: Sync + Send {
    async fn serve(&self, path: &str) -> hyper::Response<hyper::Body>;
}

/// Plain, case-sensitive file server. Directories are served through their
/// `index.html`, there is no listing.
pub struct StaticFiles {
    root_path: std::path::PathBuf,
}

impl StaticFiles {
    pub fn new<T>(root_path: T) -> StaticFiles
    where
        T: std::convert::Into<std::path::PathBuf>,
    {
        StaticFiles {
            root_path: root_path.into(),
        }
    }

    async fn locate(
        &self,
        path: &str,
    ) -> Result<(std::path::PathBuf, std::fs::Metadata), hyper::StatusCode> {
        let segments = super::get_segments(path).ok_or_else(|| {
            log::warn!("Refusing to serve {} outside of {:?}", path, self.root_path);
            hyper::StatusCode::NOT_FOUND
        })?;
        let file_path = super::join_segments(&self.root_path, &segments);

        let metadata = tokio::fs::metadata(&file_path).await.map_err(map_io_error)?;
        if !metadata.is_dir() {
            return Ok((file_path, metadata));
        }

        let index_path = file_path.join("index.html");
        let metadata = tokio::fs::metadata(&index_path)
            .await
            .map_err(map_io_error)?;
        if metadata.is_dir() {
            return Err(hyper::StatusCode::NOT_FOUND);
        }
        Ok((index_path, metadata))
    }
}

fn map_io_error(e: std::io::Error) -> hyper::StatusCode {
    match e.kind() {
        std::io::ErrorKind::NotFound => hyper::StatusCode::NOT_FOUND,
        std::io::ErrorKind::PermissionDenied => hyper::StatusCode::FORBIDDEN,
        _ => {
            log::warn!("Could not access file: {}", e);
            hyper::StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn get_last_modified(metadata: &std::fs::Metadata) -> Option<String> {
    let modified: chrono::DateTime<chrono::Utc> = metadata.modified().ok()?.into();
    Some(modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

fn get_error_response(status: hyper::StatusCode) -> hyper::Response<hyper::Body> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let mut response = hyper::Response::new(hyper::Body::from(format!(
        "{} {}",
        status.as_u16(),
        reason
    )));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[async_trait::async_trait]
impl FileServer for StaticFiles {
    async fn serve(&self, path: &str) -> hyper::Response<hyper::Body> {
        let (file_path, metadata) = match self.locate(path).await {
            Ok(found) => found,
            Err(status) => return get_error_response(status),
        };

        let data = match tokio::fs::read(&file_path).await {
            Ok(data) => data,
            Err(e) => return get_error_response(map_io_error(e)),
        };

        let mut builder = hyper::Response::builder()
            .status(200)
            .header(
                hyper::header::CONTENT_TYPE,
                mime_guess::from_path(&file_path)
                    .first_or_octet_stream()
                    .to_string(),
            )
            .header(hyper::header::CONTENT_LENGTH, data.len());

        if let Some(last_modified) = get_last_modified(&metadata) {
            builder = builder.header(hyper::header::LAST_MODIFIED, last_modified);
        }

        builder.body(hyper::Body::from(data)).unwrap_or_else(|e| {
            log::error!("Could not build response for {:?}: {}", file_path, e);
            get_error_response(hyper::StatusCode::INTERNAL_SERVER_ERROR)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::FileServer;
    use crate::files::tests::TestDir;

    #[rstest::fixture]
    fn test_dir(#[default("static")] test_name: &str) -> TestDir {
        TestDir::new(&format!("static_files_tests/{}", test_name))
    }

    async fn get_body(response: hyper::Response<hyper::Body>) -> String {
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn it_serves_files(#[with("serves")] test_dir: TestDir) {
        test_dir.write("www/js/main.js", "PluginManager.setup($plugins);");
        let files = super::StaticFiles::new(test_dir.root());

        let response = files.serve("/www/js/main.js").await;

        assert_eq!(200, response.status());
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("javascript"));
        assert_eq!("30", response.headers().get("content-length").unwrap());
        assert!(response.headers().contains_key("last-modified"));
        assert_eq!("PluginManager.setup($plugins);", get_body(response).await);
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn it_answers_404_for_missing_files(#[with("missing")] test_dir: TestDir) {
        let files = super::StaticFiles::new(test_dir.root());

        let response = files.serve("/www/js/main.js").await;

        assert_eq!(404, response.status());
        assert_eq!("404 Not Found", get_body(response).await);
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn it_serves_directory_indexes(#[with("index")] test_dir: TestDir) {
        test_dir.write("www/index.html", "<html></html>");
        test_dir.write("www/data/System.json", "{}");
        let files = super::StaticFiles::new(test_dir.root());

        let response = files.serve("/www/").await;
        assert_eq!(200, response.status());
        assert_eq!(
            "text/html",
            response.headers().get("content-type").unwrap()
        );
        assert_eq!("<html></html>", get_body(response).await);

        let response = files.serve("/www/data").await;
        assert_eq!(404, response.status());
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn it_refuses_parent_segments(#[with("parent")] test_dir: TestDir) {
        test_dir.write("www/index.html", "<html></html>");
        let files = super::StaticFiles::new(test_dir.get_path("www"));

        let response = files.serve("/../www/index.html").await;

        assert_eq!(404, response.status());
    }
}
