pub mod resolver;
pub mod static_files;

pub use self::resolver::{resolve, ResolveError, ResolvedPath};
pub use self::static_files::{FileServer, StaticFiles};

/// Decodes a percent-encoded URL path, `None` when the result is not UTF-8
pub fn decode_path(url_path: &str) -> Option<String> {
    percent_encoding::percent_decode_str(url_path)
        .decode_utf8()
        .ok()
        .map(|path| path.into_owned())
}

/// Splits a decoded path into segments, `None` if it would escape the document root
pub fn get_segments(path: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => (),
            ".." => return None,
            segment if segment.contains('\\') => return None,
            segment => segments.push(segment),
        }
    }
    Some(segments)
}

fn join_segments(root: &std::path::Path, segments: &[&str]) -> std::path::PathBuf {
    segments
        .iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}
