/// Filesystems where case folding already happens.
const CASE_INSENSITIVE_FS: bool = cfg!(any(windows, target_os = "macos"));

/// A request path found on disk, possibly under another casing
#[derive(Debug, PartialEq)]
pub struct ResolvedPath {
    pub file_path: std::path::PathBuf,
    /// Decoded URL path of the match, relative to the document root
    pub url_path: String,
}

#[derive(Debug, PartialEq)]
pub enum ResolveError {
    NotFound,
    Ambiguous(Vec<std::path::PathBuf>),
}

/// Rewrites every letter into a `[lL]` class, other characters match literally
pub fn case_insensitive_pattern(name: &str) -> String {
    let mut pattern = String::with_capacity(name.len() * 4);
    for c in name.chars() {
        if CASE_INSENSITIVE_FS || !c.is_alphabetic() {
            pattern.push_str(&escape_char(c));
            continue;
        }
        let lower: String = c.to_lowercase().collect();
        let upper: String = c.to_uppercase().collect();
        if lower == upper || lower.chars().count() != 1 || upper.chars().count() != 1 {
            pattern.push_str(&escape_char(c));
        } else {
            pattern.push('[');
            pattern.push_str(&lower);
            pattern.push_str(&upper);
            pattern.push(']');
        }
    }
    pattern
}

fn escape_char(c: char) -> String {
    glob::Pattern::escape(c.encode_utf8(&mut [0; 4]))
}

/// Finds `request_path` under `root`, first verbatim then case-insensitively.
///
/// Only the leaf is folded, the parent directories must exist as written, and
/// a folded match is only used when it is the only one.
pub fn resolve(request_path: &str, root: &std::path::Path) -> Result<ResolvedPath, ResolveError> {
    let segments = super::get_segments(request_path).ok_or(ResolveError::NotFound)?;
    let (leaf, parents) = segments.split_last().ok_or(ResolveError::NotFound)?;

    let file_path = super::join_segments(root, &segments);
    if file_path.exists() {
        return Ok(ResolvedPath {
            file_path,
            url_path: get_url_path(parents, leaf),
        });
    }

    let parent = super::join_segments(root, parents);
    let parent = parent.to_str().ok_or(ResolveError::NotFound)?;
    let pattern = std::path::Path::new(&glob::Pattern::escape(parent))
        .join(case_insensitive_pattern(leaf));

    let paths = glob::glob(&pattern.to_string_lossy()).map_err(|e| {
        log::warn!("Invalid pattern {:?}: {}", pattern, e);
        ResolveError::NotFound
    })?;

    let mut matches: Vec<std::path::PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::debug!("Ignored entry: {}", e);
                None
            }
        })
        .collect();

    match matches.len() {
        0 => Err(ResolveError::NotFound),
        1 => {
            let file_path = matches.remove(0);
            let name = file_path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or(ResolveError::NotFound)?
                .to_owned();
            log::debug!("Resolved {} to {:?}", request_path, file_path);
            Ok(ResolvedPath {
                url_path: get_url_path(parents, &name),
                file_path,
            })
        }
        _ => Err(ResolveError::Ambiguous(matches)),
    }
}

fn get_url_path(parents: &[&str], leaf: &str) -> String {
    let mut url_path = String::new();
    for segment in parents.iter().chain(std::iter::once(&leaf)) {
        url_path.push('/');
        url_path.push_str(segment);
    }
    url_path
}
