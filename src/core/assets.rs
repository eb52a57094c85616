//! Static Asset Resolution
//!
//! Maps preview request paths onto files under the base directory. Every
//! resolved path is confined to that directory.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Why a request path could not be served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Path escapes the base directory or could not be normalized
    #[error("forbidden")]
    Forbidden,
    /// Path is inside the base directory but is not a regular file
    #[error("not found")]
    NotFound,
}

/// A request path resolved to a file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub path: PathBuf,
    pub content_type: &'static str,
}

/// Resolve `request_path` against `base_dir`.
///
/// The query string is dropped, an empty path becomes `/index.html`, and the
/// result must stay inside `base_dir` after `.`/`..` segments are collapsed.
pub fn resolve(base_dir: &Path, request_path: &str) -> Result<ResolvedAsset, ResolveError> {
    let clean = request_path.split('?').next().unwrap_or_default();
    let clean = if clean.is_empty() { "/index.html" } else { clean };

    let decoded = percent_decode(clean).ok_or(ResolveError::Forbidden)?;
    if decoded.contains('\0') {
        return Err(ResolveError::Forbidden);
    }
    let relative = decoded.strip_prefix('/').unwrap_or(&decoded);

    let root = std::path::absolute(base_dir)
        .map(|p| normalize(&p))
        .map_err(|_| ResolveError::Forbidden)?;
    let candidate = normalize(&root.join(relative));

    // Component-wise, so "/site-other" never passes for "/site"
    if !candidate.starts_with(&root) {
        return Err(ResolveError::Forbidden);
    }

    match std::fs::metadata(&candidate) {
        Ok(meta) if meta.is_file() => Ok(ResolvedAsset {
            content_type: mime_from_extension(&candidate),
            path: candidate,
        }),
        _ => Err(ResolveError::NotFound),
    }
}

/// Collapse `.` and `..` without touching the filesystem.
///
/// `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Decode `%XX` escapes. Malformed escapes are kept literally; `None` when the
/// decoded bytes are not UTF-8.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escaped = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = escaped {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).ok()
}

/// Guess a content type from the file extension
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("wasm") => "application/wasm",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css/style.css"), "body {}").unwrap();
        fs::write(dir.path().join("index.html"), "<p>index</p>").unwrap();
        fs::write(dir.path().join("my image.png"), [0x89, b'P', b'N', b'G']).unwrap();
        dir
    }

    #[test]
    fn resolves_file_inside_base() {
        let dir = site();
        let asset = resolve(dir.path(), "/css/style.css").expect("resolve");
        assert!(asset.path.ends_with("css/style.css"));
        assert_eq!(asset.content_type, "text/css; charset=utf-8");
    }

    #[test]
    fn query_string_is_ignored() {
        let dir = site();
        let asset = resolve(dir.path(), "/css/style.css?v=3").expect("resolve");
        assert!(asset.path.ends_with("css/style.css"));
    }

    #[test]
    fn empty_path_falls_back_to_index() {
        let dir = site();
        let asset = resolve(dir.path(), "").expect("resolve");
        assert!(asset.path.ends_with("index.html"));

        let asset = resolve(dir.path(), "?t=1").expect("resolve");
        assert!(asset.path.ends_with("index.html"));
    }

    #[test]
    fn traversal_is_forbidden() {
        let dir = site();
        for path in [
            "/../../etc/passwd",
            "/../secret.txt",
            "/css/../../outside.html",
            "/%2e%2e/%2e%2e/etc/passwd",
            "/css/%2E%2E/%2e%2e/x",
            "//etc/passwd",
        ] {
            assert_eq!(
                resolve(dir.path(), path),
                Err(ResolveError::Forbidden),
                "{path} should be forbidden"
            );
        }
    }

    #[test]
    fn dot_segments_that_stay_inside_are_allowed() {
        let dir = site();
        let asset = resolve(dir.path(), "/css/./../css/style.css").expect("resolve");
        assert!(asset.path.ends_with("css/style.css"));
    }

    #[test]
    fn sibling_directory_with_shared_prefix_is_forbidden() {
        let parent = tempfile::tempdir().unwrap();
        let base = parent.path().join("site");
        let sibling = parent.path().join("site-other");
        fs::create_dir_all(&base).unwrap();
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("leak.txt"), "secret").unwrap();

        assert_eq!(
            resolve(&base, "/../site-other/leak.txt"),
            Err(ResolveError::Forbidden)
        );
    }

    #[test]
    fn missing_file_and_directory_are_not_found() {
        let dir = site();
        assert_eq!(resolve(dir.path(), "/nope.js"), Err(ResolveError::NotFound));
        assert_eq!(resolve(dir.path(), "/css"), Err(ResolveError::NotFound));
        assert_eq!(resolve(dir.path(), "/css/"), Err(ResolveError::NotFound));
    }

    #[test]
    fn percent_encoded_names_are_decoded() {
        let dir = site();
        let asset = resolve(dir.path(), "/my%20image.png").expect("resolve");
        assert!(asset.path.ends_with("my image.png"));
        assert_eq!(asset.content_type, "image/png");
    }

    #[test]
    fn undecodable_or_nul_paths_are_forbidden() {
        let dir = site();
        assert_eq!(resolve(dir.path(), "/%ff%fe.html"), Err(ResolveError::Forbidden));
        assert_eq!(resolve(dir.path(), "/index.html%00.png"), Err(ResolveError::Forbidden));
    }

    #[test]
    fn malformed_escapes_are_kept_literally() {
        assert_eq!(percent_decode("/100%.html").as_deref(), Some("/100%.html"));
        assert_eq!(percent_decode("/a%2").as_deref(), Some("/a%2"));
        assert_eq!(percent_decode("/a%zz").as_deref(), Some("/a%zz"));
    }

    #[test]
    fn normalize_collapses_segments() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../../etc")), PathBuf::from("/etc"));
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        assert_eq!(mime_from_extension(Path::new("blob.xyz")), "application/octet-stream");
        assert_eq!(mime_from_extension(Path::new("noext")), "application/octet-stream");
        assert_eq!(mime_from_extension(Path::new("PAGE.HTML")), "text/html; charset=utf-8");
    }
}
