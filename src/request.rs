use std::path::{
    Path,
    PathBuf,
};

use percent_encoding::percent_decode_str;

use crate::auth::AuthResult;
use crate::error::RequestError;
use crate::settings::Operation;

/// Match the request target against the `/{filename}` route.
///
/// Returns the raw, still percent-encoded, filename segment. The query string is ignored. A
/// target with no filename or with more than one path segment does not match.
pub fn match_route(url: &str) -> Option<&str> {
    let path = match url.split_once('?') {
        Some((p, _)) => p,
        None => url,
    };
    let segment = path.strip_prefix('/')?;
    if segment.is_empty() || segment.contains('/') {
        return None;
    }
    Some(segment)
}

/// Decode a filename segment and reject anything that could leave the root directory.
pub fn decode_filename(segment: &str) -> Result<String, RequestError> {
    let decoded = match percent_decode_str(segment).decode_utf8() {
        Ok(v) => v.into_owned(),
        Err(_) => {
            return Err(RequestError::bad_request("filename is not valid utf-8"));
        },
    };
    if decoded == "." || decoded == ".." {
        return Err(RequestError::bad_request("invalid filename"));
    }
    if decoded.contains(|c: char| c == '/' || c == '\\' || c == '\0') {
        return Err(RequestError::bad_request("invalid filename"));
    }
    Ok(decoded)
}

/// Per-request state, discarded once the response is written.
#[derive(Debug)]
pub struct RequestContext {
    pub op: Operation,
    pub filename: String,
    pub path: PathBuf,
    pub auth: AuthResult,
}

impl RequestContext {

    /// Bind a validated filename to the root directory.
    pub fn new(op: Operation, root: &Path, filename: String, auth: AuthResult) -> RequestContext {
        let path = root.join(&filename);
        RequestContext {
            op,
            filename,
            path,
            auth,
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.auth.identity.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{
        decode_filename,
        match_route,
        RequestContext,
    };
    use crate::auth::AuthResult;
    use crate::error::ErrorKind;
    use crate::settings::Operation;

    #[test]
    fn test_match_route() {
        assert_eq!(match_route("/foo"), Some("foo"));
        assert_eq!(match_route("/foo?x=1"), Some("foo"));
        assert_eq!(match_route("/"), None);
        assert_eq!(match_route("/a/b"), None);
        assert_eq!(match_route("/../etc/passwd"), None);
        assert_eq!(match_route("foo"), None);
    }

    #[test]
    fn test_decode_filename() {
        assert_eq!(decode_filename("hello%20world.txt").unwrap(), "hello world.txt");
        assert_eq!(decode_filename("..foo").unwrap(), "..foo");

        for bad in ["..", ".", "%2E%2E", "a%2Fb", "a%5Cb", "a%00b", "%FF"] {
            let e = decode_filename(bad).unwrap_err();
            assert_eq!(e.kind, ErrorKind::BadRequest, "{}", bad);
        }
    }

    #[test]
    fn test_context_path() {
        let c = RequestContext::new(
            Operation::Read,
            Path::new("/srv/data"),
            "foo".to_string(),
            AuthResult::default(),
            );
        assert_eq!(c.path, Path::new("/srv/data/foo"));
        assert!(c.identity().is_none());
    }
}
