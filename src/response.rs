use std::fs::File;
use std::io::Read;

use log::{debug, warn};
use tiny_http::{
    Header,
    Request,
    Response,
    ResponseBox,
    StatusCode,
};

use crate::error::RequestError;

/// Result of running a file operation handler.
#[derive(Debug)]
pub enum Outcome {
    /// Read succeeded; the file is streamed back.
    Found(File),
    /// Write or delete succeeded.
    Changed,
    Failed(RequestError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }
}

impl From<Result<File, RequestError>> for Outcome {
    fn from(r: Result<File, RequestError>) -> Outcome {
        match r {
            Ok(f) => Outcome::Found(f),
            Err(e) => Outcome::Failed(e),
        }
    }
}

impl From<Result<(), RequestError>> for Outcome {
    fn from(r: Result<(), RequestError>) -> Outcome {
        match r {
            Ok(_) => Outcome::Changed,
            Err(e) => Outcome::Failed(e),
        }
    }
}

fn with_header<R: Read>(res: Response<R>, field: &str, value: &str) -> Response<R> {
    match Header::from_bytes(field.as_bytes(), value.as_bytes()) {
        Ok(h) => res.with_header(h),
        Err(_) => {
            warn!("dropping invalid header {}: {:?}", field, value);
            res
        },
    }
}

fn server_header<R: Read>(res: Response<R>) -> Response<R> {
    let v = format!("kvdir/{}, tiny_http (Rust)", env!("CARGO_PKG_VERSION"));
    with_header(res, "Server", &v)
}

/// JSON error envelope with the status for the error kind.
pub fn error_response(e: &RequestError) -> ResponseBox {
    let mut res = Response::from_data(e.envelope());
    res = res.with_status_code(e.kind.status());
    res = with_header(res, "Content-Type", "application/json; charset=utf-8");
    server_header(res).boxed()
}

/// 401 carrying the `WWW-Authenticate` challenge.
pub fn challenge_response(challenge: &str) -> ResponseBox {
    let mut res = Response::from_data(RequestError::unauthorized().envelope());
    res = res.with_status_code(StatusCode(401));
    res = with_header(res, "Content-Type", "application/json; charset=utf-8");
    res = with_header(res, "WWW-Authenticate", challenge);
    server_header(res).boxed()
}

/// Answer for a method or path with no registered route.
pub fn no_route_response() -> ResponseBox {
    let mut res = Response::from_data(&b"404 page not found"[..]);
    res = res.with_status_code(StatusCode(404));
    res = with_header(res, "Content-Type", "text/plain");
    server_header(res).boxed()
}

pub fn build(outcome: Outcome) -> ResponseBox {
    match outcome {
        Outcome::Found(f) => {
            let mut res = Response::from_file(f);
            res = res.with_status_code(StatusCode(200));
            res = with_header(res, "Content-Type", "application/octet-stream");
            server_header(res).boxed()
        },
        Outcome::Changed => {
            server_header(Response::empty(StatusCode(204))).boxed()
        },
        Outcome::Failed(e) => {
            error_response(&e)
        },
    }
}

/// Write `res` to the client. A client that went away is only worth a debug line.
pub fn exec_response(req: Request, res: ResponseBox) {
    let status = res.status_code();
    match req.respond(res) {
        Ok(_) => {},
        Err(e) => {
            debug!("cannot write {} response: {}", status.0, e);
        },
    }
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use tempfile::tempdir;

    use super::{
        build,
        challenge_response,
        no_route_response,
        Outcome,
    };
    use crate::error::RequestError;
    use crate::record::fetch;

    fn header(res: &tiny_http::ResponseBox, field: &'static str) -> Option<String> {
        res.headers()
            .iter()
            .find(|h| h.field.equiv(field))
            .map(|h| h.value.as_str().to_string())
    }

    #[test]
    fn test_found() {
        let d = tempdir().unwrap();
        let fp = d.path().join("foo");
        write(&fp, "foobar").unwrap();
        let res = build(Outcome::from(fetch(&fp)));
        assert_eq!(res.status_code().0, 200);
        assert_eq!(res.data_length(), Some(6));
        assert_eq!(header(&res, "Content-Type").unwrap(), "application/octet-stream");
    }

    #[test]
    fn test_changed() {
        let res = build(Outcome::Changed);
        assert_eq!(res.status_code().0, 204);
        assert!(header(&res, "Server").unwrap().starts_with("kvdir/"));
    }

    #[test]
    fn test_failed() {
        let res = build(Outcome::Failed(RequestError::internal("")));
        assert_eq!(res.status_code().0, 500);
        assert_eq!(res.data_length(), Some(r#"{"error":"Internal error"}"#.len()));
        assert!(header(&res, "Content-Type").unwrap().starts_with("application/json"));
    }

    #[test]
    fn test_challenge() {
        let res = challenge_response("Basic realm=\"Protected\"");
        assert_eq!(res.status_code().0, 401);
        assert_eq!(header(&res, "WWW-Authenticate").unwrap(), "Basic realm=\"Protected\"");

        let res = challenge_response("Basic realm=\"say \\\"hi\\\"\"");
        assert_eq!(header(&res, "WWW-Authenticate").unwrap(), "Basic realm=\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_no_route() {
        let res = no_route_response();
        assert_eq!(res.status_code().0, 404);
        assert_eq!(header(&res, "Content-Type").unwrap(), "text/plain");
    }
}
