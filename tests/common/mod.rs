#![allow(dead_code)]

use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread::{
    self,
    JoinHandle,
};

use kvdir::router::Router;
use kvdir::server::{
    Server,
    ShutdownHandle,
};

pub const AUTH_OK: &str = "Basic dGVzdDp0ZXN0";
pub const AUTH_BAD: &str = "Basic dGVzdDp3cm9uZw==";

pub struct TestServer {
    pub base: String,
    handle: ShutdownHandle,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn start(router: Router) -> TestServer {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let srv = Server::http(addr, router).unwrap();
        let bound = srv.local_addr().unwrap();
        let handle = srv.handle();
        let thread = thread::spawn(move || srv.run());
        TestServer {
            base: format!("http://{}", bound),
            handle,
            thread: Some(thread),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.shutdown();
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

pub fn htpasswd() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/testdata/htpasswd")
}

pub struct Reply {
    pub status: u16,
    pub challenge: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json_error(&self) -> String {
        let v: serde_json::Value = serde_json::from_slice(&self.body).unwrap();
        v["error"].as_str().unwrap().to_string()
    }
}

fn reply(r: ureq::Response) -> Reply {
    let status = r.status();
    let challenge = r.header("WWW-Authenticate").map(|v| v.to_string());
    let content_type = r.header("Content-Type").map(|v| v.to_string());
    let mut body = vec!();
    r.into_reader().read_to_end(&mut body).unwrap();
    Reply {
        status,
        challenge,
        content_type,
        body,
    }
}

/// Send a request, treating any HTTP status as a reply.
pub fn send(method: &str, url: &str, auth: Option<&str>, body: Option<&[u8]>) -> Reply {
    let mut req = ureq::request(method, url);
    if let Some(a) = auth {
        req = req.set("Authorization", a);
    }
    let r = match body {
        Some(b) => req.send_bytes(b),
        None => req.call(),
    };
    match r {
        Ok(v) => reply(v),
        Err(ureq::Error::Status(_, v)) => reply(v),
        Err(e) => panic!("{} {} failed: {}", method, url, e),
    }
}
