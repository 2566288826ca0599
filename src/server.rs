use std::net::SocketAddr;
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info};

use crate::router::Router;
use crate::settings::{
    resolve_listen,
    ConfigError,
    Settings,
};

/// Accept loop. Each request is handled on its own thread, with no ordering between requests.
pub struct Server {
    inner: Arc<tiny_http::Server>,
    router: Arc<Router>,
    stopping: Arc<AtomicBool>,
}

/// Stops a running [Server] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<tiny_http::Server>,
    stopping: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Stop accepting. Requests already being handled, and notifier programs, are not waited for.
    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.inner.unblock();
    }
}

impl Server {

    /// Bind the listener described by `settings`: TLS when a certificate pair is set, plain
    /// HTTP otherwise.
    pub fn bind(settings: &Settings, router: Router) -> Result<Server, ConfigError> {
        let addr = resolve_listen(&settings.listen)?;
        match settings.tls() {
            Some((cert, key)) => {
                Server::https(addr, cert, key, router)
            },
            None => {
                Server::http(addr, router)
            },
        }
    }

    pub fn http(addr: SocketAddr, router: Router) -> Result<Server, ConfigError> {
        let srv = match tiny_http::Server::http(addr) {
            Ok(v) => v,
            Err(e) => {
                return Err(ConfigError::Bind {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                });
            },
        };
        Ok(Server::wrap(srv, router))
    }

    #[cfg(feature = "tls")]
    pub fn https(addr: SocketAddr, cert: &std::path::Path, key: &std::path::Path, router: Router) -> Result<Server, ConfigError> {
        let certificate = std::fs::read(cert).map_err(|e| ConfigError::Tls {
            path: cert.to_path_buf(),
            source: e,
        })?;
        let private_key = std::fs::read(key).map_err(|e| ConfigError::Tls {
            path: key.to_path_buf(),
            source: e,
        })?;
        let ssl = tiny_http::SslConfig {
            certificate,
            private_key,
        };
        let srv = match tiny_http::Server::https(addr, ssl) {
            Ok(v) => v,
            Err(e) => {
                return Err(ConfigError::Bind {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                });
            },
        };
        Ok(Server::wrap(srv, router))
    }

    #[cfg(not(feature = "tls"))]
    pub fn https(_addr: SocketAddr, _cert: &std::path::Path, _key: &std::path::Path, _router: Router) -> Result<Server, ConfigError> {
        Err(ConfigError::TlsUnsupported)
    }

    fn wrap(srv: tiny_http::Server, router: Router) -> Server {
        Server {
            inner: Arc::new(srv),
            router: Arc::new(router),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Address actually bound, useful when listening on port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.server_addr().to_ip()
    }

    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            inner: Arc::clone(&self.inner),
            stopping: Arc::clone(&self.stopping),
        }
    }

    /// Serve until shut down or the listener fails.
    pub fn run(&self) {
        loop {
            let req = match self.inner.recv() {
                Ok(v) => v,
                Err(e) => {
                    if self.stopping.load(Ordering::SeqCst) {
                        info!("shutting down");
                    } else {
                        error!("{}", e);
                    }
                    break;
                },
            };
            debug!("accepted {} {} from {:?}", req.method(), req.url(), req.remote_addr());
            let router = Arc::clone(&self.router);
            let spawned = thread::Builder::new()
                .name("request".to_string())
                .spawn(move || {
                    router.handle(req);
                });
            if let Err(e) = spawned {
                error!("cannot spawn request worker: {}", e);
            }
        }
    }
}
