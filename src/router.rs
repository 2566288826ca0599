use std::path::PathBuf;

use log::{debug, info};
use tiny_http::{
    Method,
    Request,
};

use crate::auth::htpasswd::CredentialStore;
use crate::auth::Gate;
use crate::hook::Notifier;
use crate::record::{
    fetch,
    remove,
    store,
};
use crate::request::{
    decode_filename,
    match_route,
    RequestContext,
};
use crate::response::{
    build,
    challenge_response,
    error_response,
    exec_response,
    no_route_response,
    Outcome,
};
use crate::settings::{
    ConfigError,
    Operation,
    Operations,
    Settings,
};

/// Maps `GET`/`PUT`/`DELETE /{filename}` to the file operations.
///
/// Only enabled operations get a route. A request for a disabled one gets the same plain 404 as
/// any other unknown route, whatever the auth configuration.
pub struct Router {
    root: PathBuf,
    routes: Vec<Operation>,
    gate: Gate,
    notifier: Option<Notifier>,
}

pub struct RouterBuilder {
    root: PathBuf,
    operations: Operations,
    gate: Gate,
    notifier: Option<Notifier>,
}

impl RouterBuilder {

    pub fn gate(mut self, gate: Gate) -> RouterBuilder {
        self.gate = gate;
        self
    }

    pub fn notifier(mut self, notifier: Notifier) -> RouterBuilder {
        self.notifier = Some(notifier);
        self
    }

    pub fn build(self) -> Router {
        let mut routes = vec!();
        for op in self.operations.iter() {
            debug!("registering route {} /{{filename}}", op.method());
            routes.push(op);
        }
        Router {
            root: self.root,
            routes,
            gate: self.gate,
            notifier: self.notifier,
        }
    }
}

impl Router {

    pub fn builder(root: impl Into<PathBuf>, operations: Operations) -> RouterBuilder {
        RouterBuilder {
            root: root.into(),
            operations,
            gate: Gate::open(),
            notifier: None,
        }
    }

    /// Build the router a validated [Settings] describes, loading the credential store.
    pub fn from_settings(settings: &Settings) -> Result<Router, ConfigError> {
        let mut b = Router::builder(&settings.dir, settings.operations);
        if let Some(passwd) = &settings.passwd {
            let store = CredentialStore::load(passwd)?;
            info!("loaded {} credentials from {:?}", store.len(), passwd);
            b = b.gate(Gate::basic(&settings.realm, store));
        }
        if let Some(hook) = &settings.hook {
            let n = Notifier::new(hook, settings.verbose).with_reads(settings.hook_reads);
            b = b.notifier(n);
        }
        Ok(b.build())
    }

    pub fn routes(&self) -> &[Operation] {
        &self.routes
    }

    /// Find the registered operation for `method` and `url`, with the raw filename segment.
    pub fn route<'a>(&self, method: &Method, url: &'a str) -> Option<(Operation, &'a str)> {
        let op = Operation::from_method(method)?;
        if !self.routes.contains(&op) {
            return None;
        }
        let segment = match_route(url)?;
        Some((op, segment))
    }

    fn dispatch(&self, ctx: &RequestContext, req: &mut Request) -> Outcome {
        match ctx.op {
            Operation::Read => {
                Outcome::from(fetch(&ctx.path))
            },
            Operation::Write => {
                let expected_size = req.body_length();
                Outcome::from(store(&ctx.path, req.as_reader(), expected_size).map(|_| ()))
            },
            Operation::Delete => {
                Outcome::from(remove(&ctx.path))
            },
        }
    }

    /// Handle one request to completion, then fire the notifier if the operation succeeded.
    pub fn handle(&self, mut req: Request) {
        let (op, segment) = match self.route(req.method(), req.url()) {
            Some((op, segment)) => (op, segment.to_string()),
            None => {
                debug!("no route for {} {}", req.method(), req.url());
                exec_response(req, no_route_response());
                return;
            },
        };

        let authorization = req
            .headers()
            .iter()
            .find(|h| h.field.equiv("Authorization"))
            .map(|h| h.value.as_str().to_string());
        let auth = match self.gate.check(authorization.as_deref()) {
            Ok(v) => v,
            Err(e) => {
                info!("{} /{} rejected: {}", op, segment, e);
                let challenge = self.gate.challenge().unwrap_or("Basic");
                exec_response(req, challenge_response(challenge));
                return;
            },
        };

        let filename = match decode_filename(&segment) {
            Ok(v) => v,
            Err(e) => {
                info!("{} /{} rejected: {}", op, segment, e);
                exec_response(req, error_response(&e));
                return;
            },
        };

        let ctx = RequestContext::new(op, &self.root, filename, auth);
        info!(
            "processing request {} for {} -> {:?} (user {})",
            ctx.op,
            ctx.filename,
            ctx.path,
            ctx.identity().unwrap_or("-"),
            );

        let outcome = self.dispatch(&ctx, &mut req);
        let success = outcome.is_success();
        exec_response(req, build(outcome));

        if success {
            if let Some(n) = &self.notifier {
                n.notify(ctx.op, &ctx.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use tiny_http::Method;

    use super::Router;
    use crate::settings::{
        Operation,
        Operations,
        Settings,
    };

    #[test]
    fn test_only_enabled_routes() {
        let ops = Operations {
            read: true,
            write: false,
            delete: false,
        };
        let r = Router::builder("/srv", ops).build();
        assert_eq!(r.routes(), &[Operation::Read]);
        assert_eq!(r.route(&Method::Get, "/foo"), Some((Operation::Read, "foo")));
        assert!(r.route(&Method::Put, "/foo").is_none());
        assert!(r.route(&Method::Delete, "/foo").is_none());
        assert!(r.route(&Method::Post, "/foo").is_none());
        assert!(r.route(&Method::Head, "/foo").is_none());
    }

    #[test]
    fn test_unmatched_paths() {
        let r = Router::builder("/srv", Operations::all()).build();
        assert!(r.route(&Method::Get, "/").is_none());
        assert!(r.route(&Method::Get, "/a/b").is_none());
        assert_eq!(r.route(&Method::Delete, "/a?x"), Some((Operation::Delete, "a")));
    }

    #[test]
    fn test_from_settings_missing_passwd() {
        let d = tempdir().unwrap();
        let mut s = Settings::new(d.path());
        s.operations = Operations::all();
        s.passwd = Some(d.path().join("htpasswd"));
        assert!(Router::from_settings(&s).is_err());
    }
}
