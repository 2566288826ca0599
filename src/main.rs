use std::process;
use std::thread;

use env_logger::Env;
use log::{debug, info};
use signal_hook::consts::{
    SIGINT,
    SIGTERM,
};
use signal_hook::iterator::Signals;

use kvdir::router::Router;
use kvdir::server::{
    Server,
    ShutdownHandle,
};
use kvdir::settings::{
    check_privileges,
    ConfigError,
    Settings,
};

fn init_logging(verbose: bool) {
    let level = if verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}

fn watch_signals(handle: ShutdownHandle) -> Result<(), ConfigError> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                debug!("got signal {}", sig);
                handle.shutdown();
            }
        })?;
    Ok(())
}

fn run(settings: Settings) -> Result<(), ConfigError> {
    settings.validate()?;
    check_privileges()?;

    let router = Router::from_settings(&settings)?;
    let srv = Server::bind(&settings, router)?;
    watch_signals(srv.handle())?;

    let scheme = match settings.tls() {
        Some(_) => "https",
        None => "http",
    };
    println!("listening on {}", settings.listen);
    info!("serving {:?} over {} with routes {:?}", settings.dir, scheme, settings.operations);
    srv.run();
    Ok(())
}

fn main() {
    let settings = Settings::from_args();
    init_logging(settings.verbose);

    match run(settings) {
        Ok(_) => {},
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        },
    }
}
