use std::path::PathBuf;

use clap::{
    App,
    Arg,
    ArgMatches,
};

use crate::settings::{
    Operations,
    Settings,
};

fn app<'a, 'b>() -> App<'a, 'b> {
    let mut o = App::new("kvdir");
    o = o.version(env!("CARGO_PKG_VERSION"));
    o = o.about("Serve a flat directory of files as a key-value store over HTTP");
    o = o.arg(
        Arg::with_name("all")
            .long("all")
            .short("a")
            .help("allow all (read/write/delete) operations")
            );
    o = o.arg(
        Arg::with_name("read")
            .long("read")
            .short("r")
            .help("allow read operations")
            );
    o = o.arg(
        Arg::with_name("write")
            .long("write")
            .short("w")
            .help("allow write operations")
            );
    o = o.arg(
        Arg::with_name("delete")
            .long("delete")
            .short("d")
            .help("allow delete operations")
            );
    o = o.arg(
        Arg::with_name("listen")
            .long("listen")
            .short("l")
            .value_name("[host]:port")
            .help("address to listen on (default :3137)")
            .takes_value(true)
            );
    o = o.arg(
        Arg::with_name("passwd")
            .long("passwd")
            .short("p")
            .value_name("FILE")
            .help("htpasswd file for authentication (optional)")
            .takes_value(true)
            );
    o = o.arg(
        Arg::with_name("realm")
            .long("realm")
            .value_name("NAME")
            .help("authentication realm (default Protected)")
            .takes_value(true)
            );
    o = o.arg(
        Arg::with_name("cert")
            .long("cert")
            .short("c")
            .value_name("FILE")
            .help("path to tls certificate file (optional)")
            .takes_value(true)
            );
    o = o.arg(
        Arg::with_name("key")
            .long("key")
            .short("k")
            .value_name("FILE")
            .help("path to tls key file (optional)")
            .takes_value(true)
            );
    o = o.arg(
        Arg::with_name("post_hook")
            .long("post-hook")
            .value_name("FILE")
            .help("program to run after each successful operation (optional)")
            .takes_value(true)
            );
    o = o.arg(
        Arg::with_name("hook_reads")
            .long("hook-reads")
            .help("also run the post-hook after successful reads")
            );
    o = o.arg(
        Arg::with_name("verbose")
            .long("verbose")
            .short("v")
            .help("show request log and post-hook output")
            );
    o = o.arg(
        Arg::with_name("DIRECTORY")
            .help("directory to serve")
            .required(true)
            .index(1)
            );
    o
}

impl Settings {

    /// Parse the process arguments. Exits with usage on malformed input.
    pub fn from_args() -> Settings {
        let arg_matches = app().get_matches();
        Settings::from_matches(&arg_matches)
    }

    pub fn from_matches(arg: &ArgMatches) -> Settings {
        let dir = arg.value_of("DIRECTORY").unwrap_or(".");
        let mut settings = Settings::new(dir);

        if arg.is_present("all") {
            settings.operations = Operations::all();
        } else {
            settings.operations = Operations {
                read: arg.is_present("read"),
                write: arg.is_present("write"),
                delete: arg.is_present("delete"),
            };
        }

        match arg.value_of("listen") {
            Some(v) => {
                settings.listen = v.to_string();
            },
            _ => {},
        };
        match arg.value_of("realm") {
            Some(v) => {
                settings.realm = v.to_string();
            },
            _ => {},
        };

        settings.passwd = arg.value_of("passwd").map(PathBuf::from);
        settings.cert = arg.value_of("cert").map(PathBuf::from);
        settings.key = arg.value_of("key").map(PathBuf::from);
        settings.hook = arg.value_of("post_hook").map(PathBuf::from);
        settings.hook_reads = arg.is_present("hook_reads");
        settings.verbose = arg.is_present("verbose");
        settings
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::app;
    use crate::settings::{
        Operations,
        Settings,
        DEFAULT_LISTEN,
        DEFAULT_REALM,
    };

    fn parse(args: &[&str]) -> Settings {
        let m = app().get_matches_from_safe(args).unwrap();
        Settings::from_matches(&m)
    }

    #[test]
    fn test_defaults() {
        let s = parse(&["kvdir", "-r", "/srv/data"]);
        assert_eq!(s.dir, PathBuf::from("/srv/data"));
        assert_eq!(s.listen, DEFAULT_LISTEN);
        assert_eq!(s.realm, DEFAULT_REALM);
        assert!(s.operations.read);
        assert!(!s.operations.write);
        assert!(!s.operations.delete);
        assert!(s.passwd.is_none());
        assert!(s.hook.is_none());
        assert!(!s.verbose);
    }

    #[test]
    fn test_all_overrides() {
        let s = parse(&["kvdir", "-a", "-w", "."]);
        assert_eq!(s.operations, Operations::all());
    }

    #[test]
    fn test_full() {
        let s = parse(&[
            "kvdir",
            "-w",
            "-d",
            "-l", "127.0.0.1:9000",
            "-p", "htpasswd",
            "--realm", "files",
            "-c", "cert.pem",
            "-k", "key.pem",
            "--post-hook", "/bin/true",
            "--hook-reads",
            "-v",
            "data",
        ]);
        assert!(!s.operations.read);
        assert!(s.operations.write);
        assert!(s.operations.delete);
        assert_eq!(s.listen, "127.0.0.1:9000");
        assert_eq!(s.passwd, Some(PathBuf::from("htpasswd")));
        assert_eq!(s.realm, "files");
        assert_eq!(s.cert, Some(PathBuf::from("cert.pem")));
        assert_eq!(s.key, Some(PathBuf::from("key.pem")));
        assert_eq!(s.hook, Some(PathBuf::from("/bin/true")));
        assert!(s.hook_reads);
        assert!(s.verbose);
    }

    #[test]
    fn test_directory_required() {
        assert!(app().get_matches_from_safe(&["kvdir", "-a"]).is_err());
    }
}
