use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing_subscriber::EnvFilter;

use inkexpr::cli::{self, ConfigFile};
use inkexpr::config::{self, Config};
use inkexpr::script::Interpreter;

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    // `Print` output is always shown.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},inkexpr::print=info")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_seed(interp: &mut Interpreter, path: &Path) {
    match Config::load_file(path) {
        Ok((cfg, errors)) => {
            for e in &errors {
                eprintln!("inkexpr: warning: {}: {e}", path.display());
            }
            cfg.apply(interp);
        }
        Err(e) => eprintln!("inkexpr: warning: {}: {e}", path.display()),
    }
}

/// Evaluate one source string and print its value.  Returns `false` on a
/// compile error.
fn eval_and_print(interp: &mut Interpreter, src: &str) -> bool {
    match interp.eval(src) {
        Ok(outcome) => {
            println!("{}", outcome.value);
            true
        }
        Err(e) => {
            eprintln!("inkexpr: {e}");
            false
        }
    }
}

fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("inkexpr: {e}");
            eprintln!(
                "Usage: inkexpr [-d] [-f[<file>]] [-Dname=value]... [-Ekey=value]... [-c<expr>] [<expr>...]"
            );
            std::process::exit(1);
        }
    };

    init_logging(args.debug);

    let mut interp = Interpreter::with_builtins();

    // ── Load seed file ────────────────────────────────────────────────────────
    match &args.config {
        ConfigFile::Skip => {}
        ConfigFile::Explicit(path) => load_seed(&mut interp, path),
        ConfigFile::Search => {
            if let Some(path) = config::find_user_config() {
                load_seed(&mut interp, &path);
            }
        }
    }

    // ── Command-line seeds override the file ──────────────────────────────────
    for (name, value) in args.vars {
        interp.set_var(&name, value);
    }
    for (key, value) in args.env {
        interp.env_mut().set(key, value);
    }

    let mut ok = true;

    if !args.exprs.is_empty() {
        for src in &args.exprs {
            ok &= eval_and_print(&mut interp, src);
        }
    } else {
        // ── Read-eval-print over stdin ────────────────────────────────────────
        let interactive = unsafe {
            libc::isatty(libc::STDIN_FILENO) != 0 && libc::isatty(libc::STDOUT_FILENO) != 0
        };
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            if interactive {
                print!("> ");
                let _ = io::stdout().flush();
            }
            let Some(line) = lines.next() else { break };
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("inkexpr: {e}");
                    ok = false;
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            ok &= eval_and_print(&mut interp, &line);
        }
    }

    if !ok {
        std::process::exit(1);
    }
}
