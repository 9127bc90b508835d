use clap::{Args, Parser, Subcommand};
use jsp_lexer::ScanOptions;
use std::path::Path;

#[derive(Parser)]
#[command(name = "jsp-parse")]
#[command(about = "Inspect the concrete syntax tree of JSP templates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    dialect: Dialect,
}

#[derive(Subcommand)]
enum Command {
    /// Print the syntax tree of a template
    Parse {
        /// Input .jsp file
        path: String,

        /// Emit JSON instead of an s-expression
        #[arg(long)]
        json: bool,
    },

    /// Print the tokens the grammar requested from the scanner
    Tokens {
        /// Input .jsp file
        path: String,
    },

    /// Report diagnostics; exits with status 1 if there are any
    Check {
        /// Input .jsp file
        path: String,
    },
}

#[derive(Args)]
struct Dialect {
    /// Treat `#{...}` as plain text
    #[arg(long, global = true)]
    no_deferred_el: bool,

    /// Treat `{{ ... }}` as plain text
    #[arg(long, global = true)]
    no_interpolation: bool,
}

impl Dialect {
    fn options(&self) -> ScanOptions {
        ScanOptions {
            deferred_el: !self.no_deferred_el,
            interpolation: !self.no_interpolation,
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let options = cli.dialect.options();

    match cli.command {
        Command::Parse { path, json } => cmd_parse(&path, json, options),
        Command::Tokens { path } => cmd_tokens(&path, options),
        Command::Check { path } => cmd_check(&path, options),
    }
}

/// Install a stderr subscriber when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_parse(path: &str, json: bool, options: ScanOptions) {
    let source = read_source(path);
    let parse = jsp_parser::parse_with_options(&source, options);

    if json {
        match serde_json::to_string_pretty(&parse.tree) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Error serializing tree: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("{}", parse.tree.to_sexp());
    }

    for diagnostic in &parse.diagnostics {
        eprintln!("{path}: {diagnostic}");
    }
}

fn cmd_tokens(path: &str, options: ScanOptions) {
    let source = read_source(path);
    let parse = jsp_parser::parse_with_options(&source, options);

    for token in &parse.tokens {
        let marker = if token.terminated { "" } else { " (unterminated)" };
        println!(
            "{:>5}..{:<5} {:<24} {:?}{marker}",
            token.span.start,
            token.span.end,
            token.kind.name(),
            token.text(&source),
        );
    }
}

fn cmd_check(path: &str, options: ScanOptions) {
    let source = read_source(path);
    let parse = jsp_parser::parse_with_options(&source, options);

    if parse.has_errors() {
        for diagnostic in &parse.diagnostics {
            eprintln!("{path}: {diagnostic}");
        }
        std::process::exit(1);
    }

    eprintln!("OK: {path}");
}
