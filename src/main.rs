//! asttpl CLI
//!
//! Usage:
//!   asttpl [OPTIONS] [TEMPLATE]
//!
//! Options:
//!   -d, --data <FILE>     JSON file pushed onto the context stack (repeatable)
//!   -o, --options <FILE>  Options file (TOML format)
//!   -v, --verbose         Log discovered directives to stderr
//!   -g, --grammar         Show directive encoding reference
//!   -h, --help            Print help

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use asttpl::{compile_with_config, CompileError, ContextStack, Options};

#[derive(Parser)]
#[command(name = "asttpl")]
#[command(about = "Expand directives in source templates against JSON data")]
struct Cli {
    /// Template file (reads from stdin if not provided)
    template: Option<PathBuf>,

    /// JSON data file, pushed onto the context stack in order
    #[arg(short, long = "data")]
    data: Vec<PathBuf>,

    /// Options file (TOML format)
    #[arg(short, long)]
    options: Option<PathBuf>,

    /// Log discovered directives to stderr (filter with RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    /// Show directive encoding reference
    #[arg(short, long)]
    grammar: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.grammar {
        print_grammar();
        return;
    }

    // Load options
    let options = match &cli.options {
        Some(path) => match Options::from_file(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("Error loading options '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => Options::default(),
    };

    let mut config = options.into_config();
    if cli.verbose {
        config = config.with_trace(trace_dispatch());
    }

    // Build the context stack
    let mut values = Vec::with_capacity(cli.data.len());
    for path in &cli.data {
        match read_data(path) {
            Ok(value) => values.push(value),
            Err(message) => {
                eprintln!("Error reading data '{}': {}", path.display(), message);
                process::exit(1);
            }
        }
    }

    let mut stack = ContextStack::from(values);

    // Read template
    let (source, filename) = match &cli.template {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    process::exit(1);
                }
            }
        }
    };

    match compile_with_config(&source, &mut stack, &config) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(CompileError::Parse(errors)) => {
            for error in &errors {
                eprint!("{}", error.format(&source, &filename));
            }
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error [{}]: {}", e.code(), e);
            process::exit(1);
        }
    }
}

fn read_data(path: &Path) -> Result<Value, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

/// stderr subscriber, `RUST_LOG` overrides the default filter
fn trace_dispatch() -> tracing::Dispatch {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("asttpl=debug"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .finish();
    tracing::Dispatch::new(subscriber)
}

fn print_grammar() {
    println!(
        r#"ASTTPL DIRECTIVES
=================

Directives are identifier names. Every marker is a letter-number, so a
template stays valid JavaScript.

MARKERS
-------
𐅙  U+10159  directive prefix, loop and transform separator
𐅂  U+10142  filter separator
𐅞  U+1015E  path separator      (decodes to .)
𐅅  U+10145  every array element (decodes to #)
𐅆  U+10146  every value         (decodes to *)
𐅄  U+10144  keys and indices    (decodes to @)

DIRECTIVES
----------
𐅙variable𐅙path𐅂filter...        Rename the identifier to the first match
𐅙literal𐅙path𐅂filter...         Replace with a literal of the first match
𐅙transform𐅙name𐅙path            Hand the node to a registered transformation
𐅙repeat𐅙items𐅂f...𐅙name𐅂f...    Repeat the entry once per item

An empty path reads the innermost context value. A transform without a path
receives the whole context stack.

LOOP POSITIONS
--------------
const api = {{ 𐅙repeat𐅙endpoints𐅞𐅅𐅙operationId }};     object entries
function f({{ 𐅙repeat𐅙params𐅞𐅅𐅙name }}) {{}}            pattern entries
function 𐅙repeat𐅙endpoints𐅞𐅅𐅙operationId() {{}}        function declarations

LITERAL POSITIONS
-----------------
Literals may only replace expressions: initializers, arguments, property
values, array elements. Names, keys, member properties and bindings fail
with E_BAD_LITERAL.

BUILT-IN FILTERS
----------------
upper lower firstToUpper firstToLower camelCase pascalCase snakeCase
kebabCase trim json reverse first last"#
    );
}
