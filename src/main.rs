//! Stencil CLI
//!
//! Usage:
//!   stencil [OPTIONS] [TEMPLATE]
//!
//! Options:
//!   -o, --output <FILE>      Output file (writes to stdout if not provided)
//!   -p, --params <FILE>      Parameter file (TOML format)
//!   -D, --define <KEY=VALUE> Set a scalar parameter
//!   -L, --list <KEY=a,b,c>   Set a list parameter
//!   --now <DATETIME>         Reference time for date placeholders
//!   -v, --verbose            Log loop expansion to stderr
//!   -h, --help               Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stencil::{Engine, Parameters, Value};

const NOW_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Parser)]
#[command(name = "stencil")]
#[command(about = "Expand %%%-placeholder templates with dates, counters and loops")]
struct Cli {
    /// Template file (reads from stdin if not provided)
    template: Option<PathBuf>,

    /// Output file (writes to stdout if not provided)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Parameter file (TOML format, values under [parameters])
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Scalar parameter; the value is read as an integer, a float, or a string
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
    defines: Vec<(String, Value)>,

    /// List parameter with comma-separated string elements
    #[arg(short = 'L', long = "list", value_name = "KEY=a,b,c", value_parser = parse_list)]
    lists: Vec<(String, Value)>,

    /// Reference time for date placeholders, e.g. 2023-06-15T12:00:00
    #[arg(long, value_parser = parse_now)]
    now: Option<NaiveDateTime>,

    /// Log loop expansion to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // If no template and stdin is a terminal (interactive), show intro help
    if cli.template.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    // Load parameters; command-line values override the file
    let mut params = match &cli.params {
        Some(path) => match Parameters::from_file(path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error loading parameters '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Parameters::new(),
    };
    for (key, value) in cli.defines.iter().chain(&cli.lists) {
        params.insert(key.clone(), value.clone());
    }

    // Read template
    let (source, filename) = match &cli.template {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading template '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let engine = match cli.now {
        Some(now) => Engine::new().with_reference_time(now),
        None => Engine::new(),
    };

    let output = match engine.process(&source, &params) {
        Ok(output) => output,
        Err(e) => {
            eprint!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = write_output(path, &output) {
                eprintln!("Error writing output '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => print!("{}", output),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn write_output(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

fn split_assignment(arg: &str) -> Result<(&str, &str), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(format!("expected KEY=VALUE, got '{}'", arg)),
    }
}

fn parse_define(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = split_assignment(arg)?;
    let value = if let Ok(n) = raw.parse::<i64>() {
        Value::Integer(n)
    } else if let Ok(x) = raw.parse::<f64>() {
        Value::Float(x)
    } else {
        Value::String(raw.to_string())
    };
    Ok((key.to_string(), value))
}

fn parse_list(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = split_assignment(arg)?;
    let items = if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(',').map(Value::from).collect()
    };
    Ok((key.to_string(), Value::List(items)))
}

fn parse_now(arg: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(arg, NOW_FORMAT)
        .map_err(|e| format!("expected {}, got '{}': {}", NOW_FORMAT, arg, e))
}

fn print_intro() {
    println!(
        r#"Stencil - Placeholder and loop templating

USAGE:
    stencil [OPTIONS] [TEMPLATE]
    echo '<template>' | stencil -D KEY=VALUE

OPTIONS:
    -o, --output       Output file (default: stdout)
    -p, --params       Parameter file (TOML, values under [parameters])
    -D, --define       Scalar parameter KEY=VALUE
    -L, --list         List parameter KEY=a,b,c
    --now              Reference time, e.g. 2023-06-15T12:00:00
    -v, --verbose      Log loop expansion to stderr
    -h, --help         Print help

PLACEHOLDERS:
    %%%NOW@offset@format%%%          date, offset in days
    %%%MONTHDELTA@offset@format%%%   date, offset in months
    %%%CONSTANT@NAME%%%              scalar parameter
    %%%INC@base@step%%%              counter shared by the whole template
    %%%LOOP@INPUT@name%%% ... %%%LOOP@END@name%%%
        %%%INDEX%%%  %%%name.INDEX%%%  %%%name.VALUE%%%
        %%%LOOPINC@base@step%%%      counter local to the loop
        %%%LOOPLIST@NAME%%%          element of a parallel list
    ${{NAME}}                          plain variable reference

QUICK START:
    echo 'Hosts: %%%LOOP@H@h%%%%%%h.VALUE%%% %%%LOOP@END@h%%%' | stencil -L H=a,b"#
    );
}
