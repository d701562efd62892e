use std::cell::Cell;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use seemm::ast_printer::AstPrinter;
use seemm::config::HostConfig;
use seemm::error::{Diagnostic, Diagnostics, LogReporter, Reporter, RuntimeError, SeeError};
use seemm::host::{Host, HostFunction};
use seemm::interpreter::BUILTINS;
use seemm::runner::{ScriptRunner, VariableChange};
use seemm::scanner::{self, IdentifierTypes};
use seemm::types::SemanticType;
use seemm::value::Value;

#[derive(ClapParser, Debug)]
#[command(version, about = "SeeMM scripting language", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to seemm.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints every statement in prefix form
    Parse { filename: PathBuf },

    /// Lexes, parses and resolves a file without running it
    Check {
        filename: PathBuf,

        /// JSON file describing external variables
        #[arg(long)]
        host: Option<PathBuf>,
    },

    /// Runs a file, then calls `Main()` once per tick
    Run {
        filename: PathBuf,

        /// JSON file describing external variables
        #[arg(long)]
        host: Option<PathBuf>,

        /// Number of ticks to simulate after the first pass
        #[arg(long, default_value_t = 1)]
        ticks: u32,
    },
}

/// Prints diagnostics and runtime errors to stderr and `print` output to
/// stdout, mirroring everything into the log.
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn diagnostic(&self, diagnostic: &Diagnostic) {
        LogReporter.diagnostic(diagnostic);
        eprintln!("{}", diagnostic);
    }

    fn runtime_error(&self, error: &RuntimeError) {
        LogReporter.runtime_error(error);
        eprintln!("{}", error);
    }

    fn console(&self, message: &str) {
        LogReporter.console(message);
        println!("{}", message);
    }
}

/// Reads the contents of a file into a String
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("seemm.log").context("Failed to create seemm.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("seemm::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "{} {:<5} [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to seemm.log");
    Ok(())
}

/// External variables from `--host`, plus the demo functions every CLI run
/// gets.  `ticks` backs `tick_count()`.
fn build_host(config: Option<&Path>, ticks: Rc<Cell<i64>>) -> Result<Host> {
    let mut host = Host::new();

    if let Some(path) = config {
        HostConfig::load(path)
            .and_then(|config| config.apply(&mut host))
            .context(format!("Failed to load host configuration {:?}", path))?;
    }

    host.add_function(HostFunction::new(
        "log_value",
        vec![SemanticType::ANY],
        SemanticType::VOID,
        |args: &[Value]| {
            for arg in args {
                info!("log_value: {}", arg);
                println!("log_value: {}", arg);
            }
            None
        },
    ))?;

    host.add_function(HostFunction::new(
        "tick_count",
        vec![],
        SemanticType::INT,
        move |_args: &[Value]| Some(Value::Int(ticks.get())),
    ))?;

    Ok(host)
}

fn print_changes(changes: &[VariableChange]) {
    for change in changes {
        println!("{}: {} -> {}", change.name, change.previous, change.current);
    }
}

fn exit_for(error: SeeError) -> ! {
    match error {
        SeeError::Runtime(_) => {
            debug!("Runtime failure, exiting with code 70");
            std::process::exit(70);
        }
        other => {
            eprintln!("{}", other);
            std::process::exit(65);
        }
    }
}

fn report_all(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        ConsoleReporter.diagnostic(diagnostic);
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");
            let source = read_file(&filename)?;

            let mut identifiers: IdentifierTypes = BUILTINS
                .iter()
                .map(|b| (b.name.to_string(), b.ret))
                .collect();
            let mut diagnostics = Diagnostics::new();
            let tokens = scanner::scan(&source, &mut identifiers, &mut diagnostics);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&tokens).context("Failed to encode tokens")?
                );
            } else {
                for token in &tokens {
                    println!("{}", token);
                }
            }

            if !diagnostics.is_empty() {
                report_all(&diagnostics);
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");
            let source = read_file(&filename)?;

            let mut identifiers: IdentifierTypes = BUILTINS
                .iter()
                .map(|b| (b.name.to_string(), b.ret))
                .collect();
            let mut diagnostics = Diagnostics::new();
            let tokens = scanner::scan(&source, &mut identifiers, &mut diagnostics);
            let statements = seemm::parser::parse(tokens, &mut diagnostics);

            if !diagnostics.is_empty() {
                report_all(&diagnostics);
                std::process::exit(65);
            }

            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }

            info!("Parse subcommand completed");
        }

        Commands::Check { filename, host } => {
            info!("Running Check subcommand");
            let source = read_file(&filename)?;
            let host = build_host(host.as_deref(), Rc::new(Cell::new(0)))?;

            let mut runner = ScriptRunner::new(host, Rc::new(ConsoleReporter));
            if runner.compile(&source).is_err() {
                std::process::exit(65);
            }

            println!("ok");
        }

        Commands::Run {
            filename,
            host,
            ticks,
        } => {
            info!("Running Run subcommand");
            let source = read_file(&filename)?;

            let counter = Rc::new(Cell::new(0));
            let host = build_host(host.as_deref(), Rc::clone(&counter))?;

            let mut runner = ScriptRunner::new(host, Rc::new(ConsoleReporter));
            if runner.compile(&source).is_err() {
                std::process::exit(65);
            }

            match runner.run() {
                Ok(changes) => print_changes(&changes),
                Err(e) => exit_for(e),
            }

            for _ in 0..ticks {
                counter.set(counter.get() + 1);

                match runner.tick() {
                    Ok(changes) => print_changes(&changes),
                    Err(e) => exit_for(e),
                }
            }

            info!("Program executed successfully");
        }
    }

    Ok(())
}
