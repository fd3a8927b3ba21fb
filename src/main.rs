use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::lox::{resolve_source, scan};
use rox::parser::Parser;
use rox::scanner::Scanner;
use rox::Lox;

const EXIT_STATIC_ERROR: i32 = 65;
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Rox language interpreter", long_about = None)]
pub struct Cli {
    /// Defaults to `repl`
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Resolves a program and prints its local bindings as JSON
    Resolve { filename: PathBuf },

    /// Runs input from a file as a Rox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt
    Repl,
}

/// Maps the file and decodes it as UTF‑8.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the mapping is read once, copied into an owned String, and
    // dropped before this function returns.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", filename))?;

    let source = std::str::from_utf8(&map)
        .map_err(LoxError::from)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", source.len(), filename);
    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(errors: &[LoxError]) {
    for error in errors {
        debug!("Reporting: {:?}", error);
        eprintln!("{}", error);
    }
}

/// 65 if anything failed before execution, otherwise 70.
fn exit_code(errors: &[LoxError]) -> i32 {
    if errors.iter().any(LoxError::is_static) {
        EXIT_STATIC_ERROR
    } else {
        EXIT_RUNTIME_ERROR
    }
}

fn tokenize(filename: &Path) -> Result<()> {
    info!("Running Tokenize subcommand");
    let source = read_file(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        process::exit(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &Path) -> Result<()> {
    info!("Running Parse subcommand");
    let source = read_file(filename)?;

    let tokens = scan(&source).unwrap_or_else(|errors| {
        report(&errors);
        process::exit(EXIT_STATIC_ERROR);
    });

    match Parser::new(tokens).parse_expression() {
        Ok(expr) => println!("{}", AstPrinter::print(&expr)),
        Err(e) => {
            report(&[e]);
            process::exit(EXIT_STATIC_ERROR);
        }
    }

    info!("Parse subcommand completed");
    Ok(())
}

fn resolve(filename: &Path) -> Result<()> {
    info!("Running Resolve subcommand");
    let source = read_file(filename)?;

    let (_, resolution) = resolve_source(&source).unwrap_or_else(|errors| {
        report(&errors);
        process::exit(EXIT_STATIC_ERROR);
    });

    let bindings: Vec<_> = resolution.bindings().collect();
    let json = serde_json::to_string_pretty(&bindings).context("Failed to serialize bindings")?;
    println!("{}", json);

    Ok(())
}

fn run(filename: &Path) -> Result<()> {
    info!("Running Run subcommand");
    let source = read_file(filename)?;

    if let Err(errors) = Lox::new().run(&source) {
        report(&errors);
        process::exit(exit_code(&errors));
    }

    info!("Run subcommand completed");
    Ok(())
}

/// Errors are reported and the prompt continues; state survives between lines.
fn repl() -> Result<()> {
    info!("Starting REPL");
    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        line.clear();
        let read = input.read_line(&mut line).context("Failed to read from stdin")?;
        if read == 0 {
            println!();
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        if let Err(errors) = lox.run_repl_line(&line) {
            report(&errors);
        }
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands.unwrap_or(Commands::Repl) {
        Commands::Tokenize { filename } => tokenize(&filename),
        Commands::Parse { filename } => parse(&filename),
        Commands::Resolve { filename } => resolve(&filename),
        Commands::Run { filename } => run(&filename),
        Commands::Repl => repl(),
    }
}
