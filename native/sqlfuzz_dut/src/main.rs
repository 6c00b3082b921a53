//! `sqlfuzz-dut`: load an engine's catalog and test statements against it
//!
//! Usage:
//!   sqlfuzz-dut --engine <sqlite|clickhouse> --conninfo "<key=value ...>" [--dump-catalog] [--test]
//!
//! With `--test`, statements are read from stdin, one per line, and each
//! outcome is printed. Exit status 2 means bad arguments or connection
//! string, 1 means the connection broke or could not be established.
use anyhow::{Context, Result};
use sqlfuzz_dut::{AdapterError, Dut, DutError, Engine, Outcome, TypeRegistry};
use std::env;
use std::io::{self, BufRead};
use std::process::ExitCode;

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {program} --engine <sqlite|clickhouse> --conninfo \"<key=value ...>\" [--dump-catalog] [--test]"
    );
}

fn arg_val(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "sqlfuzz-dut".to_string());
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        print_usage(&program);
        return ExitCode::SUCCESS;
    }

    let (Some(engine), Some(conninfo)) = (arg_val(&args, "--engine"), arg_val(&args, "--conninfo"))
    else {
        print_usage(&program);
        return ExitCode::from(2);
    };

    let engine: Engine = match engine.parse() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    // Reject a malformed connection string before touching the engine.
    if let Err(e) = engine.parse_conninfo(&conninfo) {
        eprintln!("{e}");
        return ExitCode::from(2);
    }

    match run(engine, &conninfo, has_flag(&args, "--dump-catalog"), has_flag(&args, "--test")) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(engine: Engine, conninfo: &str, dump: bool, test: bool) -> Result<()> {
    let mut registry = TypeRegistry::new();
    let catalog = engine
        .open_catalog(conninfo, &mut registry)
        .with_context(|| format!("loading {engine} catalog"))?;

    println!(
        "{engine}: {} tables, {} operators, {} routines, {} aggregates, {} types",
        catalog.tables().len(),
        catalog.operators().len(),
        catalog.routines().len(),
        catalog.aggregates().len(),
        registry.len()
    );

    if dump {
        for table in catalog.tables() {
            let columns = table
                .columns
                .iter()
                .map(|c| format!("{} {}", c.name, c.ty))
                .collect::<Vec<_>>()
                .join(", ");
            println!("{}.{}({columns})", table.schema, table.name);
        }
    }

    if !test {
        return Ok(());
    }

    let mut dut = engine
        .open_dut(conninfo)
        .with_context(|| format!("opening {engine} for testing"))?;

    for line in io::stdin().lock().lines() {
        let stmt = line.context("reading statements from stdin")?;
        if stmt.trim().is_empty() {
            continue;
        }
        match dut.test(&stmt) {
            Ok(Outcome::Success) => println!("ok"),
            Ok(Outcome::UserAbort) => println!("ok (rows)"),
            Err(e @ DutError::Broken(_)) => {
                return Err::<(), _>(AdapterError::Liveness {
                    message: e.message().to_string(),
                })
                .context("session ended");
            }
            Err(e) => println!("{e}"),
        }
    }
    Ok(())
}
