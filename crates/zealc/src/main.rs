//! Zeal package checker CLI

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use zeal_core::{render_package, verify_package, SourceId, SourceMap, TableOptions, VerifyDiagnostic};

mod bind;
mod input;

use bind::{bind_package, Bound};
use input::PackageDesc;

#[derive(Parser)]
#[command(name = "zealc")]
#[command(author, version, about = "Zeal package checker", long_about = None)]
struct Cli {
    /// Trusted input: report user errors as warnings and skip arity checks
    #[arg(long, global = true)]
    trusted: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind, emit and verify package descriptions
    Check {
        /// Package description file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the disassembly listing of a package
    List {
        /// Package description file
        file: PathBuf,

        /// Also verify and report problems
        #[arg(long)]
        verify: bool,
    },

    /// Describe the symbol with a given full name
    Lookup {
        /// Package description file
        file: PathBuf,

        /// Full name, e.g. `Zeal.List<Zeal.Int>`
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = TableOptions {
        no_compiler_checks: cli.trusted,
    };
    match cli.command {
        Commands::Check { files } => check(files, options, cli.json),
        Commands::List { file, verify } => list(file, verify, options, cli.json),
        Commands::Lookup { file, name } => lookup(file, name, options, cli.json),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::from_default_env(),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

/// Read a package description and register its source for diagnostics.
fn load(path: &Path, sources: &mut SourceMap) -> Result<(PackageDesc, SourceId)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let desc: PackageDesc = serde_json::from_str(&text)
        .with_context(|| format!("Invalid package description: {}", path.display()))?;

    let source = match &desc.source {
        Some(src) => {
            let full = path.parent().unwrap_or(Path::new(".")).join(src);
            let content = fs::read_to_string(&full)
                .with_context(|| format!("Failed to read source: {}", full.display()))?;
            sources.add_file(full, content)
        }
        None => sources.add_file(path, text),
    };
    tracing::debug!("loaded {} ({} modules)", path.display(), desc.modules.len());
    Ok((desc, source))
}

fn build(path: &Path, sources: &mut SourceMap, options: TableOptions) -> Result<Bound> {
    let (desc, source) = load(path, sources)?;
    bind_package(&desc, source, options)
        .with_context(|| format!("Failed to bind package: {}", path.display()))
}

/// Problems that are not attached to a debug token.
fn unattached<'p>(bound: &'p Bound, problems: &'p [VerifyDiagnostic]) -> impl Iterator<Item = &'p VerifyDiagnostic> {
    problems
        .iter()
        .filter(|p| bound.package.functions[p.fun].token(p.index).is_none())
}

fn report(bound: &Bound, problems: &[VerifyDiagnostic], sources: &SourceMap) {
    if !bound.table.diagnostics().is_empty() {
        eprintln!("{}", bound.table.diagnostics().render(sources));
    }
    let severity = if bound.table.options().no_compiler_checks {
        "warning"
    } else {
        "error"
    };
    for p in unattached(bound, problems) {
        let fun = bound.package.functions[p.fun].fun;
        eprintln!(
            "{}: {} (in {} at instruction {})",
            severity,
            p.message,
            bound.table.full_name(fun),
            p.index
        );
    }
}

fn check(files: Vec<PathBuf>, options: TableOptions, json: bool) -> Result<()> {
    let mut sources = SourceMap::new();
    let mut reports = Vec::new();
    let mut failed = false;
    let mut total_functions = 0;

    for file in &files {
        let mut bound = build(file, &mut sources, options)?;
        let problems = verify_package(&mut bound.table, &bound.package)
            .with_context(|| format!("Verification aborted: {}", file.display()))?;
        total_functions += bound.package.functions.len();

        failed |= bound.table.has_errors() || (!options.no_compiler_checks && !problems.is_empty());
        if json {
            reports.push(serde_json::json!({
                "file": file.display().to_string(),
                "diagnostics": bound.table.diagnostics(),
                "verify": problems,
            }));
        } else {
            report(&bound, &problems, &sources);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    if failed {
        bail!("Check failed");
    }
    eprintln!("OK: {} function(s) checked", total_functions);
    Ok(())
}

fn list(file: PathBuf, verify: bool, options: TableOptions, json: bool) -> Result<()> {
    let mut sources = SourceMap::new();
    let mut bound = build(&file, &mut sources, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&bound.package)?);
    } else {
        print!("{}", render_package(&bound.table, &bound.package));
    }

    if verify {
        let problems = verify_package(&mut bound.table, &bound.package)
            .with_context(|| format!("Verification aborted: {}", file.display()))?;
        report(&bound, &problems, &sources);
    }
    Ok(())
}

fn lookup(file: PathBuf, name: String, options: TableOptions, json: bool) -> Result<()> {
    let mut sources = SourceMap::new();
    let bound = build(&file, &mut sources, options)?;

    let Some(id) = bound.table.lookup(&name) else {
        bail!("No symbol named '{}'", name);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(bound.table.get(id))?);
        return Ok(());
    }

    println!("{}", bound.table.describe(id));
    let sym = bound.table.get(id);
    if sym.is_fun() {
        let params = bound.table.fun_params(id)?;
        let returns = bound.table.fun_returns(id)?;
        for p in params {
            println!("  param {}", bound.table.full_name(p));
        }
        for r in returns {
            println!("  returns {}", bound.table.full_name(r));
        }
    }
    for child in sym.children() {
        println!("  {}", bound.table.describe(child));
    }
    Ok(())
}
