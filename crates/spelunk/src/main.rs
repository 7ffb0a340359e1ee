use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use spelunk_core::dump::dump_values;
use spelunk_core::dwarf::DebugInfo;
use spelunk_core::procmem::ProcessMemory;
use spelunk_core::snapshot::SnapshotBuilder;
use spelunk_core::{graph, RegionMap, Result, SymbolEntry, SymbolIndex, Value, Visitor};
use spelunk_utils::{info, init_logging, warn};

/// Inspect the typed memory of a live process: dumps, snapshots, and
/// containment graphs.
#[derive(Parser, Debug)]
#[command(name = "spelunk")]
#[command(version)]
#[command(about = "Inspect the typed memory of a live process", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List global symbols: address, size, name, cleaned type
    Symbols
    {
        /// Process ID (PID) to inspect
        #[arg(long)]
        pid: u32,
    },
    /// Dump the values of matching symbols (all globals when no name given)
    Dump
    {
        /// Process ID (PID) to inspect
        #[arg(long)]
        pid: u32,
        /// Symbol names to dump
        names: Vec<String>,
        /// Cap the number of elements shown per container
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Materialize one symbol into a structured snapshot and print it
    Snapshot
    {
        /// Process ID (PID) to inspect
        #[arg(long)]
        pid: u32,
        /// Symbol name to materialize
        name: String,
        /// Cap the number of elements visited per container
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Build the containment/pointer graph over matching symbols
    Graph
    {
        /// Process ID (PID) to inspect
        #[arg(long)]
        pid: u32,
        /// Symbol names to analyze (all globals when none given)
        names: Vec<String>,
    },
    /// List the memory regions of the process
    Regions
    {
        /// Process ID (PID) to inspect
        #[arg(long)]
        pid: u32,
    },
}

fn main()
{
    // Initialize logging (reads from RUST_LOG env var)
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()>
{
    match cli.command {
        Commands::Regions { pid } => {
            let maps = RegionMap::from_pid(pid)?;
            maps.dump(&mut io::stdout())?;
            Ok(())
        }
        Commands::Symbols { pid } => {
            let mem = ProcessMemory::attach(pid)?;
            let index = load_symbols(pid, &mem)?;
            index.dump(&mut io::stdout())?;
            Ok(())
        }
        Commands::Dump { pid, names, limit } => {
            let mem = ProcessMemory::attach(pid)?;
            let index = load_symbols(pid, &mem)?;
            let visitor = visitor_with(limit);
            let selected = select(&index, &names)?;
            dump_values(&visitor, selected, &mut io::stdout())?;
            Ok(())
        }
        Commands::Snapshot { pid, name, limit } => {
            let mem = ProcessMemory::attach(pid)?;
            let index = load_symbols(pid, &mem)?;
            let visitor = visitor_with(limit);
            let (entry, matches) = index.resolve(&name)?;
            if matches > 1 {
                warn!("{matches} symbols match {name:?}, using the first");
            }
            let mut builder = SnapshotBuilder::new();
            builder.build(&visitor, &entry.value, &entry.name);
            print!("{}", builder.finish());
            Ok(())
        }
        Commands::Graph { pid, names } => {
            let mem = ProcessMemory::attach(pid)?;
            let index = load_symbols(pid, &mem)?;
            let visitor = Visitor::new();
            let selected = select(&index, &names)?;
            let graph = graph::analyze(&visitor, selected);
            graph.report(&mut io::stdout())?;
            io::stdout().flush()?;
            Ok(())
        }
    }
}

fn visitor_with(limit: Option<u64>) -> Visitor
{
    match limit {
        Some(limit) => Visitor::with_element_limit(limit),
        None => Visitor::new(),
    }
}

/// Read the target's executable, its DWARF, and its load bias, and index
/// every global with a static address.
fn load_symbols<'m>(pid: u32, mem: &'m ProcessMemory) -> Result<SymbolIndex<'m>>
{
    let exe: PathBuf = fs::read_link(format!("/proc/{pid}/exe"))?;
    let debug_info = DebugInfo::load(&exe)?;
    let maps = RegionMap::from_pid(pid)?;

    let bias = if debug_info.is_position_independent() {
        let exe_name = exe.to_string_lossy();
        maps.iter()
            .find(|r| r.description == exe_name)
            .map(|r| r.low)
            .unwrap_or(0)
    } else {
        0
    };

    let provider = exe
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());

    let mut index = SymbolIndex::new();
    let globals = debug_info.global_variables()?;
    info!("{} globals with static addresses in {}", globals.len(), exe.display());
    for global in globals {
        index.insert(SymbolEntry {
            name: global.name,
            value: Value::new(mem, global.address + bias, global.ty),
            origin: None,
            provider: provider.clone(),
        });
    }
    Ok(index)
}

/// Resolve requested names against the index; with no names, take every
/// indexed symbol.
fn select<'m>(index: &SymbolIndex<'m>, names: &[String]) -> Result<Vec<(String, Value<'m>)>>
{
    if names.is_empty() {
        return Ok(index.iter().map(|e| (e.name.clone(), e.value.clone())).collect());
    }
    let mut selected = Vec::new();
    for name in names {
        let (entry, matches) = index.resolve(name)?;
        if matches > 1 {
            warn!("{matches} symbols match {name:?}, using the first");
        }
        selected.push((entry.name.clone(), entry.value.clone()));
    }
    Ok(selected)
}
