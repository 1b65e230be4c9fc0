use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use zdb_core::eval::{evaluate_expression, ValueFormatter};
use zdb_core::{DebugData, DebugType, IndexConfig, Pc, Resolved, ScopeId, ScopeTag, TypeId, ZdbError, ZdbResult};
use zdb_utils::{debug, default_log_file, info, init_logging, init_logging_file_only, init_logging_with_level, LogFormat, LogLevel};

mod offline;

use offline::{OfflineVm, Slot};

/// Offline inspector for compiled script debug info.
#[derive(Parser, Debug)]
#[command(name = "zdb")]
#[command(version)]
#[command(about = "Inspect script debug info: line tables, scopes, symbols, and watch expressions", long_about = None)]
struct Cli
{
    /// Record a line-program checkpoint every N pcs
    #[arg(long, global = true, env = "ZDB_CHECKPOINT_STRIDE")]
    checkpoint_stride: Option<u32>,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Write logs to a dated file under ~/.zdb instead of stderr
    #[arg(long, global = true, default_value_t = false)]
    log_to_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Show a summary of a debug-info file
    Info
    {
        /// Path to the encoded debug info
        file: PathBuf,
    },
    /// Print the full scope tree and type table
    Dump
    {
        /// Path to the encoded debug info
        file: PathBuf,
    },
    /// Map a program counter to its source line and enclosing scopes
    Locate
    {
        /// Path to the encoded debug info
        file: PathBuf,
        /// Program counter (hex format: 0x10 or decimal)
        pc: String,
    },
    /// List the breakpoint pcs for a source line
    Breakpoints
    {
        /// Path to the encoded debug info
        file: PathBuf,
        /// Source file path as recorded by the compiler
        source: String,
        /// One-based line number
        line: i32,
    },
    /// Resolve an identifier as seen from a program counter
    Lookup
    {
        /// Path to the encoded debug info
        file: PathBuf,
        /// Identifier, optionally qualified (e.g. `game::Enemy::hp`)
        name: String,
        /// Resolve from the scope at this pc instead of the root
        #[arg(long)]
        pc: Option<String>,
    },
    /// Evaluate a watch expression against seeded VM state
    Eval
    {
        /// Path to the encoded debug info
        file: PathBuf,
        /// Expression text
        expression: String,
        /// Evaluate in the scope at this pc
        #[arg(long)]
        pc: Option<String>,
        /// Seed a stack slot: OFFSET=RAW (repeatable)
        #[arg(long = "stack", value_name = "OFFSET=RAW")]
        stack: Vec<String>,
        /// Seed a global: INDEX=RAW (repeatable)
        #[arg(long = "global", value_name = "INDEX=RAW")]
        globals: Vec<String>,
        /// Seed a register: ID=RAW (repeatable)
        #[arg(long = "register", value_name = "ID=RAW")]
        registers: Vec<String>,
        /// Expand arrays and objects over multiple lines
        #[arg(long, default_value_t = false)]
        expand: bool,
    },
}

fn main()
{
    let cli = Cli::parse();

    // Defaults to WARN and Pretty format unless RUST_LOG / ZDB_LOG_FORMAT say otherwise
    let logging = if cli.log_to_file {
        init_logging_file_only(&default_log_file(), LogFormat::Pretty, cli.log_level)
    } else if let Some(level) = cli.log_level {
        init_logging_with_level(level, LogFormat::Pretty)
    } else {
        init_logging()
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> ZdbResult<()>
{
    let config = match cli.checkpoint_stride {
        Some(stride) => IndexConfig::with_checkpoint_stride(stride)?,
        None => IndexConfig::default(),
    };

    match cli.command {
        Commands::Info { file } => {
            let data = load(&file, config)?;
            print_info(&data);
            Ok(())
        }
        Commands::Dump { file } => {
            let data = load(&file, config)?;
            print!("{}", data.dump());
            Ok(())
        }
        Commands::Locate { file, pc } => {
            let data = load(&file, config)?;
            let pc = parse_pc(&pc)?;
            print_location(&data, pc);
            Ok(())
        }
        Commands::Breakpoints { file, source, line } => {
            let data = load(&file, config)?;
            let file_index = data
                .source_file_index(&source)
                .ok_or_else(|| ZdbError::InvalidConfig(format!("no source file named '{source}'")))?;
            let pcs = data.resolve_all_pcs_from_source_location(file_index, line);
            if pcs.is_empty() {
                println!("No code at {source}:{line}");
            }
            for pc in pcs {
                let function = data
                    .resolve_function_scope(pc)
                    .and_then(|function| Some((function, data.find_function_prologue_end(function)?)));
                match function {
                    Some((function, body)) => println!(
                        "{:#06x}  {} (body at {:#06x})",
                        pc.value(),
                        data.full_scope_name(function),
                        body.value()
                    ),
                    None => println!("{:#06x}", pc.value()),
                }
            }
            Ok(())
        }
        Commands::Lookup { file, name, pc } => {
            let data = load(&file, config)?;
            let scope = pc.map(|pc| parse_pc(&pc)).transpose()?.and_then(|pc| data.resolve_scope_at(pc));
            print_lookup(&data, &name, scope);
            Ok(())
        }
        Commands::Eval {
            file,
            expression,
            pc,
            stack,
            globals,
            registers,
            expand,
        } => {
            let data = load(&file, config)?;
            let scope = pc.map(|pc| parse_pc(&pc)).transpose()?.and_then(|pc| data.resolve_scope_at(pc));

            let string_type = data
                .types()
                .iter()
                .position(|ty| *ty == DebugType::Array(TypeId::CHAR32))
                .map_or(TypeId::UNTYPED, TypeId::from_table_index);
            let mut vm = OfflineVm::new().with_string_type(string_type);
            for (seeds, slot) in [
                (&stack, Slot::Stack as fn(i32) -> Slot),
                (&globals, Slot::Global),
                (&registers, Slot::Register),
            ] {
                for seed in seeds {
                    let (key, raw) = parse_seed(seed)?;
                    vm.seed(slot(key), raw);
                }
            }

            let value = evaluate_expression(&data, scope, &mut vm, &expression)?;
            let mut formatter = ValueFormatter::new(&data, &mut vm);
            println!("{}", formatter.full(value, expand));
            Ok(())
        }
    }
}

fn load(path: &Path, config: IndexConfig) -> ZdbResult<DebugData>
{
    info!("Loading debug info from {}", path.display());
    let bytes = std::fs::read(path)?;
    let data = DebugData::decode_with_config(&bytes, config)?;
    debug!(
        files = data.source_files().len(),
        scopes = data.scopes().len(),
        symbols = data.symbols().len(),
        "decoded debug info"
    );
    Ok(data)
}

/// Parse a pc given as hex (`0x1f`) or decimal.
fn parse_pc(text: &str) -> ZdbResult<Pc>
{
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        text.parse::<u32>()
    };
    parsed
        .map(Pc::new)
        .map_err(|_| ZdbError::InvalidConfig(format!("invalid pc '{text}'")))
}

fn parse_seed(text: &str) -> ZdbResult<(i32, i32)>
{
    let invalid = || ZdbError::InvalidConfig(format!("expected KEY=RAW, got '{text}'"));
    let (key, raw) = text.split_once('=').ok_or_else(invalid)?;
    let key = key.trim().parse().map_err(|_| invalid())?;
    let raw = raw.trim().parse().map_err(|_| invalid())?;
    Ok((key, raw))
}

fn print_info(data: &DebugData)
{
    println!("Debug Information:");
    println!("  Format Version: {}", zdb_core::debug_data::VERSION);
    println!("  Source Files: {}", data.source_files().len());
    for file in data.source_files() {
        println!("    {}", file.path);
    }
    println!("  Line Rows: {}", data.line_table().len());
    println!("  Types: {}", data.types().len());
    println!("  Scopes: {}", data.scopes().len());
    println!("  Symbols: {}", data.symbols().len());
    println!("  Checkpoint Stride: {}", data.config().checkpoint_stride);
}

fn print_location(data: &DebugData, pc: Pc)
{
    let location = data.resolve_location(pc);
    match location.and_then(|loc| data.source_files().get(loc.file_index as usize).map(|file| (file, loc.line))) {
        Some((file, line)) => println!("{:#06x}  {}:{line}", pc.value(), file.path),
        None => println!("{:#06x}  <no line info>", pc.value()),
    }
    if let Some(function) = data.resolve_function_scope(pc) {
        println!("  function: {}", data.function_signature(function));
    }
    if let Some(class) = data.resolve_class_scope(pc) {
        println!("  class: {}", data.full_scope_name(class));
    }
    if let Some(scope) = data.resolve_scope_at(pc) {
        if let Some(block) = data.get_scope(scope).filter(|s| s.tag == ScopeTag::Block) {
            println!("  block: [{:#06x}, {:#06x}]", block.start_pc.value(), block.end_pc.value());
        }
        for symbol in data.child_symbols(scope) {
            println!("  local: {}", data.describe_symbol(*symbol));
        }
    }
}

fn print_lookup(data: &DebugData, name: &str, scope: Option<ScopeId>)
{
    match data.resolve_entity(name, scope) {
        Some(Resolved::Symbol(symbol)) => {
            println!("{}", data.describe_symbol(symbol));
            if let Some((file, line)) = data.symbol_location(symbol) {
                println!("  declared at {}:{line}", file.path);
            }
        }
        Some(Resolved::Scope(found)) => {
            let functions = data.resolve_functions(name, scope);
            if functions.len() > 1 || functions.contains(&found) {
                for function in functions {
                    println!("{}", data.function_signature(function));
                }
            } else if let Some(scope) = data.get_scope(found) {
                println!("[{}] {}", scope.tag.label(), data.full_scope_name(found));
            }
        }
        None => println!("'{name}' not found"),
    }
}
