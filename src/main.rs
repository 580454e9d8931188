//! Simple Exec - CLI Entry Point
//!
//! Commands:
//! - `simple-exec run <program>` - Run a program image or ASM file
//! - `simple-exec debug <program>` - Interactive debugger
//! - `simple-exec asm <source>` - Assemble to a program image
//! - `simple-exec disasm <image>` - Disassemble a program image

use clap::{Parser, Subcommand, ValueEnum};
use simple_exec::{Cpu, ProgramImage, ReportFormat, ReportSink, RunConfig, WriterSink};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "simple-exec")]
#[command(version)]
#[command(about = "An emulator of a small 16-bit accumulator machine")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the program image or ASM file to execute
        program: PathBuf,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Log every executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Report format
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
        /// Write reports to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// JSON run configuration; flags override it
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the program image or ASM file to debug
        program: PathBuf,
    },
    /// Assemble source to a program image
    Asm {
        /// Path to the source file
        source: PathBuf,
        /// Output image file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Disassemble a program image to readable text
    Disasm {
        /// Path to the program image or ASM file
        program: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, format, output, config }) => {
            let mut run_config = match config {
                Some(path) => RunConfig::load(&path).unwrap_or_else(|e| {
                    eprintln!("❌ Failed to load config {}: {}", path.display(), e);
                    std::process::exit(1);
                }),
                None => RunConfig::default(),
            };
            if max_cycles.is_some() {
                run_config.max_cycles = max_cycles;
            }
            if let Some(format) = format {
                run_config.format = format.into();
            }
            if output.is_some() {
                run_config.output = output;
            }
            run_config.trace |= trace;

            init_logging(cli.verbose, run_config.trace);
            run_program(&program, &run_config);
        }
        #[cfg(feature = "tui")]
        Some(Commands::Debug { program }) => {
            init_logging(cli.verbose, false);
            debug_program(&program);
        }
        Some(Commands::Asm { source, output }) => {
            init_logging(cli.verbose, false);
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { program }) => {
            init_logging(cli.verbose, false);
            disassemble_file(&program);
        }
        None => {
            println!("Simple Exec v{}", env!("CARGO_PKG_VERSION"));
            println!("A 16-bit accumulator machine emulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn init_logging(verbose: u8, trace: bool) {
    let filter = if trace {
        "warn,simple_exec=trace"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}

/// Load a program, assembling it first if it is an ASM file.
fn read_program(path: &Path) -> ProgramImage {
    use simple_exec::{assemble, load_image};

    let image = if path.extension().is_some_and(|ext| ext == "asm") {
        let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        });

        match assemble(&source) {
            Ok(image) => {
                log::info!("assembled {} words from {}", image.len(), path.display());
                image
            }
            Err(e) => {
                eprintln!("❌ Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match load_image(path) {
            Ok(image) => {
                log::info!("loaded {} words from {}", image.len(), path.display());
                image
            }
            Err(e) => {
                eprintln!("❌ Failed to load program image: {}", e);
                std::process::exit(1);
            }
        }
    };

    if image.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }

    image
}

fn run_program(path: &Path, config: &RunConfig) {
    let image = read_program(path);

    let mut cpu = Cpu::new();
    if let Err(e) = image.load_into(&mut cpu) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    let writer: Box<dyn Write> = match &config.output {
        Some(out) => match std::fs::File::create(out) {
            Ok(file) => Box::new(std::io::BufWriter::new(file)),
            Err(e) => {
                eprintln!("❌ Failed to create {}: {}", out.display(), e);
                std::process::exit(1);
            }
        },
        None => Box::new(std::io::stdout().lock()),
    };
    let mut sink = WriterSink::new(writer, config.format);

    let result = match config.max_cycles {
        Some(max) => cpu.run_limited(max, &mut sink),
        None => cpu.run(&mut sink),
    };

    // Every fatal fault ends up here: flush what we know, then terminate.
    let fault = match result {
        Ok(executed) => {
            if cpu.is_running() {
                log::warn!("stopped after reaching the limit of {} instructions", executed);
            }
            None
        }
        Err(e) => {
            sink.emit(cpu.fault_report(&e));
            Some(e)
        }
    };

    if let Err(e) = sink.finish() {
        eprintln!("❌ Failed to write reports: {}", e);
        std::process::exit(1);
    }

    if let Some(e) = fault {
        eprintln!("❌ Fatal error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &Path) {
    use simple_exec::tui::run_debugger;

    let image = read_program(path);

    if let Err(e) = run_debugger(image) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

fn assemble_file(source_path: &Path, output: Option<PathBuf>) {
    use simple_exec::{assemble, save_image};

    let out_path = output.unwrap_or_else(|| source_path.with_extension("img"));

    println!("📝 Assembling: {} → {}", source_path.display(), out_path.display());

    // Read source
    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    // Assemble
    let image = match assemble(&source) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} words", image.len());

    if let Err(e) = save_image(&out_path, &image) {
        eprintln!("❌ Failed to save program image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path.display());
}

fn disassemble_file(path: &Path) {
    use simple_exec::disassemble;

    let image = read_program(path);
    println!("{}", disassemble(&image));
}
