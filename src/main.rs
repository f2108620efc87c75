// helium - CLI for the Helium scripting language compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{LevelFilter, debug, info};

use helium_parser::display_tokens;
use helium_parser::lexer::lexify;
use helium_vm::disasm::disassemble_program;
use helium_vm::{Compiler, Program};

#[derive(Parser, Debug)]
#[command(name = "helium", version, about = "Compile a Helium script to bytecode")]
struct Cli {
    /// The source file to compile
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Trace the lexer, parser and compiler stages
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if simple_logger::SimpleLogger::new().with_level(level).init().is_err() {
        eprintln!("failed to initialise logging");
    }

    let origin = cli.file.to_string_lossy().to_string();
    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("failed to read '{}': {}", origin, e);
            process::exit(1);
        }
    };

    info!("compiling {}", origin);
    let program = compile(&source, &origin);
    print!("{}", disassemble_program(&program));
}

/// Run the pipeline stage by stage so each one can be traced, exiting
/// nonzero on the first error.
fn compile(source: &str, origin: &str) -> Program {
    let tokens = match lexify(source, origin) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    debug!("tokens:\n{}", display_tokens(&tokens));

    let tree = match helium_parser::Parser::parse(&tokens, source) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    debug!("syntax tree: {}", tree);

    match Compiler::new(source, origin).compile(&tree) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
