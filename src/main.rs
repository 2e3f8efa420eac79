use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use std::process::ExitCode;
use ucparse::{parse_program, read_input};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short = 'd', long = "debug", action)]
    debug: bool,

    #[arg(short = 'v', long = "verbose", action)]
    verbose: bool,

    #[arg(short = 'q', long = "quiet", action)]
    quiet: bool,

    /// Path to the file to be parsed
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Stop after lexing
    #[arg(long)]
    lex: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match (cli.debug, cli.verbose, cli.quiet) {
        (_, _, true) => "error",
        (true, _, _) => "debug",
        (_, true, _) => "info",
        (_, _, _) => "warn",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    // checked up front so the diagnostic names the path as given
    if !cli.input.exists() {
        eprintln!("Input {} not found", cli.input.display());
        return ExitCode::FAILURE;
    }

    let input = match read_input(&cli.input) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let source_name = cli.input.display().to_string();

    if cli.lex {
        return match ucparse::lexer::lex(&input) {
            Ok(tokens) => {
                log::debug!("Tokens: {tokens:#?}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    match parse_program(&input, &source_name) {
        Ok(program) => {
            println!("{program:#?}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
