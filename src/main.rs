use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use miette::{IntoDiagnostic, WrapErr};
use calc::*;
use std::{fs, io::{self, Write}};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Tokenize { filename: PathBuf },
    Parse { filename: PathBuf },
    Eval {
        expression: String,
        #[arg(short, long, value_enum, default_value_t)]
        mode: OutputMode,
    },
    Calc {
        #[arg(short, long, value_enum, default_value_t)]
        mode: OutputMode,
    },
}

fn read_line_file(filename: &Path) -> miette::Result<String> {
    let file_contents = fs::read_to_string(filename)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading '{}' failed", filename.display()))?;
    Ok(file_contents.trim().to_string())
}

fn report(input: &str, err: PipelineError) -> miette::Report {
    miette::Report::new(err).with_source_code(input.to_string())
}

/// Recognises `:mode <name>`. Any other line, `:modeprefix` included, is not a
/// mode command.
fn mode_command(input: &str) -> Option<Result<OutputMode, String>> {
    let mut words = input.split_whitespace();
    if words.next() != Some(":mode") {
        return None;
    }
    let name = words.collect::<Vec<_>>().join(" ");
    Some(OutputMode::from_str(&name, true).map_err(|_| name))
}

fn main() -> miette::Result<()> {
    let dotenv = dotenvy::dotenv();
    env_logger::init();
    if let Err(e) = dotenv {
        debug!("no .env loaded: {e}");
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Tokenize { filename } => {
            let input = read_line_file(&filename)?;
            for token in Lexer::new(&input) {
                match token {
                    Ok(token) => println!("{:?} {}", token.kind, token),
                    Err(err) => return Err(report(&input, err.into())),
                }
            }
        }
        Commands::Parse { filename } => {
            let input = read_line_file(&filename)?;
            match parse_line(&input) {
                Ok(expr) => println!("{expr}"),
                Err(e) => eprintln!("{:?}", report(&input, e)),
            }
        }
        Commands::Eval { expression, mode } => {
            let output = evaluate_line(&expression, mode).map_err(|e| report(&expression, e))?;
            println!("{output}");
        }
        Commands::Calc { mut mode } => {
            info!("starting calc in {mode} mode");
            let stdin = io::stdin();
            loop {
                print!("calc> ");
                io::stdout().flush().into_diagnostic()?;

                let mut input = String::new();
                let read = stdin
                    .read_line(&mut input)
                    .into_diagnostic()
                    .wrap_err("reading from stdin failed")?;
                if read == 0 {
                    println!();
                    break;
                }

                let input = input.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") {
                    break;
                }
                if let Some(switch) = mode_command(input) {
                    match switch {
                        Ok(m) => {
                            mode = m;
                            println!("mode: {mode}");
                        }
                        Err(name) => eprintln!("unknown mode '{name}', expected numeric, postfix or prefix"),
                    }
                    continue;
                }

                match evaluate_line(input, mode) {
                    Ok(res) => println!("{res}"),
                    Err(err) => eprintln!("{:?}", report(input, err)),
                }
            }
        }
    }

    Ok(())
}
