//! `tealc` CLI driver.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use tealc::{CompilerConfig, EmitTarget};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum EmitArg {
    C,
    Sir,
    Both,
}

impl From<EmitArg> for EmitTarget {
    fn from(value: EmitArg) -> Self {
        match value {
            EmitArg::C => EmitTarget::C,
            EmitArg::Sir => EmitTarget::Sir,
            EmitArg::Both => EmitTarget::Both,
        }
    }
}

/// Compiles a Teal source file to portable C and/or a textual stack IR.
#[derive(Debug, ClapParser)]
#[command(name = "tealc", version, about)]
struct Cli {
    /// Path to a `.tl` source file.
    source: PathBuf,

    /// Skip the peephole optimizer.
    #[arg(long)]
    no_optimize: bool,

    /// Restrict output to one channel; default emits both.
    #[arg(long, value_enum, default_value = "both")]
    emit: EmitArg,

    /// Increase log verbosity; repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "tealc=info",
        1 => "tealc=debug",
        _ => "tealc=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.source.extension().and_then(|e| e.to_str()) != Some("tl") {
        tracing::error!(path = %cli.source.display(), "source file must end in .tl");
        return ExitCode::FAILURE;
    }

    let config = CompilerConfig::new()
        .with_optimize(!cli.no_optimize)
        .with_emit(cli.emit.into());

    match tealc::compile_file(&cli.source, &config) {
        Ok(output) => {
            if let Some(c_source) = &output.c_source {
                let out_path = tealc::c_output_path(&cli.source);
                if let Err(e) = std::fs::write(&out_path, c_source) {
                    tracing::error!(error = %e, path = %out_path.display(), "failed to write C output");
                    return ExitCode::FAILURE;
                }
                tracing::info!(path = %out_path.display(), "wrote C output");
            }
            if let Some(sir_text) = &output.sir_text {
                print!("{sir_text}");
            }
            tracing::info!("compilation succeeded");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "compilation failed");
            eprintln!("tealc: {e}");
            ExitCode::FAILURE
        }
    }
}
