use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use fileio::input::SourceDir;

mod codegen;
mod error;
mod fileio;
mod tokenizer;

/// Compiler from the Jack language to Hack VM instructions.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Path to a `.jack` file, or to a directory of them.
    path: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let source_dir = match SourceDir::setup(&cli.path) {
        Ok(source_dir) => source_dir,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;

    for (file_path, file) in source_dir {
        match file {
            Err(error) => {
                eprintln!("Unable to load file at `{file_path:#?}`: {error}");
                failed = true;
            }
            Ok(file_info) => match codegen::compile_module(&file_info) {
                Ok(output_file) => {
                    log::info!(
                        "compiled `{}` => `{}.vm`",
                        file_info.module_name(),
                        output_file.name()
                    );

                    if let Err(error) = fileio::output::generate(&file_path, &output_file) {
                        eprintln!("Unable to write output for `{file_path:#?}`: {error}");
                        failed = true;
                    }
                }
                Err(error) => {
                    error_report::display(
                        file_path.to_string_lossy().as_ref(),
                        file_info.content(),
                        &error,
                    );
                    failed = true;
                }
            },
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

mod error_report {
    use ariadne::{Label, Report, ReportKind, Source};

    use crate::error::CompileError;

    pub fn display(file_path: &str, file_content: &str, error: &CompileError) {
        // scope errors are detected past the offending token
        // and carry no source span to label
        let Some(span) = error.span() else {
            eprintln!("Error in `{file_path}`: {error}");
            return;
        };

        Report::build(ReportKind::Error, file_path, span.start)
            .with_message("Compilation error")
            .with_label(Label::new((file_path, span)).with_message(error.to_string()))
            .finish()
            .eprint((file_path, Source::from(file_content)))
            .expect("error report should be valid");
    }
}
