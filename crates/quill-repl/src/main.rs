use std::{
    fs,
    io::{self, IsTerminal},
    path::Path,
};

use anyhow::Result;
use clap::{Arg, Command};
use quill_core::{init_tracing, QuillConfig};
use quill_repl::repl::{LineProcessResult, MultiLineCollector, Repl, ReplCommand};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let matches = Command::new("quill-repl")
        .version(quill_core::VERSION)
        .about("Interactive shell for composing Quill scripts")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("script")
                .long("script")
                .value_name("PATH")
                .help("XML script to open on startup"),
        )
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Run REPL commands from a file")
                .index(1),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug mode")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Extract command line options
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => QuillConfig::load(Path::new(path))?,
        None => QuillConfig::default(),
    };
    if matches.get_flag("debug") {
        config.debug = true;
    }
    let script_file = matches.get_one::<String>("script").cloned();
    let input_file = matches.get_one::<String>("file").cloned();

    println!("Quill REPL v{}", quill_core::VERSION);
    println!("Host: {} {}", config.game.name, config.game.version);

    if config.debug {
        println!("Debug mode: enabled");
    }

    // Create REPL over a fresh session
    let mut repl = Repl::new(config)?;

    if let Some(path) = script_file {
        match repl.handle_command(ReplCommand::Load(path)) {
            Ok(msg) => repl.notifier().on_output(&msg),
            Err(e) => repl.notifier().on_error(&format!("Error: {e}")),
        }
    }

    println!("Type .help for help, .quit to exit");
    println!();

    // Run REPL
    run_repl(&mut repl, input_file).await
}

async fn run_repl(repl: &mut Repl, input_file: Option<String>) -> Result<()> {
    use rustyline::{error::ReadlineError, DefaultEditor};

    let mut rl = DefaultEditor::new()?;
    let mut multiline = MultiLineCollector::new();

    // Check if we have a file argument
    let file_lines: Option<Vec<String>> = if let Some(filename) = input_file {
        let content = fs::read_to_string(&filename)?;
        info!(file = %filename, "running commands from file");
        Some(content.lines().map(|s| s.to_string()).collect())
    } else {
        None
    };

    let is_interactive = file_lines.is_none() && io::stdin().is_terminal();
    let mut file_line_iter = file_lines.as_ref().map(|lines| lines.iter());

    while repl.is_running() {
        let prompt = multiline.get_prompt();

        // Get the next line from either file or interactive input
        let line_result = if let Some(ref mut iter) = file_line_iter {
            if let Some(line) = iter.next() {
                Ok(line.clone())
            } else {
                // End of file
                break;
            }
        } else {
            rl.readline(prompt)
        };

        match line_result {
            Ok(line) => {
                let trimmed = line.trim();

                // Handle empty input and comments in command files
                if !multiline.is_collecting() && (trimmed.is_empty() || trimmed.starts_with('#')) {
                    continue;
                }

                // Check if it's a REPL command
                if !multiline.is_collecting() && trimmed.starts_with('.') {
                    rl.add_history_entry(&line)?;

                    // Echo input in non-interactive mode
                    if !is_interactive {
                        println!(">> {trimmed}");
                    }

                    match repl.parse_input(trimmed) {
                        Ok(command) => {
                            debug!(?command, "handling command");
                            match repl.handle_command(command) {
                                Ok(output) => repl.notifier().on_output(&output),
                                Err(e) => repl.notifier().on_error(&format!("Error: {e}")),
                            }
                        }
                        Err(e) => repl.notifier().on_error(&format!("Error: {e}")),
                    }
                } else {
                    // Process through multi-line collector
                    match multiline.process_line(&line) {
                        LineProcessResult::Complete(xml) => {
                            rl.add_history_entry(&xml)?;

                            // Echo input in non-interactive mode
                            if !is_interactive {
                                println!(">> {xml}");
                            }

                            // Build and append the block
                            match repl.execute(&xml) {
                                Ok((output, duration)) => {
                                    repl.notifier()
                                        .on_block_added(&output, duration, repl.is_quiet());
                                }
                                Err(e) => repl.notifier().on_error(&format!("Error: {e}")),
                            }
                        }
                        LineProcessResult::NeedMore => {
                            // Continue collecting lines
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                if multiline.is_collecting() {
                    // Cancel multi-line collection
                    println!("^C");
                    multiline.reset();
                } else {
                    println!("Use .quit to exit");
                }
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    // Show exit statistics
    repl.show_exit_stats();

    Ok(())
}
