mod builtins;
mod config;
mod env;
mod error;
mod eval;
mod parser;
mod printer;
mod session;
mod tokenizer;
mod value;

use clap::Parser;
use config::{WELCOME_MESSAGE, WELCOME_SUBTITLE};
use error::LispError;
use printer::print_string;
use rustyline::error::ReadlineError;
use rustyline::{Config, Editor};
use session::{create_session, Session, SessionOptions};
use std::path::PathBuf;
use std::rc::Rc;

/// A small Lisp interpreter for a Clojure-subset surface syntax
#[derive(Parser, Debug)]
#[command(name = "clj-interp")]
#[command(version = config::VERSION)]
#[command(about = "A small Lisp interpreter for a Clojure-subset surface syntax")]
struct CliArgs {
    /// Script file to execute (optional; starts a REPL when omitted)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Skip loading the standard macro library
    #[arg(long = "no-stdlib")]
    no_stdlib: bool,
}

fn build_session(no_stdlib: bool, output: Rc<dyn Fn(&str)>) -> Session {
    let entries = if no_stdlib { Vec::new() } else { config::default_entries() };
    create_session(SessionOptions {
        output: Some(output),
        entries,
        source_roots: Vec::new(),
        read_file: None,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let session = build_session(args.no_stdlib, Rc::new(|line: &str| println!("{}", line)));

    if let Some(path) = &args.script {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read script file {}: {}", path.display(), e))?;
        match session.evaluate(&contents) {
            Ok(_) => Ok(()),
            Err(e) => Err(format!("Error: {}", e).into()),
        }
    } else {
        run_repl(&session)
    }
}

fn run_repl(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl = Editor::<(), rustyline::history::DefaultHistory>::with_config(config)
        .map_err(|e| format!("failed to initialize REPL: {}", e))?;

    let history_file = ".clj_interp_history";
    let _ = rl.load_history(history_file);

    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);

    loop {
        let readline = rl.readline(&format!("{}=> ", session.current_ns()));
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "(exit)" || trimmed == "(quit)" {
                    println!("Goodbye!");
                    break;
                }
                match session.evaluate(trimmed) {
                    Ok(result) => println!("=> {}", print_string(&result)),
                    Err(e) => eprintln!("Error: {}", format_error(&e)),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(history_file);
    Ok(())
}

fn format_error(e: &LispError) -> String {
    e.to_string()
}
