//! # REPL - Read-Eval-Print Loop
//!
//! The interactive loop for the FernDB CLI. Reads commands with rustyline
//! (history, line editing), runs them against the open store, and prints
//! the outcome. Command errors are displayed and the loop continues; only
//! `exit`, `quit` or Ctrl-D terminate it.

use std::env;
use std::path::PathBuf;

use eyre::{Result, WrapErr};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::Kv;

const PROMPT: &str = "ferndb> ";

pub struct Repl {
    kv: Kv,
    editor: DefaultEditor,
}

fn history_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os("FERNDB_HISTORY") {
        return Some(PathBuf::from(path));
    }
    env::var_os("HOME").map(|home| PathBuf::from(home).join(".ferndb_history"))
}

impl Repl {
    pub fn new(kv: Kv) -> Result<Self> {
        let mut editor = DefaultEditor::new().wrap_err("failed to initialize line editor")?;

        if let Some(history) = history_path() {
            let _ = editor.load_history(&history);
        }

        Ok(Repl { kv, editor })
    }

    pub fn run(&mut self) -> Result<()> {
        println!("FernDB shell — store: {}", self.kv.path().display());
        println!("Type 'help' for the command list.");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(&line);
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => println!("^C"),
                Err(ReadlineError::Eof) => {
                    println!("Bye");
                    break;
                }
                Err(err) => {
                    eprintln!("Error reading input: {err}");
                    break;
                }
            }
        }

        if let Some(history) = history_path() {
            let _ = self.editor.save_history(&history);
        }
        Ok(())
    }

    /// Runs one command line; returns false when the shell should exit.
    fn handle_line(&mut self, line: &str) -> bool {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            return true;
        };

        match command {
            "exit" | "quit" => {
                println!("Bye");
                return false;
            }
            "help" => print_help(),
            "set" => {
                if parts.len() < 3 {
                    println!("Usage: set <key> <value>");
                    return true;
                }
                let key = parts[1];
                let value = parts[2..].join(" ");
                match self.kv.set(key.as_bytes(), value.as_bytes()) {
                    Ok(()) => println!("OK"),
                    Err(err) => eprintln!("Error: {err}"),
                }
            }
            "get" => {
                if parts.len() != 2 {
                    println!("Usage: get <key>");
                    return true;
                }
                match self.kv.get(parts[1].as_bytes()) {
                    Some(value) => println!("{}", String::from_utf8_lossy(&value)),
                    None => println!("(not found)"),
                }
            }
            "del" => {
                if parts.len() != 2 {
                    println!("Usage: del <key>");
                    return true;
                }
                match self.kv.del(parts[1].as_bytes()) {
                    Ok(true) => println!("OK"),
                    Ok(false) => println!("(not found)"),
                    Err(err) => eprintln!("Error: {err}"),
                }
            }
            other => {
                println!("Unknown command: {other}");
                println!("Available commands: set, get, del, help, exit");
            }
        }
        true
    }
}

fn print_help() {
    println!("Commands:");
    println!("  set <key> <value>   insert or update a key");
    println!("  get <key>           print the value of a key");
    println!("  del <key>           remove a key");
    println!("  help                show this message");
    println!("  exit                leave the shell");
}
