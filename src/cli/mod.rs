//! # FernDB CLI Module
//!
//! A small interactive shell over an open store, wired up by the `ferndb`
//! binary:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            CLI Entry Point                   │
//! │            (bin/ferndb.rs)                   │
//! ├──────────────────────────────────────────────┤
//! │               REPL Loop                      │
//! │  - reads input via rustyline                 │
//! │  - dispatches set / get / del commands       │
//! │  - prints results, keeps going on errors     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Commands
//!
//! | Command             | Description                         |
//! |---------------------|-------------------------------------|
//! | `set <key> <value>` | Insert or update a key              |
//! | `get <key>`         | Print the value of a key            |
//! | `del <key>`         | Remove a key                        |
//! | `help`              | Show available commands             |
//! | `exit` / `quit`     | Leave the shell                     |
//!
//! Every `set` and `del` commits before the prompt returns.
//!
//! ## History
//!
//! Command history persists to `~/.ferndb_history`, overridable with the
//! `FERNDB_HISTORY` environment variable.

pub mod repl;

pub use repl::Repl;
