//! Interpreter for flow files: declarative descriptions of interconnected
//! shell commands, files, pipes, concatenations and stderr captures.
//!
//! A flow file declares named components of five kinds — `node`,
//! `file`, `pipe`, `concatenate` and `stderr` — and this crate, given a
//! flow file and the name of one *final* component, materializes that
//! component's byte stream on a caller-supplied output descriptor by
//! spawning child processes and wiring their standard streams through
//! anonymous pipes.
//!
//! The entry points are [`parse::parse_flow_file`], which reads and
//! validates a flow file into a [`catalog::Catalog`], and
//! [`eval::Evaluator`], which recursively realizes a named component's
//! output.
//!
//! # Examples
//!
//! ```no_run
//! use std::io;
//! use flowsh::{eval::Evaluator, parse::parse_flow_file};
//!
//! let catalog = parse_flow_file("flow.txt".as_ref())?;
//! let mut evaluator = Evaluator::new(&catalog);
//! evaluator.evaluate("final", &io::stdout())?;
//! # Ok::<(), flowsh::error::FlowError>(())
//! ```

pub mod catalog;
pub mod copier;
pub mod error;
pub mod eval;
pub mod parse;
pub mod posix;
pub mod process;
pub mod spawn;

pub use catalog::{Catalog, Component};
pub use error::{FlowError, Result};
pub use eval::Evaluator;
pub use parse::parse_flow_file;
