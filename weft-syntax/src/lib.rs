//! Static screening of weft extension scripts.
//!
//! Extension scripts use Python syntax. This crate parses a script into a
//! minimal [`Module`] model (imports, top-level constants and class
//! declarations) without executing anything, and answers two questions:
//!
//! - under which dotted names could a base [`Symbol`] be referenced from the
//!   script, given its own imports ([`Module::possible_names`])
//! - does the script declare a class deriving from one of those names
//!   ([`Module::is_candidate`], [`screen`])
//!
//! # Example
//!
//! ```ignore
//! use weft_syntax::{Module, NoExports, Symbol};
//!
//! let module = Module::parse("from weft import ext\nclass Foo(ext.Extension): ...")?;
//! let base = Symbol::new("weft.ext.Extension");
//!
//! assert_eq!(module.possible_names(&base, &NoExports), vec!["ext.Extension"]);
//! assert!(module.is_candidate(&base, &NoExports));
//! ```

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod error;
mod grammar;
mod keywords;
mod lexer;
mod model;
mod parser;
mod resolve;
mod symbol;

pub use error::{Error, Result, SourceContext};
pub use keywords::is_keyword;
pub use model::{Class, Constant, Import, Module};
pub use resolve::screen;
pub use symbol::{FileExports, NoExports, PackageExports, StaticExports, Symbol};
