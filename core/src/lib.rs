#![warn(clippy::panic)]
#![warn(clippy::expect_used)]

//! Generic building blocks for the valcor corpus exploration engine.
//!
//! This crate contains the parts that are independent of any concrete corpus
//! or script: a typed predicate AST that renders to SQL with named parameter
//! binding (user values are never interpolated into query text), and
//! script-mapping primitives for orthographies that use multi-character
//! digraphs.

#[macro_use]
extern crate serde_derive;

pub mod errors;
pub mod script;
pub mod sql;
