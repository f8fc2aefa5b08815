#![warn(clippy::panic)]
#![warn(clippy::expect_used)]

//! valcor is a faceted exploration engine for a syntactically annotated
//! verb-valency corpus that exists in two parallel orthographies: a native
//! script and a Latin transliteration.
//!
//! The engine turns a [`FilterState`] (verb selection, verb sense, up to
//! five co-occurring dependency constraints, morphological feature
//! selections, source subsets, exact-match searches and an occurrence-window
//! pagination cursor) into relational queries against a read-only corpus
//! store, and assembles the result pages: verb frequency lists, cascading
//! facet options, per-page sentence graphs with display-level token merging,
//! a standoff annotation export and the equivalent query string for the
//! other script.
//!
//! HTTP routing, sessions and template rendering are not part of this crate;
//! the request layer passes a parsed parameter multi-map and the carried
//! session values in, and renders the returned [`engine::Exploration`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod model;
pub mod translate;
pub mod types;

pub use config::CorpusConfig;
pub use engine::{Exploration, Explorer};
pub use errors::{Result, ValcorError};
pub use model::filter::{FilterState, Script, SessionCarry};
pub use model::params::ParamMap;
