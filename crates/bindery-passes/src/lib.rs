//! Directive generation for the bindery binding generator.
//!
//! A run builds one declaration tree per header, then drives an ordered
//! [`Pipeline`] of [`Pass`]es over all of them. Passes prune the tree,
//! share findings through [`Facts`] and write directives to an
//! [`OutputSink`] keyed by subsystem and [`Category`].
//!
//! # Architecture
//!
//! ```text
//! Ast ──► trim ─► resolve-types ─► flag-enums ─► interfaces ─► properties
//!         ─► constants ─► enums ─► refcounted ─► events ──► <out>/<subsystem>/_<category>.i
//! ```

mod framework;
pub mod passes;
mod settings;
mod sink;
#[cfg(test)]
mod testing;

pub use framework::{
    run_pass, subsystem_of, walk, Facts, FileUnit, Pass, PassContext, Pipeline, VisitEvent,
    VisitResult,
};
pub use settings::{names_type, Settings};
pub use sink::{Category, ChannelKey, OutputSink, OUTPUT_EXTENSION};
