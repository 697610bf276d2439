//! Core library for the freshservice-report command line application.
//!
//! The library exposes the building blocks behind the CLI and its tests.
//! ID parsing lives in [`freshservice::report::ids`], the remote service boundary in
//! [`freshservice::report::source`], per-asset enrichment in [`freshservice::report::pipeline`],
//! table flattening and output under [`freshservice::report::flatten`] and
//! [`freshservice::report::io`], and whole-run orchestration in [`freshservice::report::export`].

pub mod freshservice;

pub use freshservice::report::{
    ReportError, Result, config, error, export, flatten, ids, io, lookup, model, pipeline, source,
    throttle,
};

#[cfg(any(test, feature = "testing"))]
pub use freshservice::report::testing;
