//! File analyzers
//!
//! One remote analyzer backed by a hosted model plus pattern analyzers for
//! Python, JavaScript/TypeScript, SQL, JSON, Go, Java and Rust. The
//! [`AnalyzerRegistry`] picks analyzers by extension.

mod base;
mod go;
mod java;
mod javascript;
mod json;
mod python;
pub mod registry;
pub mod remote;
mod rust;
mod sql;

pub use base::{
    extension_of, language_for_extension, language_for_path, Analyzer, AnalyzerKind,
    AnalyzerResult,
};
pub use go::GoAnalyzer;
pub use java::JavaAnalyzer;
pub use javascript::JavaScriptAnalyzer;
pub use json::JsonAnalyzer;
pub use python::PythonAnalyzer;
pub use registry::AnalyzerRegistry;
pub use remote::{
    plan_batches, BatchSettings, RemoteAnalyzer, RemoteFile, RemoteOutcome, RemoteState,
    SkipReason,
};
pub use rust::RustAnalyzer;
pub use sql::SqlAnalyzer;
