//! codereview - multi-language code scanner
//!
//! Each supported file is reviewed exactly once per scan: by a remote model
//! when one is configured and has capacity (with results remembered by
//! content hash), otherwise by built-in pattern analyzers.

pub mod ai;
pub mod analyzers;
pub mod cache;
pub mod cli;
pub mod config;
pub mod models;
pub mod reporters;
pub mod scanner;
pub mod storage;
