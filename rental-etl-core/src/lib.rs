#![doc = "rental-etl-core: cleaning and load pipeline for rental listing exports."]

//! This crate contains all pipeline logic and data models for rental-etl: field coercion,
//! record cleaning, document mapping and the replace-semantics load protocol.
//! Store-specific sink implementations live outside this crate.
//!
//! # Usage
//! Add this as a dependency for all shared cleaning, mapping, config and load code.

pub mod clean;
pub mod coerce;
pub mod config;
pub mod contract;
pub mod document;
pub mod error;
pub mod literal;
pub mod load;
pub mod memory_sink;
pub mod pipeline;
pub mod record;
pub mod tabular;
