// lib.rs
pub mod commands;
pub mod consensus;
pub mod context;
pub mod coverage;
pub mod faidx;
pub mod merge;
pub mod orient;
pub mod overlap;
pub mod resolve;
pub mod scaffold;
pub mod sequence_index;
pub mod trim;
