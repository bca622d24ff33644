//! Structural edits of the survey forest. Every public operation here runs as
//! one atomic transaction on the `Survey`: it either fully applies, with fresh
//! nested-set bounds, or leaves the survey untouched.
pub mod build;
pub mod remove;
pub mod reorder;
