//! Variant admission and gene knowledge tables.
//!
//! `normalize` turns heterogeneous protein notations into a canonical
//! short form and rejects variant classes the pipeline does not assess.
//! `classes` decides whether a concrete variant falls under a given FDA
//! indication. `gene_context` carries the curated gene-level tables the
//! tier engine and narrator consult.

pub mod classes;
pub mod gene_context;
pub mod normalize;

pub use normalize::{NormalizedVariant, Normalizer, RejectedVariant, VariantKind};
