#![doc(test(attr(deny(warnings))))]

//! Contains the incremental physical operators of RDF Delta.
//!
//! Every operator consumes one or more [BindingsStream](rdf_delta_common::BindingsStream)s of
//! tagged solutions and produces a new one. An addition or deletion on an input is translated
//! into the additions and deletions that keep the output equal to the result of evaluating the
//! operator on the current input multisets.

mod active_graph;
mod distinct;
mod extend;
mod filter;
mod group;
mod join;
mod metadata;
mod project;
mod quad_pattern;
mod union;
mod values;

#[cfg(test)]
mod test_utils;

pub use active_graph::ActiveGraph;
pub use distinct::DistinctStream;
pub use extend::ExtendStream;
pub use filter::{ExistsFilterStream, FilterStream};
pub use group::GroupStream;
pub use join::HashJoinStream;
pub use project::ProjectStream;
pub use quad_pattern::QuadPatternBindingsStream;
pub use union::UnionStream;
pub use values::ValuesStream;
