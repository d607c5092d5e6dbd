mod bindings;
mod delta_quad;
mod error;
mod order;
mod quad_pattern;
mod typed_value;

pub use bindings::*;
pub use delta_quad::*;
pub use error::*;
pub use order::*;
pub use quad_pattern::*;
pub use typed_value::*;

// Re-export some oxrdf types.
pub use oxiri::Iri;
pub use oxrdf::vocab;
pub use oxrdf::{
    BlankNode, BlankNodeRef, GraphName, GraphNameRef, IriParseError, Literal, LiteralRef,
    NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, QuadRef, Subject,
    SubjectRef, Term, TermRef, Triple, TripleRef, Variable, VariableNameParseError, VariableRef,
};
pub use oxsdatatypes::{Boolean, Decimal, Double, Float, Integer};

// Re-export the query patterns of spargebra.
pub use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};
pub use spargebra::SparqlSyntaxError;
