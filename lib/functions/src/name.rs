use rdf_delta_model::NamedNode;
use std::fmt::{Display, Formatter};

/// The SPARQL builtin functions that can be evaluated.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BuiltinName {
    // Terms
    Str,
    Lang,
    Datatype,
    Iri,
    IsIri,
    IsBlank,
    IsLiteral,
    IsNumeric,
    StrDt,
    StrLang,
    // Strings
    StrLen,
    SubStr,
    UCase,
    LCase,
    StrStarts,
    StrEnds,
    Contains,
    StrBefore,
    StrAfter,
    Concat,
    LangMatches,
    Regex,
    // Numeric
    Abs,
}

impl Display for BuiltinName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BuiltinName::Str => "STR",
            BuiltinName::Lang => "LANG",
            BuiltinName::Datatype => "DATATYPE",
            BuiltinName::Iri => "IRI",
            BuiltinName::IsIri => "isIRI",
            BuiltinName::IsBlank => "isBLANK",
            BuiltinName::IsLiteral => "isLITERAL",
            BuiltinName::IsNumeric => "isNUMERIC",
            BuiltinName::StrDt => "STRDT",
            BuiltinName::StrLang => "STRLANG",
            BuiltinName::StrLen => "STRLEN",
            BuiltinName::SubStr => "SUBSTR",
            BuiltinName::UCase => "UCASE",
            BuiltinName::LCase => "LCASE",
            BuiltinName::StrStarts => "STRSTARTS",
            BuiltinName::StrEnds => "STRENDS",
            BuiltinName::Contains => "CONTAINS",
            BuiltinName::StrBefore => "STRBEFORE",
            BuiltinName::StrAfter => "STRAFTER",
            BuiltinName::Concat => "CONCAT",
            BuiltinName::LangMatches => "LANGMATCHES",
            BuiltinName::Regex => "REGEX",
            BuiltinName::Abs => "ABS",
        };
        f.write_str(name)
    }
}

/// Identifier for a function. Either it is a builtin (e.g., a SPARQL operation) or a custom
/// function.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum FunctionName {
    /// A builtin function.
    Builtin(BuiltinName),
    /// A custom function.
    Custom(NamedNode),
}

impl Display for FunctionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionName::Builtin(builtin) => builtin.fmt(f),
            FunctionName::Custom(name) => name.fmt(f),
        }
    }
}
