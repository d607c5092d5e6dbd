mod numeric;
mod regex;
mod strings;
mod terms;

use crate::name::BuiltinName;
use rdf_delta_model::{Literal, Term, ThinError, ThinResult};

pub(crate) use numeric::{arithmetic, unary_minus, unary_plus, ArithmeticOp};
pub(crate) use regex::{compile_pattern, regex_match};

/// Invokes the builtin `name` on already evaluated arguments.
///
/// The number of arguments is checked when an expression is compiled. A mismatch at this point is
/// treated like any other type error.
pub(crate) fn invoke(name: BuiltinName, args: &[Term]) -> ThinResult<Term> {
    match (name, args) {
        (BuiltinName::Str, [arg]) => terms::str(arg),
        (BuiltinName::Lang, [arg]) => terms::lang(arg),
        (BuiltinName::Datatype, [arg]) => terms::datatype(arg),
        (BuiltinName::Iri, [arg]) => terms::iri(arg),
        (BuiltinName::IsIri, [arg]) => Ok(boolean(matches!(arg, Term::NamedNode(_)))),
        (BuiltinName::IsBlank, [arg]) => Ok(boolean(matches!(arg, Term::BlankNode(_)))),
        (BuiltinName::IsLiteral, [arg]) => Ok(boolean(matches!(arg, Term::Literal(_)))),
        (BuiltinName::IsNumeric, [arg]) => Ok(boolean(terms::is_numeric(arg))),
        (BuiltinName::StrDt, [value, datatype]) => terms::str_dt(value, datatype),
        (BuiltinName::StrLang, [value, language]) => terms::str_lang(value, language),
        (BuiltinName::StrLen, [arg]) => strings::str_len(arg),
        (BuiltinName::SubStr, [value, start]) => strings::substr(value, start, None),
        (BuiltinName::SubStr, [value, start, length]) => {
            strings::substr(value, start, Some(length))
        }
        (BuiltinName::UCase, [arg]) => strings::ucase(arg),
        (BuiltinName::LCase, [arg]) => strings::lcase(arg),
        (BuiltinName::StrStarts, [lhs, rhs]) => strings::str_starts(lhs, rhs),
        (BuiltinName::StrEnds, [lhs, rhs]) => strings::str_ends(lhs, rhs),
        (BuiltinName::Contains, [lhs, rhs]) => strings::contains(lhs, rhs),
        (BuiltinName::StrBefore, [lhs, rhs]) => strings::str_before(lhs, rhs),
        (BuiltinName::StrAfter, [lhs, rhs]) => strings::str_after(lhs, rhs),
        (BuiltinName::Concat, args) => strings::concat(args),
        (BuiltinName::LangMatches, [tag, range]) => strings::lang_matches(tag, range),
        (BuiltinName::Regex, [value, pattern]) => {
            let regex = compile_pattern(strings::simple_literal(pattern)?, None)?;
            regex_match(value, &regex)
        }
        (BuiltinName::Regex, [value, pattern, flags]) => {
            let regex = compile_pattern(
                strings::simple_literal(pattern)?,
                Some(strings::simple_literal(flags)?),
            )?;
            regex_match(value, &regex)
        }
        (BuiltinName::Abs, [arg]) => numeric::abs(arg),
        _ => ThinError::expected(),
    }
}

/// Returns whether `name` accepts `count` arguments.
pub(crate) fn accepts_arity(name: BuiltinName, count: usize) -> bool {
    match name {
        BuiltinName::Str
        | BuiltinName::Lang
        | BuiltinName::Datatype
        | BuiltinName::Iri
        | BuiltinName::IsIri
        | BuiltinName::IsBlank
        | BuiltinName::IsLiteral
        | BuiltinName::IsNumeric
        | BuiltinName::StrLen
        | BuiltinName::UCase
        | BuiltinName::LCase
        | BuiltinName::Abs => count == 1,
        BuiltinName::StrDt
        | BuiltinName::StrLang
        | BuiltinName::StrStarts
        | BuiltinName::StrEnds
        | BuiltinName::Contains
        | BuiltinName::StrBefore
        | BuiltinName::StrAfter
        | BuiltinName::LangMatches => count == 2,
        BuiltinName::SubStr | BuiltinName::Regex => count == 2 || count == 3,
        BuiltinName::Concat => true,
    }
}

pub(crate) fn boolean(value: bool) -> Term {
    Literal::from(value).into()
}
