use crate::scalar::boolean;
use rdf_delta_model::vocab::xsd;
use rdf_delta_model::{Literal, Numeric, Term, ThinError, ThinResult, TypedValue};

/// A borrowed simple literal or language-tagged string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct StringLiteralRef<'a> {
    pub value: &'a str,
    pub language: Option<&'a str>,
}

impl StringLiteralRef<'_> {
    fn into_term(self, value: impl Into<String>) -> Term {
        string_term(value, self.language)
    }
}

/// Interprets `term` as a string literal.
pub(super) fn string_literal(term: &Term) -> ThinResult<StringLiteralRef<'_>> {
    let Term::Literal(literal) = term else {
        return ThinError::expected();
    };
    if let Some(language) = literal.language() {
        return Ok(StringLiteralRef {
            value: literal.value(),
            language: Some(language),
        });
    }
    if literal.datatype() == xsd::STRING {
        return Ok(StringLiteralRef {
            value: literal.value(),
            language: None,
        });
    }
    ThinError::expected()
}

/// Interprets `term` as a literal without a language tag.
pub(super) fn simple_literal(term: &Term) -> ThinResult<&str> {
    match string_literal(term)? {
        StringLiteralRef {
            value,
            language: None,
        } => Ok(value),
        _ => ThinError::expected(),
    }
}

fn string_term(value: impl Into<String>, language: Option<&str>) -> Term {
    match language {
        Some(language) => Literal::new_language_tagged_literal_unchecked(value, language).into(),
        None => Literal::new_simple_literal(value).into(),
    }
}

/// Checks whether the two arguments are [compatible](https://www.w3.org/TR/sparql11-query/#func-arg-compatibility).
fn compatible_args<'a>(
    lhs: &'a Term,
    rhs: &'a Term,
) -> ThinResult<(StringLiteralRef<'a>, StringLiteralRef<'a>)> {
    let lhs = string_literal(lhs)?;
    let rhs = string_literal(rhs)?;
    match rhs.language {
        None => Ok((lhs, rhs)),
        Some(language) if lhs.language == Some(language) => Ok((lhs, rhs)),
        Some(_) => ThinError::expected(),
    }
}

/// [STRLEN](https://www.w3.org/TR/sparql11-query/#func-strlen)
pub(super) fn str_len(arg: &Term) -> ThinResult<Term> {
    let value = string_literal(arg)?;
    Ok(Numeric::from_count(value.value.chars().count())
        .to_literal()
        .into())
}

/// [SUBSTR](https://www.w3.org/TR/sparql11-query/#func-substr)
///
/// Positions are 1-based and rounded like `fn:round`.
pub(super) fn substr(value: &Term, start: &Term, length: Option<&Term>) -> ThinResult<Term> {
    let value = string_literal(value)?;
    let start = xpath_round(numeric_arg(start)?);
    let end = match length {
        Some(length) => start + xpath_round(numeric_arg(length)?),
        None => f64::INFINITY,
    };

    let result = value
        .value
        .chars()
        .enumerate()
        .filter(|(idx, _)| {
            let position = position_to_f64(*idx + 1);
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect::<String>();
    Ok(value.into_term(result))
}

fn numeric_arg(term: &Term) -> ThinResult<f64> {
    TypedValue::from_term(term)
        .as_numeric()
        .map(Numeric::to_f64)
        .ok_or(ThinError::default())
}

fn xpath_round(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[allow(
    clippy::cast_precision_loss,
    reason = "String positions are far below the precision limit"
)]
fn position_to_f64(position: usize) -> f64 {
    position as f64
}

/// [UCASE](https://www.w3.org/TR/sparql11-query/#func-ucase)
pub(super) fn ucase(arg: &Term) -> ThinResult<Term> {
    let value = string_literal(arg)?;
    Ok(value.into_term(value.value.to_uppercase()))
}

/// [LCASE](https://www.w3.org/TR/sparql11-query/#func-lcase)
pub(super) fn lcase(arg: &Term) -> ThinResult<Term> {
    let value = string_literal(arg)?;
    Ok(value.into_term(value.value.to_lowercase()))
}

/// [STRSTARTS](https://www.w3.org/TR/sparql11-query/#func-strstarts)
pub(super) fn str_starts(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let (lhs, rhs) = compatible_args(lhs, rhs)?;
    Ok(boolean(lhs.value.starts_with(rhs.value)))
}

/// [STRENDS](https://www.w3.org/TR/sparql11-query/#func-strends)
pub(super) fn str_ends(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let (lhs, rhs) = compatible_args(lhs, rhs)?;
    Ok(boolean(lhs.value.ends_with(rhs.value)))
}

/// [CONTAINS](https://www.w3.org/TR/sparql11-query/#func-contains)
pub(super) fn contains(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let (lhs, rhs) = compatible_args(lhs, rhs)?;
    Ok(boolean(lhs.value.contains(rhs.value)))
}

/// [STRBEFORE](https://www.w3.org/TR/sparql11-query/#func-strbefore)
pub(super) fn str_before(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let (lhs, rhs) = compatible_args(lhs, rhs)?;
    Ok(match lhs.value.find(rhs.value) {
        Some(idx) => lhs.into_term(&lhs.value[..idx]),
        None => string_term("", None),
    })
}

/// [STRAFTER](https://www.w3.org/TR/sparql11-query/#func-strafter)
pub(super) fn str_after(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let (lhs, rhs) = compatible_args(lhs, rhs)?;
    Ok(match lhs.value.find(rhs.value) {
        Some(idx) => lhs.into_term(&lhs.value[idx + rhs.value.len()..]),
        None => string_term("", None),
    })
}

/// [CONCAT](https://www.w3.org/TR/sparql11-query/#func-concat)
///
/// The result keeps the language tag if all arguments share it.
pub(super) fn concat(args: &[Term]) -> ThinResult<Term> {
    let mut result = String::new();
    let mut language: Option<Option<&str>> = None;
    for arg in args {
        let value = string_literal(arg)?;
        result.push_str(value.value);
        language = match language {
            None => Some(value.language),
            Some(current) if current == value.language => Some(current),
            Some(_) => Some(None),
        };
    }
    Ok(string_term(result, language.flatten()))
}

/// [LANGMATCHES](https://www.w3.org/TR/sparql11-query/#func-langMatches)
pub(super) fn lang_matches(tag: &Term, range: &Term) -> ThinResult<Term> {
    let tag = simple_literal(tag)?;
    let range = simple_literal(range)?;

    let matches = if range == "*" {
        !tag.is_empty()
    } else {
        let tag = tag.to_ascii_lowercase();
        let range = range.to_ascii_lowercase();
        tag == range
            || tag
                .strip_prefix(&range)
                .is_some_and(|rest| rest.starts_with('-'))
    };
    Ok(boolean(matches))
}
