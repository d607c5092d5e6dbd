use crate::scalar::strings::{simple_literal, string_literal};
use rdf_delta_model::{
    literal_datatype, Literal, NamedNode, Term, ThinError, ThinResult, TypedValue,
};

/// [STR](https://www.w3.org/TR/sparql11-query/#func-str)
pub(super) fn str(arg: &Term) -> ThinResult<Term> {
    match arg {
        Term::NamedNode(node) => Ok(Literal::new_simple_literal(node.as_str()).into()),
        Term::Literal(literal) => Ok(Literal::new_simple_literal(literal.value()).into()),
        Term::BlankNode(_) => ThinError::expected(),
    }
}

/// [LANG](https://www.w3.org/TR/sparql11-query/#func-lang)
pub(super) fn lang(arg: &Term) -> ThinResult<Term> {
    match arg {
        Term::Literal(literal) => {
            Ok(Literal::new_simple_literal(literal.language().unwrap_or_default()).into())
        }
        _ => ThinError::expected(),
    }
}

/// [DATATYPE](https://www.w3.org/TR/sparql11-query/#func-datatype)
pub(super) fn datatype(arg: &Term) -> ThinResult<Term> {
    match arg {
        Term::Literal(literal) => Ok(literal_datatype(literal).into()),
        _ => ThinError::expected(),
    }
}

/// [IRI](https://www.w3.org/TR/sparql11-query/#func-iri)
///
/// Only absolute IRIs are supported.
pub(super) fn iri(arg: &Term) -> ThinResult<Term> {
    match arg {
        Term::NamedNode(node) => Ok(node.clone().into()),
        Term::Literal(_) => Ok(NamedNode::new(simple_literal(arg)?)?.into()),
        Term::BlankNode(_) => ThinError::expected(),
    }
}

/// [isNUMERIC](https://www.w3.org/TR/sparql11-query/#func-isNumeric)
///
/// Ill-typed numeric literals are not numeric.
pub(super) fn is_numeric(arg: &Term) -> bool {
    matches!(TypedValue::from_term(arg), TypedValue::Numeric(_))
}

/// [STRDT](https://www.w3.org/TR/sparql11-query/#func-strdt)
pub(super) fn str_dt(value: &Term, datatype: &Term) -> ThinResult<Term> {
    let Term::NamedNode(datatype) = datatype else {
        return ThinError::expected();
    };
    Ok(Literal::new_typed_literal(simple_literal(value)?, datatype.clone()).into())
}

/// [STRLANG](https://www.w3.org/TR/sparql11-query/#func-strlang)
pub(super) fn str_lang(value: &Term, language: &Term) -> ThinResult<Term> {
    let value = simple_literal(value)?;
    let language = string_literal(language)?;
    if language.language.is_some() {
        return ThinError::expected();
    }
    Literal::new_language_tagged_literal(value, language.value)
        .map(Term::from)
        .map_err(|_| ThinError::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_delta_model::vocab::{rdf, xsd};
    use rdf_delta_model::BlankNode;

    #[test]
    fn str_of_terms() {
        let iri = Term::from(NamedNode::new_unchecked("http://example.com"));
        assert_eq!(
            str(&iri),
            Ok(Literal::new_simple_literal("http://example.com").into())
        );
        assert_eq!(
            str(&Literal::from(12).into()),
            Ok(Literal::new_simple_literal("12").into())
        );
        assert!(str(&BlankNode::new_unchecked("b").into()).is_err());
    }

    #[test]
    fn datatype_of_language_strings() {
        let literal = Literal::new_language_tagged_literal_unchecked("chat", "fr");
        assert_eq!(datatype(&literal.into()), Ok(rdf::LANG_STRING.into_owned().into()));
        assert_eq!(
            datatype(&Literal::from(1).into()),
            Ok(xsd::INTEGER.into_owned().into())
        );
    }

    #[test]
    fn str_lang_validates_the_tag() {
        let value = Term::from(Literal::new_simple_literal("chat"));
        assert_eq!(
            str_lang(&value, &Literal::new_simple_literal("fr").into()),
            Ok(Literal::new_language_tagged_literal_unchecked("chat", "fr").into())
        );
        assert!(str_lang(&value, &Literal::new_simple_literal("not a tag").into()).is_err());
    }
}
