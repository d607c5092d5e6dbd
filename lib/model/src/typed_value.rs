use crate::{ThinError, ThinResult};
use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, Literal, LiteralRef, NamedNode, NamedNodeRef, Term};
use oxsdatatypes::{Decimal, Double, Float, Integer};
use std::cmp::Ordering;
use std::str::FromStr;

/// Checks if the datatype is derived from `xsd:integer`.
pub fn is_integer_datatype(datatype: NamedNodeRef<'_>) -> bool {
    static INTEGER_DATATYPES: &[NamedNodeRef<'_>; 13] = &[
        xsd::INTEGER,
        xsd::BYTE,
        xsd::SHORT,
        xsd::INT,
        xsd::LONG,
        xsd::UNSIGNED_BYTE,
        xsd::UNSIGNED_SHORT,
        xsd::UNSIGNED_INT,
        xsd::UNSIGNED_LONG,
        xsd::POSITIVE_INTEGER,
        xsd::NEGATIVE_INTEGER,
        xsd::NON_POSITIVE_INTEGER,
        xsd::NON_NEGATIVE_INTEGER,
    ];
    INTEGER_DATATYPES.contains(&datatype)
}

/// Checks if the datatype is a numeric datatype.
pub fn is_numeric_datatype(datatype: NamedNodeRef<'_>) -> bool {
    is_integer_datatype(datatype)
        || datatype == xsd::DECIMAL
        || datatype == xsd::FLOAT
        || datatype == xsd::DOUBLE
}

/// A value of one of the numeric XSD datatypes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Numeric {
    Integer(Integer),
    Decimal(Decimal),
    Float(Float),
    Double(Double),
}

/// Two numerics promoted to the same type.
enum NumericPair {
    Integer(Integer, Integer),
    Decimal(Decimal, Decimal),
    Float(Float, Float),
    Double(Double, Double),
}

impl Numeric {
    /// Parses a numeric literal. Returns [None] for non-numeric and ill-typed literals.
    pub fn from_literal(literal: LiteralRef<'_>) -> Option<Self> {
        let datatype = literal.datatype();
        let value = literal.value();
        if is_integer_datatype(datatype) {
            Integer::from_str(value).ok().map(Numeric::Integer)
        } else if datatype == xsd::DECIMAL {
            Decimal::from_str(value).ok().map(Numeric::Decimal)
        } else if datatype == xsd::FLOAT {
            Float::from_str(value).ok().map(Numeric::Float)
        } else if datatype == xsd::DOUBLE {
            Double::from_str(value).ok().map(Numeric::Double)
        } else {
            None
        }
    }

    /// Creates an `xsd:integer` from a count.
    pub fn from_count(count: usize) -> Self {
        Numeric::Integer(Integer::from(i64::try_from(count).unwrap_or(i64::MAX)))
    }

    /// Converts the value into a literal with the canonical lexical form.
    pub fn to_literal(self) -> Literal {
        match self {
            Numeric::Integer(value) => Literal::new_typed_literal(value.to_string(), xsd::INTEGER),
            Numeric::Decimal(value) => Literal::new_typed_literal(value.to_string(), xsd::DECIMAL),
            Numeric::Float(value) => Literal::new_typed_literal(value.to_string(), xsd::FLOAT),
            Numeric::Double(value) => Literal::new_typed_literal(value.to_string(), xsd::DOUBLE),
        }
    }

    /// Returns the value as a native float.
    pub fn to_f64(self) -> f64 {
        match self {
            Numeric::Integer(value) => value.to_string().parse().unwrap_or(f64::NAN),
            Numeric::Decimal(value) => value.to_string().parse().unwrap_or(f64::NAN),
            Numeric::Float(value) => f64::from(f32::from(value)),
            Numeric::Double(value) => f64::from(value),
        }
    }

    /// Returns whether the value is zero or NaN, i.e., whether its effective boolean value is
    /// `false`.
    pub fn is_zero_or_nan(self) -> bool {
        let value = self.to_f64();
        value == 0.0 || value.is_nan()
    }

    /// [op:numeric-add](https://www.w3.org/TR/xpath-functions-31/#func-numeric-add)
    pub fn checked_add(self, rhs: Numeric) -> ThinResult<Numeric> {
        match promote(self, rhs) {
            NumericPair::Integer(lhs, rhs) => lhs.checked_add(rhs).map(Numeric::Integer),
            NumericPair::Decimal(lhs, rhs) => lhs.checked_add(rhs).map(Numeric::Decimal),
            NumericPair::Float(lhs, rhs) => {
                Some(Numeric::Float(Float::from(f32::from(lhs) + f32::from(rhs))))
            }
            NumericPair::Double(lhs, rhs) => {
                Some(Numeric::Double(Double::from(f64::from(lhs) + f64::from(rhs))))
            }
        }
        .ok_or(ThinError::default())
    }

    /// [op:numeric-subtract](https://www.w3.org/TR/xpath-functions-31/#func-numeric-subtract)
    pub fn checked_sub(self, rhs: Numeric) -> ThinResult<Numeric> {
        match promote(self, rhs) {
            NumericPair::Integer(lhs, rhs) => lhs.checked_sub(rhs).map(Numeric::Integer),
            NumericPair::Decimal(lhs, rhs) => lhs.checked_sub(rhs).map(Numeric::Decimal),
            NumericPair::Float(lhs, rhs) => {
                Some(Numeric::Float(Float::from(f32::from(lhs) - f32::from(rhs))))
            }
            NumericPair::Double(lhs, rhs) => {
                Some(Numeric::Double(Double::from(f64::from(lhs) - f64::from(rhs))))
            }
        }
        .ok_or(ThinError::default())
    }

    /// [op:numeric-multiply](https://www.w3.org/TR/xpath-functions-31/#func-numeric-multiply)
    pub fn checked_mul(self, rhs: Numeric) -> ThinResult<Numeric> {
        match promote(self, rhs) {
            NumericPair::Integer(lhs, rhs) => lhs.checked_mul(rhs).map(Numeric::Integer),
            NumericPair::Decimal(lhs, rhs) => lhs.checked_mul(rhs).map(Numeric::Decimal),
            NumericPair::Float(lhs, rhs) => {
                Some(Numeric::Float(Float::from(f32::from(lhs) * f32::from(rhs))))
            }
            NumericPair::Double(lhs, rhs) => {
                Some(Numeric::Double(Double::from(f64::from(lhs) * f64::from(rhs))))
            }
        }
        .ok_or(ThinError::default())
    }

    /// [op:numeric-divide](https://www.w3.org/TR/xpath-functions-31/#func-numeric-divide)
    ///
    /// Dividing two integers yields a decimal.
    pub fn checked_div(self, rhs: Numeric) -> ThinResult<Numeric> {
        match promote(self, rhs) {
            NumericPair::Integer(lhs, rhs) => Decimal::from(lhs)
                .checked_div(Decimal::from(rhs))
                .map(Numeric::Decimal),
            NumericPair::Decimal(lhs, rhs) => lhs.checked_div(rhs).map(Numeric::Decimal),
            NumericPair::Float(lhs, rhs) => {
                Some(Numeric::Float(Float::from(f32::from(lhs) / f32::from(rhs))))
            }
            NumericPair::Double(lhs, rhs) => {
                Some(Numeric::Double(Double::from(f64::from(lhs) / f64::from(rhs))))
            }
        }
        .ok_or(ThinError::default())
    }

    /// [op:numeric-unary-minus](https://www.w3.org/TR/xpath-functions-31/#func-numeric-unary-minus)
    pub fn checked_neg(self) -> ThinResult<Numeric> {
        match self {
            Numeric::Integer(value) => value.checked_neg().map(Numeric::Integer),
            Numeric::Decimal(value) => value.checked_neg().map(Numeric::Decimal),
            Numeric::Float(value) => Some(Numeric::Float(Float::from(-f32::from(value)))),
            Numeric::Double(value) => Some(Numeric::Double(Double::from(-f64::from(value)))),
        }
        .ok_or(ThinError::default())
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match promote(*self, *other) {
            NumericPair::Integer(lhs, rhs) => lhs.partial_cmp(&rhs),
            NumericPair::Decimal(lhs, rhs) => lhs.partial_cmp(&rhs),
            NumericPair::Float(lhs, rhs) => lhs.partial_cmp(&rhs),
            NumericPair::Double(lhs, rhs) => lhs.partial_cmp(&rhs),
        }
    }
}

/// Applies the numeric type promotion rules of XPath.
fn promote(lhs: Numeric, rhs: Numeric) -> NumericPair {
    match (lhs, rhs) {
        (Numeric::Integer(lhs), Numeric::Integer(rhs)) => NumericPair::Integer(lhs, rhs),
        (Numeric::Integer(lhs), Numeric::Decimal(rhs)) => {
            NumericPair::Decimal(Decimal::from(lhs), rhs)
        }
        (Numeric::Decimal(lhs), Numeric::Integer(rhs)) => {
            NumericPair::Decimal(lhs, Decimal::from(rhs))
        }
        (Numeric::Decimal(lhs), Numeric::Decimal(rhs)) => NumericPair::Decimal(lhs, rhs),
        (Numeric::Double(_), _) | (_, Numeric::Double(_)) => NumericPair::Double(
            Double::from(lhs.to_f64()),
            Double::from(rhs.to_f64()),
        ),
        _ => NumericPair::Float(to_float(lhs), to_float(rhs)),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Narrowing to xsd:float is the defined promotion"
)]
fn to_float(value: Numeric) -> Float {
    match value {
        Numeric::Float(value) => value,
        _ => Float::from(value.to_f64() as f32),
    }
}

/// An RDF term interpreted according to its datatype.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Boolean(bool),
    Numeric(Numeric),
    /// A simple literal or an `xsd:string`.
    SimpleLiteral(String),
    LanguageString {
        value: String,
        language: String,
    },
    /// A literal of an unsupported datatype or an ill-typed literal.
    OtherLiteral(Literal),
}

impl TypedValue {
    /// Interprets `term`. Ill-typed literals become [TypedValue::OtherLiteral].
    pub fn from_term(term: &Term) -> Self {
        match term {
            Term::NamedNode(node) => TypedValue::NamedNode(node.clone()),
            Term::BlankNode(node) => TypedValue::BlankNode(node.clone()),
            Term::Literal(literal) => Self::from_literal(literal),
        }
    }

    fn from_literal(literal: &Literal) -> Self {
        if let Some(language) = literal.language() {
            return TypedValue::LanguageString {
                value: literal.value().to_owned(),
                language: language.to_owned(),
            };
        }

        let datatype = literal.datatype();
        if datatype == xsd::STRING {
            return TypedValue::SimpleLiteral(literal.value().to_owned());
        }
        if datatype == xsd::BOOLEAN {
            return match literal.value() {
                "true" | "1" => TypedValue::Boolean(true),
                "false" | "0" => TypedValue::Boolean(false),
                _ => TypedValue::OtherLiteral(literal.clone()),
            };
        }
        match Numeric::from_literal(literal.as_ref()) {
            Some(numeric) => TypedValue::Numeric(numeric),
            None => TypedValue::OtherLiteral(literal.clone()),
        }
    }

    /// Converts the value back into a term.
    pub fn into_term(self) -> Term {
        match self {
            TypedValue::NamedNode(node) => node.into(),
            TypedValue::BlankNode(node) => node.into(),
            TypedValue::Boolean(value) => Literal::from(value).into(),
            TypedValue::Numeric(value) => value.to_literal().into(),
            TypedValue::SimpleLiteral(value) => Literal::new_simple_literal(value).into(),
            TypedValue::LanguageString { value, language } => {
                Literal::new_language_tagged_literal_unchecked(value, language).into()
            }
            TypedValue::OtherLiteral(literal) => literal.into(),
        }
    }

    /// Returns the numeric value, if any.
    pub fn as_numeric(&self) -> Option<Numeric> {
        match self {
            TypedValue::Numeric(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the lexical value and the language of string literals.
    pub fn as_string(&self) -> Option<(&str, Option<&str>)> {
        match self {
            TypedValue::SimpleLiteral(value) => Some((value, None)),
            TypedValue::LanguageString { value, language } => Some((value, Some(language))),
            _ => None,
        }
    }

    /// Computes the [effective boolean value](https://www.w3.org/TR/sparql11-query/#ebv).
    pub fn effective_boolean_value(&self) -> ThinResult<bool> {
        match self {
            TypedValue::Boolean(value) => Ok(*value),
            TypedValue::Numeric(value) => Ok(!value.is_zero_or_nan()),
            TypedValue::SimpleLiteral(value) => Ok(!value.is_empty()),
            _ => ThinError::expected(),
        }
    }
}

/// Returns the datatype of `literal`, taking language tags into account.
pub fn literal_datatype(literal: &Literal) -> NamedNode {
    if literal.language().is_some() {
        rdf::LANG_STRING.into_owned()
    } else {
        literal.datatype().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integer(value: i64) -> Numeric {
        Numeric::Integer(Integer::from(value))
    }

    #[test]
    fn integer_arithmetic() {
        assert_eq!(integer(2).checked_add(integer(3)), Ok(integer(5)));
        assert_eq!(integer(2).checked_sub(integer(3)), Ok(integer(-1)));
        assert_eq!(integer(2).checked_mul(integer(3)), Ok(integer(6)));
        assert_eq!(
            integer(i64::MAX).checked_add(integer(1)),
            ThinError::expected()
        );
    }

    #[test]
    fn integer_division_yields_decimal() {
        let result = integer(3).checked_div(integer(2)).unwrap();
        assert_eq!(
            result.to_literal(),
            Literal::new_typed_literal("1.5", xsd::DECIMAL)
        );
        assert!(integer(1).checked_div(integer(0)).is_err());
    }

    #[test]
    fn promotion_to_double() {
        let double = Numeric::Double(Double::from(0.5));
        assert_eq!(
            integer(1).checked_add(double).map(Numeric::to_f64),
            Ok(1.5)
        );
        assert_eq!(integer(1).partial_cmp(&double), Some(Ordering::Greater));
    }

    #[test]
    fn typed_value_round_trip_keeps_canonical_terms() {
        let term = Term::from(Literal::new_typed_literal("42", xsd::INTEGER));
        let value = TypedValue::from_term(&term);

        assert_eq!(value.as_numeric(), Some(integer(42)));
        assert_eq!(value.into_term(), term);
    }

    #[test]
    fn ill_typed_literals_are_other_literals() {
        let literal = Literal::new_typed_literal("abc", xsd::INTEGER);
        assert_eq!(
            TypedValue::from_term(&literal.clone().into()),
            TypedValue::OtherLiteral(literal)
        );
    }

    #[test]
    fn effective_boolean_value() {
        let ebv = |term: Term| TypedValue::from_term(&term).effective_boolean_value();

        assert_eq!(ebv(Literal::from(true).into()), Ok(true));
        assert_eq!(ebv(Literal::from(0).into()), Ok(false));
        assert_eq!(ebv(Literal::from("").into()), Ok(false));
        assert_eq!(ebv(Literal::from("a").into()), Ok(true));
        assert!(ebv(NamedNode::new_unchecked("http://example.com").into()).is_err());
    }
}
