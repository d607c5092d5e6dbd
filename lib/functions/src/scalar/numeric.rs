use rdf_delta_model::{Numeric, Term, ThinError, ThinResult, TypedValue};

/// A binary arithmetic operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

fn numeric(term: &Term) -> ThinResult<Numeric> {
    TypedValue::from_term(term)
        .as_numeric()
        .ok_or(ThinError::default())
}

/// Applies `op` after promoting both operands to a common numeric type.
pub(crate) fn arithmetic(op: ArithmeticOp, lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let lhs = numeric(lhs)?;
    let rhs = numeric(rhs)?;
    let result = match op {
        ArithmeticOp::Add => lhs.checked_add(rhs),
        ArithmeticOp::Subtract => lhs.checked_sub(rhs),
        ArithmeticOp::Multiply => lhs.checked_mul(rhs),
        ArithmeticOp::Divide => lhs.checked_div(rhs),
    }?;
    Ok(result.to_literal().into())
}

pub(crate) fn unary_plus(arg: &Term) -> ThinResult<Term> {
    Ok(numeric(arg)?.to_literal().into())
}

pub(crate) fn unary_minus(arg: &Term) -> ThinResult<Term> {
    Ok(numeric(arg)?.checked_neg()?.to_literal().into())
}

/// [ABS](https://www.w3.org/TR/sparql11-query/#func-abs)
pub(super) fn abs(arg: &Term) -> ThinResult<Term> {
    let value = numeric(arg)?;
    let zero = Numeric::from_count(0);
    let result = if value < zero {
        value.checked_neg()?
    } else {
        value
    };
    Ok(result.to_literal().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_delta_model::vocab::xsd;
    use rdf_delta_model::Literal;

    #[test]
    fn integer_division_yields_a_decimal() {
        let result = arithmetic(
            ArithmeticOp::Divide,
            &Literal::from(1).into(),
            &Literal::from(4).into(),
        );
        assert_eq!(
            result,
            Ok(Literal::new_typed_literal("0.25", xsd::DECIMAL).into())
        );
    }

    #[test]
    fn non_numeric_operands_are_errors() {
        let result = arithmetic(
            ArithmeticOp::Add,
            &Literal::from(1).into(),
            &Literal::new_simple_literal("1").into(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn abs_of_negative_values() {
        assert_eq!(abs(&Literal::from(-3).into()), Ok(Literal::from(3).into()));
        assert_eq!(abs(&Literal::from(3).into()), Ok(Literal::from(3).into()));
    }
}
