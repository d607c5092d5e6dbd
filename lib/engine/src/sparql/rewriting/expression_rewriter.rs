use rdf_delta_common::error::QueryEvaluationError;
use rdf_delta_functions::{ExpressionEvaluator, SparqlExpressionEvaluator};
use spargebra::algebra::{Expression, GraphPattern};
use std::sync::Arc;

/// A single condition of a `FILTER`.
#[derive(Debug)]
pub(super) enum FilterCondition<'a> {
    /// `EXISTS { ... }` or `NOT EXISTS { ... }`.
    Exists {
        pattern: &'a GraphPattern,
        negated: bool,
    },
    /// Any other expression.
    Expression(&'a Expression),
}

/// Splits a filter expression into its conjuncts. Existence checks that appear as a conjunct are
/// evaluated by their own operator.
pub(super) fn filter_conditions(expression: &Expression) -> Vec<FilterCondition<'_>> {
    match expression {
        Expression::And(lhs, rhs) => {
            let mut conditions = filter_conditions(lhs);
            conditions.extend(filter_conditions(rhs));
            conditions
        }
        Expression::Exists(pattern) => vec![FilterCondition::Exists {
            pattern: pattern.as_ref(),
            negated: false,
        }],
        Expression::Not(inner) => match inner.as_ref() {
            Expression::Exists(pattern) => vec![FilterCondition::Exists {
                pattern: pattern.as_ref(),
                negated: true,
            }],
            _ => vec![FilterCondition::Expression(expression)],
        },
        _ => vec![FilterCondition::Expression(expression)],
    }
}

/// Compiles a scalar expression.
///
/// Existence checks can only be evaluated by an operator and are rejected if they are nested
/// within a scalar expression.
pub(super) fn rewrite_expression(
    expression: &Expression,
) -> Result<Arc<dyn ExpressionEvaluator>, QueryEvaluationError> {
    if contains_exists(expression) {
        return QueryEvaluationError::not_implemented(
            "Nested existence filters are currently not supported.",
        );
    }
    Ok(Arc::new(SparqlExpressionEvaluator::try_new(expression)?))
}

fn contains_exists(expression: &Expression) -> bool {
    match expression {
        Expression::Exists(_) => true,
        Expression::NamedNode(_)
        | Expression::Literal(_)
        | Expression::Variable(_)
        | Expression::Bound(_) => false,
        Expression::Or(lhs, rhs)
        | Expression::And(lhs, rhs)
        | Expression::Equal(lhs, rhs)
        | Expression::SameTerm(lhs, rhs)
        | Expression::Greater(lhs, rhs)
        | Expression::GreaterOrEqual(lhs, rhs)
        | Expression::Less(lhs, rhs)
        | Expression::LessOrEqual(lhs, rhs)
        | Expression::Add(lhs, rhs)
        | Expression::Subtract(lhs, rhs)
        | Expression::Multiply(lhs, rhs)
        | Expression::Divide(lhs, rhs) => contains_exists(lhs) || contains_exists(rhs),
        Expression::UnaryPlus(inner) | Expression::UnaryMinus(inner) | Expression::Not(inner) => {
            contains_exists(inner)
        }
        Expression::In(lhs, list) => contains_exists(lhs) || list.iter().any(contains_exists),
        Expression::If(condition, then, otherwise) => {
            contains_exists(condition) || contains_exists(then) || contains_exists(otherwise)
        }
        Expression::Coalesce(args) | Expression::FunctionCall(_, args) => {
            args.iter().any(contains_exists)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_delta_model::Variable;

    fn exists() -> Expression {
        Expression::Exists(Box::new(GraphPattern::Bgp {
            patterns: Vec::new(),
        }))
    }

    fn var(name: &str) -> Expression {
        Expression::Variable(Variable::new_unchecked(name))
    }

    #[test]
    fn splits_conjunctions() {
        let expression = Expression::And(
            Box::new(Expression::Not(Box::new(exists()))),
            Box::new(Expression::And(Box::new(var("a")), Box::new(exists()))),
        );

        let conditions = filter_conditions(&expression);
        assert_eq!(conditions.len(), 3);
        assert!(matches!(
            conditions[0],
            FilterCondition::Exists { negated: true, .. }
        ));
        assert!(matches!(conditions[1], FilterCondition::Expression(_)));
        assert!(matches!(
            conditions[2],
            FilterCondition::Exists { negated: false, .. }
        ));
    }

    #[test]
    fn nested_exists_is_rejected() {
        let expression = Expression::Or(Box::new(var("a")), Box::new(exists()));
        assert!(matches!(
            filter_conditions(&expression).as_slice(),
            [FilterCondition::Expression(_)]
        ));

        let error = rewrite_expression(&expression).unwrap_err();
        insta::assert_snapshot!(
            error,
            @"A feature has not yet been implemented: Nested existence filters are currently not supported."
        );
    }
}
