use crate::error::{ExpressionError, ExpressionResult};
use crate::name::{BuiltinName, FunctionName};
use crate::scalar::{
    accepts_arity, arithmetic, boolean, compile_pattern, invoke, regex_match, unary_minus,
    unary_plus, ArithmeticOp,
};
use rdf_delta_common::error::QueryEvaluationError;
use rdf_delta_model::vocab::xsd;
use rdf_delta_model::{
    compare_values, terms_equal, Bindings, Term, ThinError, ThinResult, TypedValue, Variable,
};
use regex::Regex;
use spargebra::algebra::{Expression, Function};
use std::cmp::Ordering;
use std::fmt::Debug;

/// Evaluates an expression for a single solution.
pub trait ExpressionEvaluator: Debug + Send + Sync {
    /// Evaluates the expression. Unbound variables and type errors are
    /// [expected errors](ExpressionError::Expected).
    fn evaluate(&self, bindings: &Bindings) -> ExpressionResult<Term>;

    /// Evaluates the expression and computes its effective boolean value.
    fn evaluate_ebv(&self, bindings: &Bindings) -> ExpressionResult<bool> {
        let term = self.evaluate(bindings)?;
        Ok(TypedValue::from_term(&term).effective_boolean_value()?)
    }
}

/// Evaluates a SPARQL [Expression].
///
/// The expression is compiled once. Unsupported functions are rejected during compilation and
/// constant regular expressions are only built once.
///
/// ```
/// # use rdf_delta_functions::{ExpressionEvaluator, SparqlExpressionEvaluator};
/// # use rdf_delta_model::{Bindings, Literal, Term, Variable};
/// # use spargebra::algebra::Expression;
/// let x = Variable::new_unchecked("x");
/// let expression = Expression::Add(
///     Box::new(Expression::Variable(x.clone())),
///     Box::new(Expression::Literal(Literal::from(1))),
/// );
/// let evaluator = SparqlExpressionEvaluator::try_new(&expression)?;
///
/// let bindings = Bindings::from_iter([(x, Term::from(Literal::from(41)))]);
/// assert_eq!(evaluator.evaluate(&bindings)?, Term::from(Literal::from(42)));
/// assert!(evaluator.evaluate(&Bindings::empty()).is_err());
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug)]
pub struct SparqlExpressionEvaluator {
    expression: CompiledExpression,
}

impl SparqlExpressionEvaluator {
    /// Compiles `expression`.
    pub fn try_new(expression: &Expression) -> Result<Self, QueryEvaluationError> {
        Ok(Self {
            expression: compile(expression)?,
        })
    }
}

impl ExpressionEvaluator for SparqlExpressionEvaluator {
    fn evaluate(&self, bindings: &Bindings) -> ExpressionResult<Term> {
        self.expression.evaluate(bindings)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ComparisonOp {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl ComparisonOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Less => ordering == Ordering::Less,
            ComparisonOp::LessOrEqual => ordering != Ordering::Greater,
            ComparisonOp::Greater => ordering == Ordering::Greater,
            ComparisonOp::GreaterOrEqual => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug)]
enum CompiledExpression {
    Constant(Term),
    Variable(Variable),
    Or(Box<Self>, Box<Self>),
    And(Box<Self>, Box<Self>),
    Not(Box<Self>),
    Equal(Box<Self>, Box<Self>),
    SameTerm(Box<Self>, Box<Self>),
    Compare(ComparisonOp, Box<Self>, Box<Self>),
    In(Box<Self>, Vec<Self>),
    Arithmetic(ArithmeticOp, Box<Self>, Box<Self>),
    UnaryPlus(Box<Self>),
    UnaryMinus(Box<Self>),
    Bound(Variable),
    If(Box<Self>, Box<Self>, Box<Self>),
    Coalesce(Vec<Self>),
    Call(BuiltinName, Vec<Self>),
    /// A `REGEX` call whose pattern and flags are constant.
    Regex(Box<Self>, Regex),
    /// `EXISTS` can only be evaluated by an operator that has access to the data.
    Exists,
}

fn compile(expression: &Expression) -> Result<CompiledExpression, QueryEvaluationError> {
    let binary = |lhs: &Expression, rhs: &Expression| -> Result<_, QueryEvaluationError> {
        Ok((Box::new(compile(lhs)?), Box::new(compile(rhs)?)))
    };

    Ok(match expression {
        Expression::NamedNode(node) => CompiledExpression::Constant(node.clone().into()),
        Expression::Literal(literal) => CompiledExpression::Constant(literal.clone().into()),
        Expression::Variable(variable) => CompiledExpression::Variable(variable.clone()),
        Expression::Or(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::Or(lhs, rhs)
        }
        Expression::And(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::And(lhs, rhs)
        }
        Expression::Equal(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::Equal(lhs, rhs)
        }
        Expression::SameTerm(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::SameTerm(lhs, rhs)
        }
        Expression::Greater(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::Compare(ComparisonOp::Greater, lhs, rhs)
        }
        Expression::GreaterOrEqual(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::Compare(ComparisonOp::GreaterOrEqual, lhs, rhs)
        }
        Expression::Less(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::Compare(ComparisonOp::Less, lhs, rhs)
        }
        Expression::LessOrEqual(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::Compare(ComparisonOp::LessOrEqual, lhs, rhs)
        }
        Expression::In(lhs, rhs) => CompiledExpression::In(
            Box::new(compile(lhs)?),
            rhs.iter().map(compile).collect::<Result<_, _>>()?,
        ),
        Expression::Add(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::Arithmetic(ArithmeticOp::Add, lhs, rhs)
        }
        Expression::Subtract(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::Arithmetic(ArithmeticOp::Subtract, lhs, rhs)
        }
        Expression::Multiply(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::Arithmetic(ArithmeticOp::Multiply, lhs, rhs)
        }
        Expression::Divide(lhs, rhs) => {
            let (lhs, rhs) = binary(lhs, rhs)?;
            CompiledExpression::Arithmetic(ArithmeticOp::Divide, lhs, rhs)
        }
        Expression::UnaryPlus(inner) => CompiledExpression::UnaryPlus(Box::new(compile(inner)?)),
        Expression::UnaryMinus(inner) => {
            CompiledExpression::UnaryMinus(Box::new(compile(inner)?))
        }
        Expression::Not(inner) => CompiledExpression::Not(Box::new(compile(inner)?)),
        Expression::Exists(_) => CompiledExpression::Exists,
        Expression::Bound(variable) => CompiledExpression::Bound(variable.clone()),
        Expression::If(test, if_true, if_false) => CompiledExpression::If(
            Box::new(compile(test)?),
            Box::new(compile(if_true)?),
            Box::new(compile(if_false)?),
        ),
        Expression::Coalesce(args) => {
            CompiledExpression::Coalesce(args.iter().map(compile).collect::<Result<_, _>>()?)
        }
        Expression::FunctionCall(function, args) => compile_function_call(function, args)?,
    })
}

fn compile_function_call(
    function: &Function,
    args: &[Expression],
) -> Result<CompiledExpression, QueryEvaluationError> {
    let name = builtin_name(function)?;
    if !accepts_arity(name, args.len()) {
        return Err(QueryEvaluationError::Expression(format!(
            "{name} does not accept {} arguments",
            args.len()
        )));
    }

    let mut args = args
        .iter()
        .map(compile)
        .collect::<Result<Vec<_>, _>>()?;
    if name == BuiltinName::Regex {
        if let Some(regex) = constant_regex(&args) {
            let value = args.swap_remove(0);
            return Ok(CompiledExpression::Regex(Box::new(value), regex));
        }
    }
    Ok(CompiledExpression::Call(name, args))
}

/// Compiles the pattern of a `REGEX` call if it does not depend on the solution.
fn constant_regex(args: &[CompiledExpression]) -> Option<Regex> {
    let constant = |expression: &CompiledExpression| match expression {
        CompiledExpression::Constant(Term::Literal(literal))
            if literal.language().is_none()
                && literal.datatype() == xsd::STRING =>
        {
            Some(literal.value().to_owned())
        }
        _ => None,
    };

    match args {
        [_, pattern] => compile_pattern(&constant(pattern)?, None).ok(),
        [_, pattern, flags] => {
            compile_pattern(&constant(pattern)?, Some(&constant(flags)?)).ok()
        }
        _ => None,
    }
}

fn builtin_name(function: &Function) -> Result<BuiltinName, QueryEvaluationError> {
    Ok(match function {
        Function::Str => BuiltinName::Str,
        Function::Lang => BuiltinName::Lang,
        Function::Datatype => BuiltinName::Datatype,
        Function::Iri => BuiltinName::Iri,
        Function::IsIri => BuiltinName::IsIri,
        Function::IsBlank => BuiltinName::IsBlank,
        Function::IsLiteral => BuiltinName::IsLiteral,
        Function::IsNumeric => BuiltinName::IsNumeric,
        Function::StrDt => BuiltinName::StrDt,
        Function::StrLang => BuiltinName::StrLang,
        Function::StrLen => BuiltinName::StrLen,
        Function::SubStr => BuiltinName::SubStr,
        Function::UCase => BuiltinName::UCase,
        Function::LCase => BuiltinName::LCase,
        Function::StrStarts => BuiltinName::StrStarts,
        Function::StrEnds => BuiltinName::StrEnds,
        Function::Contains => BuiltinName::Contains,
        Function::StrBefore => BuiltinName::StrBefore,
        Function::StrAfter => BuiltinName::StrAfter,
        Function::Concat => BuiltinName::Concat,
        Function::LangMatches => BuiltinName::LangMatches,
        Function::Regex => BuiltinName::Regex,
        Function::Abs => BuiltinName::Abs,
        Function::Custom(name) => {
            return QueryEvaluationError::not_implemented(format!(
                "Custom function {}",
                FunctionName::Custom(name.clone())
            ))
        }
        other => {
            return QueryEvaluationError::not_implemented(format!("SPARQL function {other}"))
        }
    })
}

/// Separates expected errors from fatal ones.
fn recover(result: ExpressionResult<bool>) -> ExpressionResult<ThinResult<bool>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(ExpressionError::Expected(error)) => Ok(Err(error)),
        Err(error) => Err(error),
    }
}

impl CompiledExpression {
    fn evaluate(&self, bindings: &Bindings) -> ExpressionResult<Term> {
        match self {
            CompiledExpression::Constant(term) => Ok(term.clone()),
            CompiledExpression::Variable(variable) => bindings
                .get(variable.as_str())
                .cloned()
                .ok_or(ThinError::default().into()),
            CompiledExpression::Or(lhs, rhs) => {
                let lhs = recover(lhs.evaluate_ebv(bindings))?;
                if lhs == Ok(true) {
                    return Ok(boolean(true));
                }
                match (lhs, recover(rhs.evaluate_ebv(bindings))?) {
                    (_, Ok(true)) => Ok(boolean(true)),
                    (Ok(false), Ok(false)) => Ok(boolean(false)),
                    _ => Err(ThinError::default().into()),
                }
            }
            CompiledExpression::And(lhs, rhs) => {
                let lhs = recover(lhs.evaluate_ebv(bindings))?;
                if lhs == Ok(false) {
                    return Ok(boolean(false));
                }
                match (lhs, recover(rhs.evaluate_ebv(bindings))?) {
                    (_, Ok(false)) => Ok(boolean(false)),
                    (Ok(true), Ok(true)) => Ok(boolean(true)),
                    _ => Err(ThinError::default().into()),
                }
            }
            CompiledExpression::Not(inner) => Ok(boolean(!inner.evaluate_ebv(bindings)?)),
            CompiledExpression::Equal(lhs, rhs) => {
                let lhs = lhs.evaluate(bindings)?;
                let rhs = rhs.evaluate(bindings)?;
                Ok(boolean(terms_equal(&lhs, &rhs)?))
            }
            CompiledExpression::SameTerm(lhs, rhs) => {
                Ok(boolean(lhs.evaluate(bindings)? == rhs.evaluate(bindings)?))
            }
            CompiledExpression::Compare(op, lhs, rhs) => {
                let lhs = lhs.evaluate(bindings)?;
                let rhs = rhs.evaluate(bindings)?;
                Ok(boolean(op.holds(compare_values(&lhs, &rhs)?)))
            }
            CompiledExpression::In(lhs, rhs) => {
                let lhs = lhs.evaluate(bindings)?;
                let mut error = false;
                for candidate in rhs {
                    let equal = recover(
                        candidate
                            .evaluate(bindings)
                            .and_then(|rhs| Ok(terms_equal(&lhs, &rhs)?)),
                    )?;
                    match equal {
                        Ok(true) => return Ok(boolean(true)),
                        Ok(false) => {}
                        Err(_) => error = true,
                    }
                }
                if error {
                    return Err(ThinError::default().into());
                }
                Ok(boolean(false))
            }
            CompiledExpression::Arithmetic(op, lhs, rhs) => {
                let lhs = lhs.evaluate(bindings)?;
                let rhs = rhs.evaluate(bindings)?;
                Ok(arithmetic(*op, &lhs, &rhs)?)
            }
            CompiledExpression::UnaryPlus(inner) => Ok(unary_plus(&inner.evaluate(bindings)?)?),
            CompiledExpression::UnaryMinus(inner) => {
                Ok(unary_minus(&inner.evaluate(bindings)?)?)
            }
            CompiledExpression::Bound(variable) => {
                Ok(boolean(bindings.contains(variable.as_str())))
            }
            CompiledExpression::If(test, if_true, if_false) => {
                if test.evaluate_ebv(bindings)? {
                    if_true.evaluate(bindings)
                } else {
                    if_false.evaluate(bindings)
                }
            }
            CompiledExpression::Coalesce(args) => {
                for arg in args {
                    match arg.evaluate(bindings) {
                        Ok(term) => return Ok(term),
                        Err(ExpressionError::Expected(_)) => {}
                        Err(error) => return Err(error),
                    }
                }
                Err(ThinError::default().into())
            }
            CompiledExpression::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.evaluate(bindings))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                Ok(invoke(*name, &args)?)
            }
            CompiledExpression::Regex(value, regex) => {
                Ok(regex_match(&value.evaluate(bindings)?, regex)?)
            }
            CompiledExpression::Exists => Err(QueryEvaluationError::InternalError(
                "EXISTS must be evaluated by a filter operator".to_owned(),
            )
            .into()),
        }
    }

    fn evaluate_ebv(&self, bindings: &Bindings) -> ExpressionResult<bool> {
        let term = self.evaluate(bindings)?;
        Ok(TypedValue::from_term(&term).effective_boolean_value()?)
    }
}
