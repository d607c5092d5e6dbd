use rdf_delta_common::{BindingsMetadata, Cardinality, MetadataHandle, MetadataVariable};
use rdf_delta_model::Variable;

/// The variables of a join. A variable that is bound on one side is bound in every result.
pub(crate) fn join_variables(
    lhs: &[MetadataVariable],
    rhs: &[MetadataVariable],
) -> Vec<MetadataVariable> {
    let mut result = lhs.to_vec();
    for variable in rhs {
        match result.iter_mut().find(|v| v.variable == variable.variable) {
            Some(existing) => existing.can_be_undef &= variable.can_be_undef,
            None => result.push(variable.clone()),
        }
    }
    result
}

/// The variables of a union. A variable that is missing on one side may be unbound.
pub(crate) fn union_variables<'a>(
    inputs: impl IntoIterator<Item = &'a [MetadataVariable]>,
) -> Vec<MetadataVariable> {
    let inputs = inputs.into_iter().collect::<Vec<_>>();
    let mut result: Vec<MetadataVariable> = Vec::new();
    for input in &inputs {
        for variable in *input {
            if let Some(existing) = result.iter_mut().find(|v| v.variable == variable.variable) {
                existing.can_be_undef |= variable.can_be_undef;
            } else {
                result.push(variable.clone());
            }
        }
    }

    for variable in &mut result {
        let everywhere = inputs
            .iter()
            .all(|input| input.iter().any(|v| v.variable == variable.variable));
        variable.can_be_undef |= !everywhere;
    }
    result
}

/// The variables that are shared by both sides and bound in every solution of both sides.
pub(crate) fn bound_shared_variables(
    lhs: &BindingsMetadata,
    rhs: &BindingsMetadata,
) -> Vec<Variable> {
    lhs.variables
        .iter()
        .filter(|v| !v.can_be_undef && !rhs.can_be_undef(&v.variable))
        .map(|v| v.variable.clone())
        .collect()
}

/// The variables that are shared by both sides, regardless of whether they are always bound.
pub(crate) fn shared_variables(lhs: &BindingsMetadata, rhs: &BindingsMetadata) -> Vec<Variable> {
    lhs.variables
        .iter()
        .filter(|v| rhs.variable(&v.variable).is_some())
        .map(|v| v.variable.clone())
        .collect()
}

/// Creates a handle for the output of an operator.
pub(crate) fn derived(
    cardinality: Cardinality,
    variables: Vec<MetadataVariable>,
) -> MetadataHandle {
    MetadataHandle::new(BindingsMetadata::new(cardinality, variables))
}

/// An estimate for an output that is at most as large as its input.
pub(crate) fn at_most(cardinality: Cardinality) -> Cardinality {
    Cardinality::Estimate(cardinality.value())
}
