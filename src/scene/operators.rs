// Operators - computed-value bindings between parameters
//
// An attached operator re-evaluates whenever one of its input parameters is
// set, writing its outputs. A detached operator does nothing until reattached,
// at which point it evaluates once to catch up.

use super::{NodeId, OperatorId, ParamRef, SceneTree};
use crate::host::{HostError, HostResult, OperatorHost, ParameterHost};
use serde_json::Value;

/// Maps input values to output values
pub type OperatorFn = Box<dyn Fn(&[Value]) -> Vec<Value>>;

/// A binding from input parameters to output parameters
pub struct Operator {
    pub name: String,
    pub(crate) inputs: Vec<ParamRef>,
    pub(crate) outputs: Vec<ParamRef>,
    pub(crate) attached: bool,
    pub(crate) evaluate: OperatorFn,
}

/// Guards against operator cycles
const MAX_PROPAGATION_DEPTH: usize = 32;

impl SceneTree {
    /// Add an attached operator and evaluate it once
    pub fn add_operator<F>(
        &mut self,
        name: &str,
        inputs: Vec<ParamRef>,
        outputs: Vec<ParamRef>,
        evaluate: F,
    ) -> HostResult<OperatorId>
    where
        F: Fn(&[Value]) -> Vec<Value> + 'static,
    {
        for param in inputs.iter().chain(outputs.iter()) {
            self.parameter_value(param)?;
        }
        self.operators.push(Some(Operator {
            name: name.to_string(),
            inputs,
            outputs,
            attached: true,
            evaluate: Box::new(evaluate),
        }));
        let id = OperatorId(self.operators.len() - 1);
        self.evaluate_operator(id, 0)?;
        Ok(id)
    }

    pub fn is_operator_attached(&self, op: OperatorId) -> bool {
        self.operator(op).is_ok_and(|operator| operator.attached)
    }

    pub fn operator_exists(&self, op: OperatorId) -> bool {
        self.operator(op).is_ok()
    }

    fn operator(&self, op: OperatorId) -> HostResult<&Operator> {
        self.operators
            .get(op.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| HostError::UnknownOperator(format!("{:?}", op)))
    }

    fn operator_mut(&mut self, op: OperatorId) -> HostResult<&mut Operator> {
        self.operators
            .get_mut(op.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| HostError::UnknownOperator(format!("{:?}", op)))
    }

    /// Re-evaluate attached operators reading from `changed`
    pub(crate) fn propagate(&mut self, changed: &ParamRef, depth: usize) -> HostResult<()> {
        if depth >= MAX_PROPAGATION_DEPTH {
            tracing::warn!(param = ?changed, "Operator propagation depth exceeded; stopping");
            return Ok(());
        }
        let readers: Vec<OperatorId> = self
            .operators
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let op = slot.as_ref()?;
                (op.attached && op.inputs.contains(changed)).then_some(OperatorId(index))
            })
            .collect();
        for op in readers {
            self.evaluate_operator(op, depth + 1)?;
        }
        Ok(())
    }

    fn evaluate_operator(&mut self, op: OperatorId, depth: usize) -> HostResult<()> {
        let operator = self.operator(op)?;
        let inputs = operator
            .inputs
            .iter()
            .map(|param| self.parameter_value(param))
            .collect::<HostResult<Vec<_>>>()?;
        let values = (operator.evaluate)(&inputs);
        let outputs = operator.outputs.clone();

        for (param, value) in outputs.iter().zip(values) {
            self.write_parameter(param, value)?;
            self.propagate(param, depth)?;
        }
        Ok(())
    }
}

impl OperatorHost for SceneTree {
    type OperatorId = OperatorId;

    fn bound_operators(&self, item: NodeId) -> Vec<OperatorId> {
        self.operators
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let op = slot.as_ref()?;
                op.inputs
                    .iter()
                    .chain(op.outputs.iter())
                    .any(|param| param.item == item)
                    .then_some(OperatorId(index))
            })
            .collect()
    }

    fn operator_dependencies(&self, op: OperatorId) -> Vec<OperatorId> {
        let Ok(target) = self.operator(op) else {
            return Vec::new();
        };
        self.operators
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let upstream = slot.as_ref()?;
                (index != op.0
                    && upstream
                        .outputs
                        .iter()
                        .any(|param| target.inputs.contains(param)))
                .then_some(OperatorId(index))
            })
            .collect()
    }

    fn detach_operator(&mut self, op: OperatorId) -> HostResult<()> {
        let operator = self.operator_mut(op)?;
        operator.attached = false;
        tracing::debug!(operator = %operator.name, "Detached operator");
        Ok(())
    }

    fn reattach_operator(&mut self, op: OperatorId) -> HostResult<()> {
        let operator = self.operator_mut(op)?;
        operator.attached = true;
        tracing::debug!(operator = %operator.name, "Reattached operator");
        self.evaluate_operator(op, 0)
    }
}
