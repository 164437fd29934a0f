use std::collections::BTreeMap;
use std::fmt;

use crate::error::OpError;
use crate::graph::{AttrValue, DataType, EMPTY_VAR_NAME, OpDesc, Place, VarDesc};
use crate::shape_inference::MetaTensor;

/// Selects the kernel an executor dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelKey {
    pub data_type: DataType,
    pub place: Place,
}

impl fmt::Display for KernelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.data_type, self.place)
    }
}

/// Read-only view handed to [`Operator::expected_kernel_key`].
pub struct ExecutionContext<'a> {
    pub op: &'a OpDesc,
    pub vars: &'a BTreeMap<String, VarDesc>,
    pub place: Place,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(op: &'a OpDesc, vars: &'a BTreeMap<String, VarDesc>, place: Place) -> Self {
        Self { op, vars, place }
    }

    /// Data type of the first variable bound to `slot`.
    pub fn indicate_var_data_type(&self, slot: &str) -> Result<DataType, OpError> {
        let name = self.op.input(slot).first().ok_or_else(|| {
            OpError::invalid_argument(format!(
                "input `{}` of `{}` is not bound to any variable",
                slot, self.op.op_type
            ))
        })?;
        let var = self.vars.get(name).ok_or_else(|| {
            OpError::invalid_argument(format!(
                "variable `{}` bound to `{}` of `{}` does not exist",
                name, slot, self.op.op_type
            ))
        })?;
        var.data_type.ok_or_else(|| {
            OpError::invalid_argument(format!(
                "data type of `{}` bound to `{}` of `{}` is not initialized",
                name, slot, self.op.op_type
            ))
        })
    }
}

/// Working view handed to [`Operator::infer_shape`]. Output metas are
/// written back into the variable table.
pub struct InferShapeContext<'a> {
    pub op: &'a OpDesc,
    pub vars: &'a mut BTreeMap<String, VarDesc>,
}

impl<'a> InferShapeContext<'a> {
    pub fn new(op: &'a OpDesc, vars: &'a mut BTreeMap<String, VarDesc>) -> Self {
        Self { op, vars }
    }

    pub fn has_input(&self, slot: &str) -> bool {
        self.op.has_input(slot)
    }

    pub fn input_meta(&self, slot: &str) -> Result<MetaTensor, OpError> {
        let name = self
            .op
            .input(slot)
            .first()
            .ok_or_else(|| OpError::MissingInput {
                op_type: self.op.op_type.clone(),
                slot: slot.to_string(),
            })?;
        let var = self.vars.get(name).ok_or_else(|| OpError::UnknownVariable {
            op_type: self.op.op_type.clone(),
            var: name.clone(),
        })?;
        MetaTensor::from_var(var)
    }

    pub fn optional_input_meta(&self, slot: &str) -> Result<Option<MetaTensor>, OpError> {
        if self.has_input(slot) {
            self.input_meta(slot).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn attr(&self, name: &str) -> Result<&AttrValue, OpError> {
        self.op.attr(name)
    }

    /// Writes `meta` into every variable bound to output `slot`, skipping
    /// placeholder gradients.
    pub fn set_output_meta(&mut self, slot: &str, meta: &MetaTensor) -> Result<(), OpError> {
        let op = self.op;
        let names = op.output(slot);
        if names.is_empty() {
            return Err(OpError::MissingOutput {
                op_type: op.op_type.clone(),
                slot: slot.to_string(),
            });
        }
        for name in names {
            if name == EMPTY_VAR_NAME {
                continue;
            }
            let var = self
                .vars
                .entry(name.clone())
                .or_insert_with(|| VarDesc {
                    name: name.clone(),
                    data_type: None,
                    shape: Vec::new(),
                });
            var.data_type = Some(meta.data_type);
            var.shape = meta.dims.clone();
        }
        Ok(())
    }
}

/// Capabilities every registered op type provides to the executor.
pub trait Operator: Send + Sync {
    /// Resolve which kernel runs this op instance.
    fn expected_kernel_key(&self, ctx: &ExecutionContext<'_>) -> Result<KernelKey, OpError>;

    /// Compute output metas from input metas and attributes.
    fn infer_shape(&self, ctx: &mut InferShapeContext<'_>) -> Result<(), OpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> BTreeMap<String, VarDesc> {
        let mut vars = BTreeMap::new();
        vars.insert(
            "x".to_string(),
            VarDesc::new("x", DataType::Float32, vec![4, 3]),
        );
        vars.insert(
            "pending".to_string(),
            VarDesc {
                name: "pending".to_string(),
                data_type: None,
                shape: vec![2],
            },
        );
        vars
    }

    #[test]
    fn indicates_data_type_of_first_bound_var() {
        let mut op = OpDesc::new("dummy");
        op.set_input("X", vec!["x".to_string(), "pending".to_string()]);
        let vars = vars();
        let ctx = ExecutionContext::new(&op, &vars, Place::Gpu(1));
        assert_eq!(ctx.indicate_var_data_type("X").unwrap(), DataType::Float32);
    }

    #[test]
    fn indicate_fails_on_absent_or_unresolved_vars() {
        let mut op = OpDesc::new("dummy");
        op.set_input("X", vec!["missing".to_string()]);
        op.set_input("Y", vec!["pending".to_string()]);
        let vars = vars();
        let ctx = ExecutionContext::new(&op, &vars, Place::Cpu);
        for slot in ["X", "Y", "Z"] {
            assert!(matches!(
                ctx.indicate_var_data_type(slot),
                Err(OpError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn set_output_meta_creates_missing_vars() {
        let mut op = OpDesc::new("dummy");
        op.set_output("Out", vec!["out".to_string()]);
        let mut vars = vars();
        let mut ctx = InferShapeContext::new(&op, &mut vars);
        ctx.set_output_meta("Out", &MetaTensor::new(vec![4, 3], DataType::Int32))
            .unwrap();
        assert!(ctx.set_output_meta("Missing", &MetaTensor::new(vec![], DataType::Int32)).is_err());
        assert_eq!(vars["out"], VarDesc::new("out", DataType::Int32, vec![4, 3]));
    }

    #[test]
    fn kernel_key_display() {
        let key = KernelKey {
            data_type: DataType::Float16,
            place: Place::Gpu(0),
        };
        assert_eq!(key.to_string(), "Float16@gpu:0");
    }
}
