use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::OpError;
use crate::grad::{ForwardOp, GradOpMaker};
use crate::graph::OpDesc;
use crate::inplace::InplaceInferer;
use crate::operator::Operator;
use crate::ops;
use crate::schema::{OpProto, OpProtoMaker};

/// Everything registered for one op type.
pub struct OpInfo {
    pub operator: Box<dyn Operator>,
    pub proto: Option<OpProto>,
    pub grad_maker: Option<Box<dyn GradOpMaker>>,
    pub inplace: Option<InplaceInferer>,
}

impl OpInfo {
    pub fn new(operator: impl Operator + 'static) -> Self {
        Self {
            operator: Box::new(operator),
            proto: None,
            grad_maker: None,
            inplace: None,
        }
    }

    pub fn with_maker(mut self, maker: &dyn OpProtoMaker) -> Self {
        self.proto = Some(maker.make());
        self
    }

    pub fn with_grad_maker(mut self, maker: impl GradOpMaker + 'static) -> Self {
        self.grad_maker = Some(Box::new(maker));
        self
    }

    pub fn with_inplace(mut self, inplace: InplaceInferer) -> Self {
        self.inplace = Some(inplace);
        self
    }
}

/// Maps op type names to their registered capabilities.
#[derive(Default)]
pub struct OpRegistry {
    ops: HashMap<String, OpInfo>,
}

impl OpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with every built-in op type. Call once during
    /// process setup.
    pub fn with_defaults() -> Result<Self, OpError> {
        let mut registry = Self::new();
        ops::register_all(&mut registry)?;
        Ok(registry)
    }

    pub fn register(&mut self, op_type: impl Into<String>, info: OpInfo) -> Result<(), OpError> {
        let op_type = op_type.into();
        if self.ops.contains_key(&op_type) {
            return Err(OpError::DuplicateOperator { op_type });
        }
        debug!(
            op_type = %op_type,
            has_proto = info.proto.is_some(),
            has_grad = info.grad_maker.is_some(),
            "registered operator"
        );
        self.ops.insert(op_type, info);
        Ok(())
    }

    pub fn contains(&self, op_type: &str) -> bool {
        self.ops.contains_key(op_type)
    }

    pub fn registered_ops(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.ops.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub fn get(&self, op_type: &str) -> Result<&OpInfo, OpError> {
        self.ops
            .get(op_type)
            .ok_or_else(|| OpError::UnknownOperator {
                op_type: op_type.to_string(),
                registered: self.registered_ops(),
            })
    }

    pub fn proto(&self, op_type: &str) -> Option<&OpProto> {
        self.ops.get(op_type).and_then(|info| info.proto.as_ref())
    }

    /// Slot pairs `op_type` declares as safe to alias. Empty when nothing is
    /// declared.
    pub fn inplace_pairs(&self, op_type: &str) -> &[(String, String)] {
        self.ops
            .get(op_type)
            .and_then(|info| info.inplace.as_ref())
            .map(InplaceInferer::pairs)
            .unwrap_or(&[])
    }

    /// Build the backward op descriptor of `forward`.
    pub fn grad_op_desc(
        &self,
        forward: &OpDesc,
        no_grad_set: &HashSet<String>,
    ) -> Result<OpDesc, OpError> {
        let info = self.get(&forward.op_type)?;
        let maker = info
            .grad_maker
            .as_ref()
            .ok_or_else(|| OpError::NoGradientMaker {
                op_type: forward.op_type.clone(),
            })?;
        let mut grad = OpDesc::default();
        maker.apply(&ForwardOp::new(forward, no_grad_set), &mut grad);
        debug!(
            forward = %forward.op_type,
            backward = %grad.op_type,
            inputs = ?grad.inputs.keys().collect::<Vec<_>>(),
            "built gradient op"
        );
        Ok(grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DataType, Place};
    use crate::operator::{ExecutionContext, InferShapeContext, KernelKey};

    struct Identity;

    impl Operator for Identity {
        fn expected_kernel_key(&self, ctx: &ExecutionContext<'_>) -> Result<KernelKey, OpError> {
            Ok(KernelKey {
                data_type: ctx.indicate_var_data_type("X")?,
                place: ctx.place,
            })
        }

        fn infer_shape(&self, ctx: &mut InferShapeContext<'_>) -> Result<(), OpError> {
            let x = ctx.input_meta("X")?;
            ctx.set_output_meta("Out", &x)
        }
    }

    #[test]
    fn registers_and_looks_up() {
        let mut registry = OpRegistry::new();
        registry.register("identity", OpInfo::new(Identity)).unwrap();
        assert!(registry.contains("identity"));
        assert!(registry.get("identity").is_ok());
        assert!(registry.proto("identity").is_none());
        assert!(registry.inplace_pairs("identity").is_empty());
        assert_eq!(registry.registered_ops(), vec!["identity".to_string()]);
    }

    #[test]
    fn rejects_duplicate_registration() {
        let mut registry = OpRegistry::new();
        registry.register("identity", OpInfo::new(Identity)).unwrap();
        let err = registry
            .register("identity", OpInfo::new(Identity))
            .unwrap_err();
        assert!(matches!(err, OpError::DuplicateOperator { op_type } if op_type == "identity"));
    }

    #[test]
    fn unknown_operator_lists_registered() {
        let mut registry = OpRegistry::new();
        registry.register("identity", OpInfo::new(Identity)).unwrap();
        match registry.get("missing") {
            Err(OpError::UnknownOperator {
                op_type,
                registered,
            }) => {
                assert_eq!(op_type, "missing");
                assert_eq!(registered, vec!["identity".to_string()]);
            }
            _ => panic!("expected UnknownOperator"),
        }
    }

    #[test]
    fn grad_without_maker_fails() {
        let mut registry = OpRegistry::new();
        registry.register("identity", OpInfo::new(Identity)).unwrap();
        let op = OpDesc::new("identity");
        assert!(matches!(
            registry.grad_op_desc(&op, &HashSet::new()),
            Err(OpError::NoGradientMaker { .. })
        ));
    }

    #[test]
    fn registered_operator_is_dispatchable() {
        let mut registry = OpRegistry::new();
        registry.register("identity", OpInfo::new(Identity)).unwrap();

        let mut op = OpDesc::new("identity");
        op.set_input("X", vec!["x".to_string()]);
        op.set_output("Out", vec!["y".to_string()]);
        let mut vars = std::collections::BTreeMap::new();
        vars.insert(
            "x".to_string(),
            crate::graph::VarDesc::new("x", DataType::Int32, vec![2]),
        );

        let info = registry.get("identity").unwrap();
        info.operator
            .infer_shape(&mut InferShapeContext::new(&op, &mut vars))
            .unwrap();
        assert_eq!(vars["y"].shape, vec![2]);
        let key = info
            .operator
            .expected_kernel_key(&ExecutionContext::new(&op, &vars, Place::Cpu))
            .unwrap();
        assert_eq!(key.data_type, DataType::Int32);
    }
}
