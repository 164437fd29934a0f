use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info_span};

use crate::error::OpError;
use crate::graph::{OpDesc, Place, ProgramDesc, VarDesc};
use crate::operator::{ExecutionContext, InferShapeContext, KernelKey};
use crate::registry::OpRegistry;

#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    pub place: Place,
    pub check_schema: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            place: Place::Cpu,
            check_schema: true,
        }
    }
}

/// Kernel choice for one op of the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSelection {
    pub op_index: usize,
    pub op_type: String,
    pub key: KernelKey,
}

/// Storage the memory planner may share between an op's input and output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InplaceCandidate {
    pub op_index: usize,
    pub input: String,
    pub output: String,
}

#[derive(Debug)]
pub struct ValidationArtifacts {
    pub vars: BTreeMap<String, VarDesc>,
    pub kernel_keys: Vec<KernelSelection>,
    pub inplace_candidates: Vec<InplaceCandidate>,
}

pub struct ProgramValidator<'a> {
    registry: &'a OpRegistry,
    options: ValidatorOptions,
}

impl<'a> ProgramValidator<'a> {
    pub fn new(registry: &'a OpRegistry, options: ValidatorOptions) -> Self {
        Self { registry, options }
    }

    /// Walks the ops in program order, checking each against its schema,
    /// inferring output metas and resolving its kernel.
    pub fn validate(&self, program: &ProgramDesc) -> Result<ValidationArtifacts, OpError> {
        let mut vars = program.vars.clone();
        let mut kernel_keys = Vec::with_capacity(program.ops.len());
        let mut inplace_candidates = Vec::new();

        for (op_index, op) in program.ops.iter().enumerate() {
            let _span = info_span!("validate_op", index = op_index, op_type = %op.op_type).entered();
            let info = self.registry.get(&op.op_type)?;

            if self.options.check_schema
                && let Some(proto) = &info.proto
            {
                proto.check(op)?;
            }
            check_inputs_declared(op, &vars)?;

            info.operator
                .infer_shape(&mut InferShapeContext::new(op, &mut vars))?;
            let key = info
                .operator
                .expected_kernel_key(&ExecutionContext::new(op, &vars, self.options.place))?;
            debug!(kernel = %key, "resolved kernel");
            kernel_keys.push(KernelSelection {
                op_index,
                op_type: op.op_type.clone(),
                key,
            });

            if let Some(inplace) = &info.inplace {
                for (input, output) in inplace.resolve(op) {
                    if shares_layout(&vars, &input, &output) {
                        inplace_candidates.push(InplaceCandidate {
                            op_index,
                            input,
                            output,
                        });
                    }
                }
            }
        }

        Ok(ValidationArtifacts {
            vars,
            kernel_keys,
            inplace_candidates,
        })
    }

    /// Backward op descriptors for the program, last forward op first. Ops
    /// registered without a gradient maker, such as backward ops, are skipped.
    pub fn grad_ops(
        &self,
        program: &ProgramDesc,
        no_grad_set: &HashSet<String>,
    ) -> Result<Vec<OpDesc>, OpError> {
        let mut grads = Vec::with_capacity(program.ops.len());
        for op in program.ops.iter().rev() {
            if self.registry.get(&op.op_type)?.grad_maker.is_none() {
                debug!(op_type = %op.op_type, "no gradient maker, skipping");
                continue;
            }
            grads.push(self.registry.grad_op_desc(op, no_grad_set)?);
        }
        Ok(grads)
    }
}

fn check_inputs_declared(op: &OpDesc, vars: &BTreeMap<String, VarDesc>) -> Result<(), OpError> {
    for names in op.inputs.values() {
        for name in names {
            if !vars.contains_key(name) {
                return Err(OpError::UnknownVariable {
                    op_type: op.op_type.clone(),
                    var: name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn shares_layout(vars: &BTreeMap<String, VarDesc>, input: &str, output: &str) -> bool {
    match (vars.get(input), vars.get(output)) {
        (Some(input), Some(output)) => {
            input.data_type == output.data_type && input.shape == output.shape
        }
        _ => false,
    }
}
