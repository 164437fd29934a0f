//! Gradient op construction.
//!
//! A [`GradOpMaker`] turns one forward op instance into the descriptor of
//! its backward op. Makers read the forward op through [`ForwardOp`], which
//! applies the gradient naming convention and the no-grad set.

use std::collections::HashSet;

use crate::graph::{AttributeMap, EMPTY_VAR_NAME, OpDesc, grad_var_name};

/// Forward op instance seen from its gradient maker.
pub struct ForwardOp<'a> {
    op: &'a OpDesc,
    no_grad_set: &'a HashSet<String>,
}

impl<'a> ForwardOp<'a> {
    pub fn new(op: &'a OpDesc, no_grad_set: &'a HashSet<String>) -> Self {
        Self { op, no_grad_set }
    }

    pub fn has_input(&self, slot: &str) -> bool {
        self.op.has_input(slot)
    }

    pub fn input(&self, slot: &str) -> Vec<String> {
        self.op.input(slot).to_vec()
    }

    /// Gradient variables of the forward output `slot`.
    pub fn output_grad(&self, slot: &str) -> Vec<String> {
        self.op
            .output(slot)
            .iter()
            .map(|name| grad_var_name(name))
            .collect()
    }

    /// Gradient variables the backward op writes for forward input `slot`.
    /// Variables in the no-grad set are bound to [`EMPTY_VAR_NAME`].
    pub fn input_grad(&self, slot: &str) -> Vec<String> {
        self.op
            .input(slot)
            .iter()
            .map(|name| {
                if self.no_grad_set.contains(name) {
                    EMPTY_VAR_NAME.to_string()
                } else {
                    grad_var_name(name)
                }
            })
            .collect()
    }

    pub fn attrs(&self) -> AttributeMap {
        self.op.attrs.clone()
    }
}

/// Builds the backward op of a forward op type.
pub trait GradOpMaker: Send + Sync {
    fn apply(&self, forward: &ForwardOp<'_>, grad: &mut OpDesc);
}

/// Copies each of `slots` from the forward op onto `grad` when the forward
/// op binds it.
pub fn copy_companion_inputs(forward: &ForwardOp<'_>, grad: &mut OpDesc, slots: &[&str]) {
    for slot in slots {
        if forward.has_input(slot) {
            grad.set_input(*slot, forward.input(slot));
        }
    }
}
