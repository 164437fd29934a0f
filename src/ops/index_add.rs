//! `index_add`: adds a scalar into the slices of `X` selected by an index
//! list along one axis, plus its backward op `index_add_grad`.

use crate::error::OpError;
use crate::grad::{ForwardOp, GradOpMaker, copy_companion_inputs};
use crate::graph::{AttrKind, DataType, OpDesc, grad_var_name};
use crate::inplace::InplaceInferer;
use crate::operator::{ExecutionContext, InferShapeContext, KernelKey, Operator};
use crate::registry::{OpInfo, OpRegistry};
use crate::schema::{OpProto, OpProtoMaker};
use crate::shape_inference::{index_add_grad_infer_meta, index_add_infer_meta};

pub const INDEX_ADD: &str = "index_add";
pub const INDEX_ADD_GRAD: &str = "index_add_grad";

/// Element types the index-add kernels are built for.
pub const SUPPORTED_DATA_TYPES: [DataType; 6] = [
    DataType::Bool,
    DataType::Int32,
    DataType::Int64,
    DataType::Float16,
    DataType::Float32,
    DataType::Float64,
];

/// Dispensable inputs carried over to the backward op when bound.
const COMPANION_INPUTS: [&str; 2] = ["AxisTensor", "IndexTensor"];

fn check_data_type(op_type: &str, data_type: DataType) -> Result<(), OpError> {
    if SUPPORTED_DATA_TYPES.contains(&data_type) {
        Ok(())
    } else {
        Err(OpError::UnsupportedDataType {
            op_type: op_type.to_string(),
            data_type,
        })
    }
}

pub struct IndexAddOp;

impl Operator for IndexAddOp {
    fn expected_kernel_key(&self, ctx: &ExecutionContext<'_>) -> Result<KernelKey, OpError> {
        let data_type = ctx.indicate_var_data_type("X")?;
        check_data_type(INDEX_ADD, data_type)?;
        Ok(KernelKey {
            data_type,
            place: ctx.place,
        })
    }

    fn infer_shape(&self, ctx: &mut InferShapeContext<'_>) -> Result<(), OpError> {
        let x = ctx.input_meta("X")?;
        let index_tensor = ctx.optional_input_meta("IndexTensor")?;
        let axis_tensor = ctx.optional_input_meta("AxisTensor")?;

        // Attributes shadowed by a bound tensor may be left out.
        let index = if index_tensor.is_some() && !ctx.op.attrs.contains_key("index") {
            Vec::new()
        } else {
            ctx.op.attr_ints("index")?.to_vec()
        };
        let axis = if axis_tensor.is_some() && !ctx.op.attrs.contains_key("axis") {
            0
        } else {
            ctx.op.attr_int("axis")?
        };

        let out = index_add_infer_meta(
            &x,
            index_tensor.as_ref(),
            axis_tensor.as_ref(),
            &index,
            axis,
        )?;
        ctx.set_output_meta("Out", &out)
    }
}

pub struct IndexAddOpMaker;

impl OpProtoMaker for IndexAddOpMaker {
    fn make(&self) -> OpProto {
        let mut proto = OpProto::new(INDEX_ADD);
        proto.add_input(
            "X",
            "(Tensor) The input tensor of index_add, dtype should be \
             bool, int32, int64, float16, float32 or float64.",
        );
        proto
            .add_input(
                "IndexTensor",
                "(Tensor, optional) If provided, index_add uses it as the \
                 indices. It has higher priority than attr(index).",
            )
            .as_dispensable();
        proto
            .add_input(
                "AxisTensor",
                "(Tensor, optional) If provided, used as the axis. It has higher \
                 priority than attr(axis) and must hold exactly one element.",
            )
            .as_dispensable();
        proto
            .add_attr(
                "index",
                AttrKind::Ints,
                "(list<int>) Starting indices along the axis.",
            )
            .overridden_by("IndexTensor");
        proto
            .add_attr(
                "axis",
                AttrKind::Int,
                "(int) The dimension along which to index.",
            )
            .overridden_by("AxisTensor");
        proto.add_attr("add_value", AttrKind::Float, "(float) The value to add.");
        proto.add_output(
            "Out",
            "(Tensor) The output of index_add, with the same dtype and shape as X.",
        );
        proto.add_comment(
            r"
                IndexAdd operator
                Adds add_value to the elements of X selected by index along axis.
                This operator also supports inplace modification.
            ",
        );
        proto
    }
}

pub struct IndexAddGradMaker;

impl GradOpMaker for IndexAddGradMaker {
    fn apply(&self, forward: &ForwardOp<'_>, grad: &mut OpDesc) {
        grad.set_type(INDEX_ADD_GRAD);
        copy_companion_inputs(forward, grad, &COMPANION_INPUTS);
        grad.set_input(grad_var_name("Out"), forward.output_grad("Out"));
        grad.set_output(grad_var_name("X"), forward.input_grad("X"));
        grad.set_attr_map(forward.attrs());
    }
}

pub struct IndexAddGradOp;

impl Operator for IndexAddGradOp {
    fn expected_kernel_key(&self, ctx: &ExecutionContext<'_>) -> Result<KernelKey, OpError> {
        let data_type = ctx.indicate_var_data_type(&grad_var_name("Out"))?;
        check_data_type(INDEX_ADD_GRAD, data_type)?;
        Ok(KernelKey {
            data_type,
            place: ctx.place,
        })
    }

    fn infer_shape(&self, ctx: &mut InferShapeContext<'_>) -> Result<(), OpError> {
        let out_grad = ctx.input_meta(&grad_var_name("Out"))?;
        let x_grad = index_add_grad_infer_meta(&out_grad)?;
        ctx.set_output_meta(&grad_var_name("X"), &x_grad)
    }
}

pub fn index_add_inplace() -> InplaceInferer {
    InplaceInferer::new([("X", "Out")])
}

pub fn index_add_grad_inplace() -> InplaceInferer {
    InplaceInferer::new([(grad_var_name("Out"), grad_var_name("X"))])
}

pub fn register(registry: &mut OpRegistry) -> Result<(), OpError> {
    registry.register(
        INDEX_ADD,
        OpInfo::new(IndexAddOp)
            .with_maker(&IndexAddOpMaker)
            .with_grad_maker(IndexAddGradMaker)
            .with_inplace(index_add_inplace()),
    )?;
    registry.register(
        INDEX_ADD_GRAD,
        OpInfo::new(IndexAddGradOp).with_inplace(index_add_grad_inplace()),
    )
}
