/// Shape inference (meta functions) for registered operations
use crate::error::OpError;
use crate::graph::{DataType, VarDesc};

/// Shape and dtype of a tensor known at graph-build time. Extents of `-1`
/// are unknown until execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTensor {
    pub dims: Vec<i64>,
    pub data_type: DataType,
}

impl MetaTensor {
    pub fn new(dims: Vec<i64>, data_type: DataType) -> Self {
        Self { dims, data_type }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub(crate) fn from_var(var: &VarDesc) -> Result<Self, OpError> {
        let data_type = var.data_type.ok_or_else(|| {
            OpError::shape(format!("variable `{}` has no resolved data type", var.name))
        })?;
        Ok(Self::new(var.shape.clone(), data_type))
    }
}

/// Map a possibly negative axis into `[0, rank)`.
pub fn normalize_axis(axis: i32, rank: usize) -> Result<usize, OpError> {
    let rank_i = rank as i64;
    let axis_i = axis as i64;
    if axis_i < -rank_i || axis_i >= rank_i {
        return Err(OpError::shape(format!(
            "axis {} is out of range for a tensor of rank {} (expected [{}, {}))",
            axis, rank, -rank_i, rank_i
        )));
    }
    Ok(if axis_i < 0 {
        (axis_i + rank_i) as usize
    } else {
        axis_i as usize
    })
}

/// Infer the output of `index_add`.
///
/// The output always mirrors `x`: index-add only touches values at the
/// selected offsets along `axis`. The optional tensors take priority over
/// their attribute counterparts, so attribute checks only apply when the
/// matching tensor is absent.
pub fn index_add_infer_meta(
    x: &MetaTensor,
    index_tensor: Option<&MetaTensor>,
    axis_tensor: Option<&MetaTensor>,
    index: &[i32],
    axis: i32,
) -> Result<MetaTensor, OpError> {
    if let Some(axis_tensor) = axis_tensor {
        if axis_tensor.rank() != 1 || !matches!(axis_tensor.dims[0], 1 | -1) {
            return Err(OpError::shape(format!(
                "AxisTensor must have shape [1], got {:?}",
                axis_tensor.dims
            )));
        }
        if !matches!(axis_tensor.data_type, DataType::Int32 | DataType::Int64) {
            return Err(OpError::shape(format!(
                "AxisTensor must be int32 or int64, got {:?}",
                axis_tensor.data_type
            )));
        }
    }

    if let Some(index_tensor) = index_tensor {
        if index_tensor.rank() != 1 {
            return Err(OpError::shape(format!(
                "IndexTensor must be rank 1, got shape {:?}",
                index_tensor.dims
            )));
        }
        if !matches!(index_tensor.data_type, DataType::Int32 | DataType::Int64) {
            return Err(OpError::shape(format!(
                "IndexTensor must be int32 or int64, got {:?}",
                index_tensor.data_type
            )));
        }
    }

    if axis_tensor.is_none() {
        let axis = normalize_axis(axis, x.rank())?;
        let extent = x.dims[axis];
        if index_tensor.is_none() && extent >= 0 {
            for &value in index {
                let value = value as i64;
                if value < -extent || value >= extent {
                    return Err(OpError::shape(format!(
                        "index {} is out of range for axis {} with extent {}",
                        value, axis, extent
                    )));
                }
            }
        }
    }

    Ok(x.clone())
}

/// Infer `X@GRAD` for `index_add_grad`: identical to `Out@GRAD`.
pub fn index_add_grad_infer_meta(out_grad: &MetaTensor) -> Result<MetaTensor, OpError> {
    Ok(out_grad.clone())
}
