use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::OpError;

/// Suffix appended to a variable name to get its gradient counterpart.
pub const GRAD_VAR_SUFFIX: &str = "@GRAD";

/// Placeholder bound to gradient slots that must not be computed.
pub const EMPTY_VAR_NAME: &str = "@EMPTY@";

/// Name of the gradient variable paired with `name`.
pub fn grad_var_name(name: &str) -> String {
    format!("{name}{GRAD_VAR_SUFFIX}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    Uint8,
    Int8,
    Int16,
    Int32,
    Int64,
    Float16,
    Bfloat16,
    Float32,
    Float64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Place {
    #[default]
    Cpu,
    Gpu(u32),
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Cpu => write!(f, "cpu"),
            Place::Gpu(id) => write!(f, "gpu:{id}"),
        }
    }
}

impl std::str::FromStr for Place {
    type Err = OpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.to_ascii_lowercase();
        if lowered == "cpu" {
            return Ok(Place::Cpu);
        }
        if lowered == "gpu" {
            return Ok(Place::Gpu(0));
        }
        if let Some(id) = lowered.strip_prefix("gpu:") {
            let id = id
                .parse()
                .map_err(|_| OpError::invalid_argument(format!("bad device id in `{value}`")))?;
            return Ok(Place::Gpu(id));
        }
        Err(OpError::invalid_argument(format!(
            "unknown place `{value}`, expected cpu or gpu:N"
        )))
    }
}

/// Metadata of a variable in a program block. Extents of `-1` are unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDesc {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data_type: Option<DataType>,
    #[serde(default)]
    pub shape: Vec<i64>,
}

impl VarDesc {
    pub fn new(name: impl Into<String>, data_type: DataType, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
            shape,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    Int,
    Float,
    Ints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    Int(i32),
    Float(f32),
    Ints(Vec<i32>),
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Int(_) => AttrKind::Int,
            AttrValue::Float(_) => AttrKind::Float,
            AttrValue::Ints(_) => AttrKind::Ints,
        }
    }
}

pub type AttributeMap = BTreeMap<String, AttrValue>;

/// One operator instance: named input/output slots bound to variable names
/// plus its attribute map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpDesc {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub outputs: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub attrs: AttributeMap,
}

impl OpDesc {
    pub fn new(op_type: impl Into<String>) -> Self {
        Self {
            op_type: op_type.into(),
            ..Self::default()
        }
    }

    pub fn set_type(&mut self, op_type: impl Into<String>) {
        self.op_type = op_type.into();
    }

    /// True when `slot` is bound to at least one variable.
    pub fn has_input(&self, slot: &str) -> bool {
        self.inputs.get(slot).is_some_and(|vars| !vars.is_empty())
    }

    pub fn has_output(&self, slot: &str) -> bool {
        self.outputs.get(slot).is_some_and(|vars| !vars.is_empty())
    }

    pub fn input(&self, slot: &str) -> &[String] {
        self.inputs.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn output(&self, slot: &str) -> &[String] {
        self.outputs.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_input(&mut self, slot: impl Into<String>, vars: Vec<String>) {
        self.inputs.insert(slot.into(), vars);
    }

    pub fn set_output(&mut self, slot: impl Into<String>, vars: Vec<String>) {
        self.outputs.insert(slot.into(), vars);
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: AttrValue) {
        self.attrs.insert(name.into(), value);
    }

    pub fn set_attr_map(&mut self, attrs: AttributeMap) {
        self.attrs = attrs;
    }

    pub fn attr(&self, name: &str) -> Result<&AttrValue, OpError> {
        self.attrs.get(name).ok_or_else(|| OpError::MissingAttribute {
            op_type: self.op_type.clone(),
            attr: name.to_string(),
        })
    }

    pub fn attr_int(&self, name: &str) -> Result<i32, OpError> {
        match self.attr(name)? {
            AttrValue::Int(value) => Ok(*value),
            other => Err(self.mismatch(name, AttrKind::Int, other)),
        }
    }

    pub fn attr_float(&self, name: &str) -> Result<f32, OpError> {
        match self.attr(name)? {
            AttrValue::Float(value) => Ok(*value),
            other => Err(self.mismatch(name, AttrKind::Float, other)),
        }
    }

    pub fn attr_ints(&self, name: &str) -> Result<&[i32], OpError> {
        match self.attr(name)? {
            AttrValue::Ints(values) => Ok(values),
            other => Err(self.mismatch(name, AttrKind::Ints, other)),
        }
    }

    fn mismatch(&self, name: &str, expected: AttrKind, actual: &AttrValue) -> OpError {
        OpError::AttributeTypeMismatch {
            op_type: self.op_type.clone(),
            attr: name.to_string(),
            expected,
            actual: actual.kind(),
        }
    }
}

/// A single-block program: the variable table and the ops in execution order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramDesc {
    #[serde(default)]
    pub vars: BTreeMap<String, VarDesc>,
    #[serde(default)]
    pub ops: Vec<OpDesc>,
}

impl ProgramDesc {
    pub fn var(&self, name: &str) -> Option<&VarDesc> {
        self.vars.get(name)
    }

    pub fn add_var(&mut self, var: VarDesc) {
        self.vars.insert(var.name.clone(), var);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grad_var_name_appends_suffix() {
        assert_eq!(grad_var_name("Out"), "Out@GRAD");
        assert_eq!(grad_var_name("x_0"), "x_0@GRAD");
    }

    #[test]
    fn parses_places() {
        assert_eq!("cpu".parse::<Place>().unwrap(), Place::Cpu);
        assert_eq!("GPU".parse::<Place>().unwrap(), Place::Gpu(0));
        assert_eq!("gpu:3".parse::<Place>().unwrap(), Place::Gpu(3));
        assert!("tpu".parse::<Place>().is_err());
        assert!("gpu:x".parse::<Place>().is_err());
    }

    #[test]
    fn empty_slot_is_not_an_input() {
        let mut op = OpDesc::new("index_add");
        op.set_input("IndexTensor", vec![]);
        op.set_input("X", vec!["x".to_string()]);
        assert!(!op.has_input("IndexTensor"));
        assert!(!op.has_input("AxisTensor"));
        assert!(op.has_input("X"));
        assert_eq!(op.input("X"), ["x".to_string()]);
        assert!(op.input("AxisTensor").is_empty());
    }

    #[test]
    fn typed_attribute_access_reports_mismatch() {
        let mut op = OpDesc::new("index_add");
        op.set_attr("axis", AttrValue::Float(1.0));
        let err = op.attr_int("axis").unwrap_err();
        assert!(matches!(
            err,
            OpError::AttributeTypeMismatch {
                expected: AttrKind::Int,
                actual: AttrKind::Float,
                ..
            }
        ));
        assert!(matches!(
            op.attr_ints("index"),
            Err(OpError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn op_desc_deserializes_from_json() {
        let op: OpDesc = serde_json::from_value(serde_json::json!({
            "type": "index_add",
            "inputs": {"X": ["x"]},
            "outputs": {"Out": ["out"]},
            "attrs": {
                "axis": {"int": 0},
                "index": {"ints": [1, 2]},
                "add_value": {"float": 2.5}
            }
        }))
        .unwrap();
        assert_eq!(op.op_type, "index_add");
        assert_eq!(op.attr_int("axis").unwrap(), 0);
        assert_eq!(op.attr_ints("index").unwrap(), [1, 2]);
        assert_eq!(op.attr_float("add_value").unwrap(), 2.5);
    }
}
