//! Operator schemas: declared inputs, outputs and attributes of an op type,
//! plus the checker that validates an op instance against them.

use std::fmt::Write;

use crate::error::OpError;
use crate::graph::{AttrKind, OpDesc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub name: String,
    pub comment: String,
    pub dispensable: bool,
}

impl InputSpec {
    /// Marks the input as optional.
    pub fn as_dispensable(&mut self) -> &mut Self {
        self.dispensable = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub name: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: String,
    pub kind: AttrKind,
    pub comment: String,
    /// Dispensable input that supplies this value at run time. When it is
    /// bound the attribute may be omitted.
    pub overridden_by: Option<String>,
}

impl AttrSpec {
    pub fn overridden_by(&mut self, input: impl Into<String>) -> &mut Self {
        self.overridden_by = Some(input.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpProto {
    pub op_type: String,
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
    pub attrs: Vec<AttrSpec>,
    pub comment: String,
}

/// Produces the schema of one op type.
pub trait OpProtoMaker {
    fn make(&self) -> OpProto;
}

impl OpProto {
    pub fn new(op_type: impl Into<String>) -> Self {
        Self {
            op_type: op_type.into(),
            ..Self::default()
        }
    }

    pub fn add_input(
        &mut self,
        name: impl Into<String>,
        comment: impl Into<String>,
    ) -> &mut InputSpec {
        self.inputs.push(InputSpec {
            name: name.into(),
            comment: comment.into(),
            dispensable: false,
        });
        let last = self.inputs.len() - 1;
        &mut self.inputs[last]
    }

    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        comment: impl Into<String>,
    ) -> &mut OutputSpec {
        self.outputs.push(OutputSpec {
            name: name.into(),
            comment: comment.into(),
        });
        let last = self.outputs.len() - 1;
        &mut self.outputs[last]
    }

    pub fn add_attr(
        &mut self,
        name: impl Into<String>,
        kind: AttrKind,
        comment: impl Into<String>,
    ) -> &mut AttrSpec {
        self.attrs.push(AttrSpec {
            name: name.into(),
            kind,
            comment: comment.into(),
            overridden_by: None,
        });
        let last = self.attrs.len() - 1;
        &mut self.attrs[last]
    }

    pub fn add_comment(&mut self, comment: &str) {
        self.comment = comment
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
    }

    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|spec| spec.name == name)
    }

    pub fn attr(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|spec| spec.name == name)
    }

    /// Validates an op instance against this schema. Attributes the schema
    /// does not declare are left alone.
    pub fn check(&self, op: &OpDesc) -> Result<(), OpError> {
        for slot in op.inputs.keys() {
            if self.input(slot).is_none() {
                return Err(OpError::UnknownSlot {
                    op_type: self.op_type.clone(),
                    slot: slot.clone(),
                });
            }
        }
        for slot in op.outputs.keys() {
            if !self.outputs.iter().any(|spec| &spec.name == slot) {
                return Err(OpError::UnknownSlot {
                    op_type: self.op_type.clone(),
                    slot: slot.clone(),
                });
            }
        }

        for spec in &self.inputs {
            if !spec.dispensable && !op.has_input(&spec.name) {
                return Err(OpError::MissingInput {
                    op_type: self.op_type.clone(),
                    slot: spec.name.clone(),
                });
            }
        }
        for spec in &self.outputs {
            if !op.has_output(&spec.name) {
                return Err(OpError::MissingOutput {
                    op_type: self.op_type.clone(),
                    slot: spec.name.clone(),
                });
            }
        }

        for spec in &self.attrs {
            match op.attrs.get(&spec.name) {
                Some(value) if value.kind() != spec.kind => {
                    return Err(OpError::AttributeTypeMismatch {
                        op_type: self.op_type.clone(),
                        attr: spec.name.clone(),
                        expected: spec.kind,
                        actual: value.kind(),
                    });
                }
                Some(_) => {}
                None => {
                    let supplied = spec
                        .overridden_by
                        .as_deref()
                        .is_some_and(|input| op.has_input(input));
                    if !supplied {
                        return Err(OpError::MissingAttribute {
                            op_type: self.op_type.clone(),
                            attr: spec.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Renders the schema docstrings as a markdown section.
    pub fn to_markdown(&self) -> String {
        let mut doc = format!("## {}\n\n", self.op_type);
        if !self.comment.is_empty() {
            let _ = writeln!(doc, "{}\n", self.comment);
        }
        doc.push_str("| Name | Kind | Required | Description |\n");
        doc.push_str("|---|---|---|---|\n");
        for spec in &self.inputs {
            let required = if spec.dispensable { "no" } else { "yes" };
            let _ = writeln!(
                doc,
                "| {} | input | {} | {} |",
                spec.name,
                required,
                escape_cell(&spec.comment)
            );
        }
        for spec in &self.attrs {
            let required = match &spec.overridden_by {
                Some(input) => format!("unless {input}"),
                None => "yes".to_string(),
            };
            let _ = writeln!(
                doc,
                "| {} | {:?} attr | {} | {} |",
                spec.name,
                spec.kind,
                required,
                escape_cell(&spec.comment)
            );
        }
        for spec in &self.outputs {
            let _ = writeln!(
                doc,
                "| {} | output | yes | {} |",
                spec.name,
                escape_cell(&spec.comment)
            );
        }
        doc
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AttrValue;

    fn scale_proto() -> OpProto {
        let mut proto = OpProto::new("scale");
        proto.add_input("X", "input");
        proto.add_input("ScaleTensor", "runtime scale").as_dispensable();
        proto
            .add_attr("scale", AttrKind::Float, "scale factor")
            .overridden_by("ScaleTensor");
        proto.add_attr("bias", AttrKind::Float, "bias");
        proto.add_output("Out", "output");
        proto.add_comment(
            r"
                Scale operator
                Multiplies X by scale.
            ",
        );
        proto
    }

    fn scale_op() -> OpDesc {
        let mut op = OpDesc::new("scale");
        op.set_input("X", vec!["x".to_string()]);
        op.set_output("Out", vec!["out".to_string()]);
        op.set_attr("scale", AttrValue::Float(2.0));
        op.set_attr("bias", AttrValue::Float(0.0));
        op
    }

    #[test]
    fn accepts_complete_op() {
        assert!(scale_proto().check(&scale_op()).is_ok());
    }

    #[test]
    fn rejects_missing_required_input() {
        let mut op = scale_op();
        op.inputs.remove("X");
        assert!(matches!(
            scale_proto().check(&op),
            Err(OpError::MissingInput { slot, .. }) if slot == "X"
        ));
    }

    #[test]
    fn rejects_unknown_slot() {
        let mut op = scale_op();
        op.set_input("Y", vec!["y".to_string()]);
        assert!(matches!(
            scale_proto().check(&op),
            Err(OpError::UnknownSlot { slot, .. }) if slot == "Y"
        ));
    }

    #[test]
    fn overriding_input_makes_attribute_optional() {
        let mut op = scale_op();
        op.attrs.remove("scale");
        assert!(matches!(
            scale_proto().check(&op),
            Err(OpError::MissingAttribute { attr, .. }) if attr == "scale"
        ));

        op.set_input("ScaleTensor", vec!["s".to_string()]);
        assert!(scale_proto().check(&op).is_ok());
    }

    #[test]
    fn rejects_wrong_attribute_kind() {
        let mut op = scale_op();
        op.set_attr("bias", AttrValue::Int(1));
        assert!(matches!(
            scale_proto().check(&op),
            Err(OpError::AttributeTypeMismatch { attr, .. }) if attr == "bias"
        ));
    }

    #[test]
    fn comment_is_dedented() {
        assert_eq!(
            scale_proto().comment,
            "Scale operator\nMultiplies X by scale."
        );
    }

    #[test]
    fn renders_markdown_table() {
        let doc = scale_proto().to_markdown();
        assert!(doc.starts_with("## scale\n"));
        assert!(doc.contains("| ScaleTensor | input | no | runtime scale |"));
        assert!(doc.contains("| scale | Float attr | unless ScaleTensor | scale factor |"));
        assert!(doc.contains("| Out | output | yes | output |"));
    }
}
