use std::collections::BTreeSet;
use std::fmt::Write;

use crate::graph::{AttrValue, ProgramDesc, VarDesc};

pub fn program_to_dot(program: &ProgramDesc) -> String {
    let mut dot = String::from("digraph program {\n");
    dot.push_str("  rankdir=LR;\n");
    dot.push_str("  node [fontname=\"Helvetica\"];\n");
    dot.push_str("  edge [fontname=\"Helvetica\"];\n\n");

    // Variables only produced by ops are not in the table yet.
    let mut names: BTreeSet<&str> = program.vars.keys().map(String::as_str).collect();
    for op in &program.ops {
        for vars in op.inputs.values().chain(op.outputs.values()) {
            names.extend(vars.iter().map(String::as_str));
        }
    }

    for name in &names {
        let mut label_lines = vec![name.to_string()];
        let fill = match program.var(name) {
            Some(var) => {
                label_lines.extend(describe_var(var));
                "#d0e6ff"
            }
            None => "#f0f0f0",
        };
        let label = escape_label(&label_lines.join("\n"));
        let _ = writeln!(
            dot,
            "  \"var_{}\" [shape=oval,style=filled,fillcolor=\"{}\",label=\"{}\"];",
            escape_label(name),
            fill,
            label
        );
    }

    dot.push('\n');

    for (idx, op) in program.ops.iter().enumerate() {
        let node_id = format!("op_{}", idx);
        let mut label_lines = vec![format!("{} (#{})", op.op_type, idx)];
        for (name, value) in &op.attrs {
            label_lines.push(format!("{} = {}", name, format_attr(value)));
        }
        let label = escape_label(&label_lines.join("\n"));
        let _ = writeln!(
            dot,
            "  {} [shape=box,style=rounded,label=\"{}\"];",
            node_id, label
        );

        for (slot, vars) in &op.inputs {
            for var in vars {
                let _ = writeln!(
                    dot,
                    "  \"var_{}\" -> {} [label=\"{}\"];",
                    escape_label(var),
                    node_id,
                    escape_label(slot)
                );
            }
        }
        for (slot, vars) in &op.outputs {
            for var in vars {
                let _ = writeln!(
                    dot,
                    "  {} -> \"var_{}\" [label=\"{}\"];",
                    node_id,
                    escape_label(var),
                    escape_label(slot)
                );
            }
        }
    }

    dot.push_str("}\n");
    dot
}

fn describe_var(var: &VarDesc) -> Vec<String> {
    let data_type = match var.data_type {
        Some(data_type) => format!("{:?}", data_type),
        None => "unresolved".to_string(),
    };
    vec![data_type, format_shape(&var.shape)]
}

fn format_attr(value: &AttrValue) -> String {
    match value {
        AttrValue::Int(v) => v.to_string(),
        AttrValue::Float(v) => v.to_string(),
        AttrValue::Ints(v) => format!("{:?}", v),
    }
}

fn escape_label(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_shape(shape: &[i64]) -> String {
    if shape.is_empty() {
        "scalar".to_string()
    } else {
        shape
            .iter()
            .map(|dim| {
                if *dim < 0 {
                    "?".to_string()
                } else {
                    dim.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("x")
    }
}

#[cfg(test)]
mod tests {
    use super::program_to_dot;
    use crate::graph::{AttrValue, DataType, OpDesc, ProgramDesc, VarDesc};

    #[test]
    fn exports_graphviz_with_vars_and_ops() {
        let mut program = ProgramDesc::default();
        program.add_var(VarDesc::new("x", DataType::Float32, vec![-1, 3]));
        let mut op = OpDesc::new("index_add");
        op.set_input("X", vec!["x".to_string()]);
        op.set_output("Out", vec!["out".to_string()]);
        op.set_attr("index", AttrValue::Ints(vec![1, 2]));
        op.set_attr("add_value", AttrValue::Float(2.5));
        program.ops.push(op);

        let dot = program_to_dot(&program);

        assert!(dot.starts_with("digraph program {"));
        assert!(dot.contains("\"var_x\" [shape=oval,style=filled,fillcolor=\"#d0e6ff\""));
        assert!(dot.contains("\"var_out\" [shape=oval,style=filled,fillcolor=\"#f0f0f0\""));
        assert!(dot.contains("op_0 [shape=box"));
        assert!(dot.contains("\"var_x\" -> op_0 [label=\"X\"]"));
        assert!(dot.contains("op_0 -> \"var_out\" [label=\"Out\"]"));
        assert!(dot.contains("index = [1, 2]"));
        assert!(dot.contains("add_value = 2.5"));
        assert!(dot.contains("?x3"));
    }
}
