use std::fs;
use std::path::Path;

use crate::error::OpError;
use crate::graph::ProgramDesc;

/// Parse a program from JSON text.
///
/// Variables may omit their `name`; it is filled in from the table key. A
/// name that disagrees with its key is rejected.
pub fn parse_program(contents: &str) -> Result<ProgramDesc, OpError> {
    let mut program: ProgramDesc = serde_json::from_str(contents)?;
    for (key, var) in program.vars.iter_mut() {
        if var.name.is_empty() {
            var.name = key.clone();
        } else if &var.name != key {
            return Err(OpError::invalid_argument(format!(
                "variable `{}` is stored under key `{}`",
                var.name, key
            )));
        }
    }
    Ok(program)
}

/// Load a program from a `.json` file.
pub fn load_program_from_path(path: impl AsRef<Path>) -> Result<ProgramDesc, OpError> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref).map_err(|err| OpError::io(path_ref, err))?;
    parse_program(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DataType;

    #[test]
    fn fills_missing_var_names() {
        let program = parse_program(
            r#"{
                "vars": {"x": {"data_type": "float32", "shape": [4, 3]}},
                "ops": []
            }"#,
        )
        .unwrap();
        assert_eq!(program.vars["x"].name, "x");
        assert_eq!(program.vars["x"].data_type, Some(DataType::Float32));
    }

    #[test]
    fn rejects_mismatched_var_names() {
        let err = parse_program(r#"{"vars": {"x": {"name": "y"}}}"#).unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument { .. }));
    }

    #[test]
    fn reports_parse_errors() {
        assert!(matches!(
            parse_program("{ not json"),
            Err(OpError::Parse { .. })
        ));
    }

    #[test]
    fn reports_missing_file() {
        assert!(matches!(
            load_program_from_path("/nonexistent/program.json"),
            Err(OpError::Io { .. })
        ));
    }
}
