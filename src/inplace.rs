use crate::graph::OpDesc;

/// Declares which (input slot, output slot) pairs of an op type may share
/// storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InplaceInferer {
    pairs: Vec<(String, String)>,
}

impl InplaceInferer {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(input, output)| (input.into(), output.into()))
                .collect(),
        }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Concrete (input var, output var) pairs of `op`. Pairs where either
    /// slot is unbound are skipped.
    pub fn resolve(&self, op: &OpDesc) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .filter_map(|(input, output)| {
                let input_var = op.input(input).first()?;
                let output_var = op.output(output).first()?;
                Some((input_var.clone(), output_var.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bound_pairs() {
        let inferer = InplaceInferer::new([("X", "Out"), ("Y", "Out")]);
        let mut op = OpDesc::new("dummy");
        op.set_input("X", vec!["x".to_string()]);
        op.set_output("Out", vec!["out".to_string()]);
        assert_eq!(
            inferer.resolve(&op),
            vec![("x".to_string(), "out".to_string())]
        );
        assert_eq!(inferer.pairs().len(), 2);
    }
}
