//! Generalized ufunc core-dimension signatures
//!
//! A signature such as `(m,n),(n,p)->(m,p)` declares the core dimensions of
//! every input and of the single output. Dimensions sharing a name must have
//! the same extent at call time.

use crate::error::SignatureError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuSignature {
    inputs: Vec<Vec<String>>,
    output: Vec<String>,
}

impl GuSignature {
    /// Parse `(a,b),(b)->(a)` style text. Whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let malformed = |reason: &str| SignatureError::Malformed {
            signature: text.to_string(),
            reason: reason.to_string(),
        };

        let (lhs, rhs) = compact
            .split_once("->")
            .ok_or_else(|| malformed("missing '->'"))?;

        let inputs = parse_groups(lhs).map_err(|reason| malformed(&reason))?;
        let mut outputs = parse_groups(rhs).map_err(|reason| malformed(&reason))?;

        if inputs.is_empty() {
            return Err(SignatureError::NoInputs);
        }
        if outputs.len() != 1 {
            return Err(SignatureError::MultipleOutputs(outputs.len()));
        }
        let output = outputs.remove(0);

        for (axis, dim) in output.iter().enumerate() {
            if !inputs.iter().any(|group| group.contains(dim)) {
                return Err(SignatureError::OutputOnlyDimension(dim.clone()));
            }
            if output[..axis].contains(dim) {
                return Err(SignatureError::RepeatedOutputDimension(dim.clone()));
            }
        }

        Ok(Self { inputs, output })
    }

    pub fn inputs(&self) -> &[Vec<String>] {
        &self.inputs
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Distinct dimension names in order of first appearance.
    pub fn dimensions(&self) -> Vec<String> {
        let mut dims: Vec<String> = Vec::new();
        for name in self.inputs.iter().flatten().chain(self.output.iter()) {
            if !dims.contains(name) {
                dims.push(name.clone());
            }
        }
        dims
    }
}

fn parse_groups(text: &str) -> Result<Vec<Vec<String>>, String> {
    let mut groups = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('(')
            .ok_or_else(|| format!("expected '(' at '{}'", rest))?;
        let close = inner
            .find(')')
            .ok_or_else(|| "unbalanced parentheses".to_string())?;
        let body = &inner[..close];

        let mut group = Vec::new();
        if !body.is_empty() {
            for name in body.split(',') {
                if !is_identifier(name) {
                    return Err(format!("invalid dimension name '{}'", name));
                }
                group.push(name.to_string());
            }
        }
        groups.push(group);

        rest = &inner[close + 1..];
        if let Some(next) = rest.strip_prefix(',') {
            if next.is_empty() {
                return Err("trailing ','".to_string());
            }
            rest = next;
        } else if !rest.is_empty() {
            return Err(format!("unexpected '{}'", rest));
        }
    }

    Ok(groups)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for GuSignature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GuSignature::parse(s)
    }
}

impl fmt::Display for GuSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = |dims: &[String]| format!("({})", dims.join(","));
        let inputs: Vec<String> = self.inputs.iter().map(|dims| group(dims)).collect();
        write!(f, "{}->{}", inputs.join(","), group(&self.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matmul() {
        let sig = GuSignature::parse("(m, n), (n, p) -> (m, p)").unwrap();
        assert_eq!(sig.inputs().len(), 2);
        assert_eq!(sig.inputs()[1], vec!["n", "p"]);
        assert_eq!(sig.output(), ["m", "p"]);
        assert_eq!(sig.dimensions(), vec!["m", "n", "p"]);
        assert_eq!(sig.to_string(), "(m,n),(n,p)->(m,p)");
    }

    #[test]
    fn test_parse_scalar_core() {
        let sig: GuSignature = "(n),(n)->()".parse().unwrap();
        assert!(sig.output().is_empty());
        assert_eq!(sig.to_string(), "(n),(n)->()");
    }

    #[test]
    fn test_rejects_multiple_outputs() {
        assert_eq!(
            GuSignature::parse("(n)->(),()"),
            Err(SignatureError::MultipleOutputs(2))
        );
    }

    #[test]
    fn test_rejects_output_only_dimension() {
        assert_eq!(
            GuSignature::parse("(n)->(k)"),
            Err(SignatureError::OutputOnlyDimension("k".to_string()))
        );
    }

    #[test]
    fn test_rejects_repeated_output_dimension() {
        assert_eq!(
            GuSignature::parse("(n)->(n,n)"),
            Err(SignatureError::RepeatedOutputDimension("n".to_string()))
        );
        // repeated input dimensions still describe a diagonal
        assert!(GuSignature::parse("(n,n)->(n)").is_ok());
    }

    #[test]
    fn test_rejects_malformed_text() {
        for text in ["(n)", "(n->()", "(n),->()", "(1n)->()", "(n)x->()"] {
            let result = GuSignature::parse(text);
            assert!(
                matches!(result, Err(SignatureError::Malformed { .. })),
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn test_rejects_group_without_parentheses() {
        let err = GuSignature::parse("n->()").unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed signature 'n->()': expected '(' at 'n'"
        );
    }

    #[test]
    fn test_rejects_missing_inputs() {
        assert_eq!(GuSignature::parse("->()"), Err(SignatureError::NoInputs));
    }
}
