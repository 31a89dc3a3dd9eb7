use serde::{Deserialize, Serialize};

/// When arithmetic in values is evaluated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MathMode {
    /// Every operation is evaluated.
    Always,
    /// Division only inside parentheses, everything else always.
    #[default]
    ParensDivision,
    /// Only operations inside parentheses.
    Parens,
}

/// Source position banners written before rulesets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpLineNumbers {
    #[default]
    Off,
    Comments,
    Mediaquery,
    All,
}

/// Settings shared by evaluation and CSS generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    pub compress: bool,
    pub math: MathMode,
    pub strict_imports: bool,
    pub dump_line_numbers: DumpLineNumbers,
    /// Nested mixin calls beyond this depth abort the compilation.
    pub mixin_depth_limit: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            compress: false,
            math: MathMode::default(),
            strict_imports: false,
            dump_line_numbers: DumpLineNumbers::default(),
            mixin_depth_limit: 128,
        }
    }
}

impl CompileOptions {
    /// Read options from a JSON document. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns the `serde_json` error when the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_camel_case_and_defaults() -> Result<(), serde_json::Error> {
        let options = CompileOptions::from_json(
            r#"{ "compress": true, "math": "parens", "dumpLineNumbers": "comments" }"#,
        )?;
        assert!(options.compress);
        assert_eq!(options.math, MathMode::Parens);
        assert_eq!(options.dump_line_numbers, DumpLineNumbers::Comments);
        assert_eq!(options.mixin_depth_limit, 128);
        assert!(!options.strict_imports);
        Ok(())
    }

    #[test]
    fn math_mode_names() -> Result<(), serde_json::Error> {
        let options = CompileOptions::from_json(r#"{ "math": "parens-division" }"#)?;
        assert_eq!(options.math, MathMode::ParensDivision);
        let rejected = CompileOptions::from_json(r#"{ "math": "sometimes" }"#).err();
        assert!(rejected.is_some_and(|error| error.is_data()));
        Ok(())
    }
}
