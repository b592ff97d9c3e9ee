//! Compiled text transforms for identifiers and coded values.

use regex::Regex;

use pheno_common::parse_i64;
use pheno_model::{PhenoError, Result, TextTransform};

use crate::session::iso_date;

#[derive(Debug, Clone)]
enum Step {
    StripPrefix(String),
    StripSuffix(String),
    Replace { from: String, to: String },
    Split { separator: String, index: i64 },
    Extract(Regex),
    TrimLeadingZeros,
    Integer,
    Lowercase,
    Uppercase,
    IsoDate,
}

/// A sequence of [`TextTransform`]s with regexes compiled once.
#[derive(Debug, Clone, Default)]
pub struct TextPipeline {
    steps: Vec<Step>,
}

impl TextPipeline {
    pub fn compile(transforms: &[TextTransform], cohort: &str) -> Result<Self> {
        let steps = transforms
            .iter()
            .map(|transform| -> Result<Step> {
                Ok(match transform {
                    TextTransform::StripPrefix(prefix) => Step::StripPrefix(prefix.clone()),
                    TextTransform::StripSuffix(suffix) => Step::StripSuffix(suffix.clone()),
                    TextTransform::Replace { from, to } => Step::Replace {
                        from: from.clone(),
                        to: to.clone(),
                    },
                    TextTransform::Split { separator, index } => Step::Split {
                        separator: separator.clone(),
                        index: *index,
                    },
                    TextTransform::Extract(pattern) => {
                        Step::Extract(compile_regex(pattern, cohort)?)
                    }
                    TextTransform::TrimLeadingZeros => Step::TrimLeadingZeros,
                    TextTransform::Integer => Step::Integer,
                    TextTransform::Lowercase => Step::Lowercase,
                    TextTransform::Uppercase => Step::Uppercase,
                    TextTransform::IsoDate => Step::IsoDate,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Applies every step; `None` when a step cannot produce a value.
    pub fn apply(&self, value: &str) -> Option<String> {
        let mut current = value.trim().to_string();
        for step in &self.steps {
            current = apply_step(step, &current)?;
        }
        let current = current.trim().to_string();
        (!current.is_empty()).then_some(current)
    }
}

pub(crate) fn compile_regex(pattern: &str, cohort: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        PhenoError::invalid_config(cohort, format!("invalid regex {pattern:?}: {e}"))
    })
}

fn apply_step(step: &Step, value: &str) -> Option<String> {
    match step {
        Step::StripPrefix(prefix) => Some(
            value
                .strip_prefix(prefix.as_str())
                .unwrap_or(value)
                .to_string(),
        ),
        Step::StripSuffix(suffix) => Some(
            value
                .strip_suffix(suffix.as_str())
                .unwrap_or(value)
                .to_string(),
        ),
        Step::Replace { from, to } => Some(value.replace(from.as_str(), to)),
        Step::Split { separator, index } => {
            let parts: Vec<&str> = value.split(separator.as_str()).collect();
            let idx = if *index < 0 {
                parts.len().checked_sub(index.unsigned_abs() as usize)?
            } else {
                *index as usize
            };
            parts.get(idx).map(|part| (*part).to_string())
        }
        Step::Extract(regex) => {
            let captures = regex.captures(value)?;
            captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str().to_string())
        }
        Step::TrimLeadingZeros => Some(value.trim_start_matches('0').to_string()),
        Step::Integer => parse_i64(value).map(|v| v.to_string()),
        Step::Lowercase => Some(value.to_lowercase()),
        Step::Uppercase => Some(value.to_uppercase()),
        Step::IsoDate => iso_date(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(transforms: Vec<TextTransform>) -> TextPipeline {
        TextPipeline::compile(&transforms, "test").expect("compile")
    }

    #[test]
    fn adni_subject_to_rid() {
        let rid = pipeline(vec![
            TextTransform::Split {
                separator: "S".into(),
                index: -1,
            },
            TextTransform::Integer,
        ]);
        assert_eq!(rid.apply("011S0002").as_deref(), Some("2"));

        let site = pipeline(vec![
            TextTransform::Split {
                separator: "_".into(),
                index: 0,
            },
            TextTransform::TrimLeadingZeros,
        ]);
        assert_eq!(site.apply("011_S_0002").as_deref(), Some("11"));
    }

    #[test]
    fn extract_keeps_first_group() {
        let days = pipeline(vec![TextTransform::Extract(r"(d\d+)".into())]);
        assert_eq!(days.apply("OAS30001_MR_d0129").as_deref(), Some("d0129"));
        assert_eq!(days.apply("OAS30001_MR"), None);
    }

    #[test]
    fn empty_results_are_missing() {
        let strip = pipeline(vec![TextTransform::StripPrefix("sub-".into())]);
        assert_eq!(strip.apply("sub-10159").as_deref(), Some("10159"));
        assert_eq!(strip.apply("sub-"), None);
        let integer = pipeline(vec![TextTransform::Integer]);
        assert_eq!(integer.apply("2.0").as_deref(), Some("2"));
        assert_eq!(integer.apply("2.5"), None);
    }

    #[test]
    fn out_of_range_split_is_missing() {
        let split = pipeline(vec![TextTransform::Split {
            separator: "_".into(),
            index: -4,
        }]);
        assert_eq!(split.apply("a_b_c"), None);
    }

    #[test]
    fn bad_regex_is_a_config_error() {
        let err = TextPipeline::compile(&[TextTransform::Extract("(".into())], "oasis3")
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration for oasis3"));
    }
}
