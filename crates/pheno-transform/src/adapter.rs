//! Declarative cohort normalisation.
//!
//! One adapter, driven by a [`CohortConfig`], turns a raw cohort export into
//! the canonical phenotype table and its metadata dictionary.

use std::collections::BTreeMap;
use std::time::Instant;

use regex::Regex;
use tracing::{debug, info_span};

use pheno_common::{parse_f64, round_to};
use pheno_model::{
    AgeFromEntry, Cell, CohortConfig, ColumnDescription, FieldRule, FieldSource, FirstCodeRule,
    MetadataDictionary, NumericRule, PhenoError, Result, Table, default_description,
};

use crate::filter::{CompiledFilter, apply_filters, compile_filters};
use crate::matcher::asof_join;
use crate::text::{TextPipeline, compile_regex};

const DAYS_PER_YEAR: f64 = 365.25;

/// Canonical phenotype table plus its dictionary.
#[derive(Debug, Clone)]
pub struct NormalizedCohort {
    pub table: Table,
    pub dictionary: MetadataDictionary,
}

#[derive(Debug, Clone)]
enum Plan {
    Column {
        column: String,
        pipeline: TextPipeline,
        levels: Option<BTreeMap<String, String>>,
        numeric: Option<NumericRule>,
    },
    Constant(String),
    AgeFromEntry {
        rule: AgeFromEntry,
        days: Regex,
    },
    FirstCode(FirstCodeRule),
}

#[derive(Debug, Clone)]
struct FieldPlan {
    name: String,
    rule: FieldRule,
    plan: Plan,
}

/// A cohort configuration with every regex and transform compiled.
#[derive(Debug, Clone)]
pub struct CompiledAdapter {
    config: CohortConfig,
    filters: Vec<CompiledFilter>,
    fields: Vec<FieldPlan>,
}

impl CompiledAdapter {
    pub fn compile(config: &CohortConfig) -> Result<Self> {
        config.validate()?;
        let cohort = config.name();
        let filters = compile_filters(&config.source.filters, cohort)?;

        let mut rules: Vec<(&str, &FieldRule)> = config.fields.configured();
        rules.extend(
            config
                .extra
                .iter()
                .map(|extra| (extra.name.as_str(), &extra.rule)),
        );
        let fields = rules
            .into_iter()
            .map(|(name, rule)| -> Result<FieldPlan> {
                Ok(FieldPlan {
                    name: name.to_string(),
                    rule: rule.clone(),
                    plan: compile_plan(cohort, name, rule)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config: config.clone(),
            filters,
            fields,
        })
    }

    pub fn config(&self) -> &CohortConfig {
        &self.config
    }

    /// Normalises `input`, resolving `[[joins]]` sources from `aux` by name.
    pub fn normalize(
        &self,
        input: &Table,
        aux: &BTreeMap<String, Table>,
    ) -> Result<NormalizedCohort> {
        let cohort = self.config.name();
        let span = info_span!("normalize", cohort = %cohort);
        let _guard = span.enter();
        let start = Instant::now();

        let mut current = apply_filters(input, &self.filters)?;
        let filtered_rows = current.len();
        for join in &self.config.joins {
            let right = aux.get(&join.source).ok_or_else(|| PhenoError::MissingAuxiliary {
                cohort: cohort.to_string(),
                name: join.source.clone(),
            })?;
            current = asof_join(&current, right, &join.on, &join.columns, None)?;
        }

        let mut table = Table::new(cohort, Vec::new());
        table.rows = vec![Vec::new(); current.len()];
        let mut dictionary = MetadataDictionary::new();
        let mut derived: Vec<(String, Vec<Cell>, ColumnDescription)> = Vec::new();

        for field in &self.fields {
            let cells = match &field.plan {
                Plan::Column {
                    column,
                    pipeline,
                    levels,
                    numeric,
                } => {
                    let idx = current.require_column(column)?;
                    (0..current.len())
                        .map(|row| {
                            map_value(
                                current.cell(row, idx),
                                pipeline,
                                levels.as_ref(),
                                numeric.as_ref(),
                            )
                        })
                        .collect()
                }
                Plan::Constant(value) => vec![Cell::text(value); current.len()],
                Plan::AgeFromEntry { rule, days } => age_from_entry(&current, rule, days)?,
                Plan::FirstCode(rule) => {
                    let coded = first_code(&current, rule);
                    if let Some(name) = &rule.code_column {
                        derived.push((
                            name.clone(),
                            coded.codes,
                            ColumnDescription {
                                original_field_name: format!("{}.x", rule.column_prefix),
                                description: format!("Code that determined {}", field.name),
                                levels: None,
                            },
                        ));
                    }
                    if let Some(name) = &rule.count_column {
                        derived.push((
                            name.clone(),
                            coded.counts,
                            ColumnDescription {
                                original_field_name: format!("{}.x", rule.column_prefix),
                                description: format!("Number of codes under {}", rule.column_prefix),
                                levels: None,
                            },
                        ));
                    }
                    coded.labels
                }
            };
            table.set_column(&field.name, cells);
            dictionary.insert(&field.name, describe(&field.name, &field.rule));
        }
        for (name, cells, description) in derived {
            table.set_column(&name, cells);
            dictionary.insert(name, description);
        }

        debug!(
            input_rows = input.len(),
            filtered_rows,
            output_rows = table.len(),
            columns = table.columns.len(),
            duration_ms = start.elapsed().as_millis(),
            "cohort normalized"
        );
        Ok(NormalizedCohort { table, dictionary })
    }
}

/// Compiles and runs the adapter in one step.
pub fn normalize(
    config: &CohortConfig,
    input: &Table,
    aux: &BTreeMap<String, Table>,
) -> Result<NormalizedCohort> {
    CompiledAdapter::compile(config)?.normalize(input, aux)
}

fn compile_plan(cohort: &str, name: &str, rule: &FieldRule) -> Result<Plan> {
    let source = rule.source().ok_or_else(|| {
        PhenoError::invalid_config(cohort, format!("field {name} has no single source"))
    })?;
    Ok(match source {
        FieldSource::Column(column) => Plan::Column {
            column: column.to_string(),
            pipeline: TextPipeline::compile(&rule.transforms, cohort)?,
            levels: rule.levels.clone(),
            numeric: rule.numeric.clone(),
        },
        FieldSource::Constant(value) => Plan::Constant(value.to_string()),
        FieldSource::AgeFromEntry(age) => Plan::AgeFromEntry {
            rule: age.clone(),
            days: compile_regex(&age.days_pattern, cohort)?,
        },
        FieldSource::FirstCode(codes) => Plan::FirstCode(codes.clone()),
    })
}

/// Transforms, then level mapping (unmapped values are missing), then numeric conversion.
fn map_value(
    cell: &Cell,
    pipeline: &TextPipeline,
    levels: Option<&BTreeMap<String, String>>,
    numeric: Option<&NumericRule>,
) -> Cell {
    let Some(text) = cell.as_text().and_then(|text| pipeline.apply(&text)) else {
        return Cell::Missing;
    };
    let text = match levels {
        Some(levels) => match levels.get(&text) {
            Some(label) => label.clone(),
            None => return Cell::Missing,
        },
        None => text,
    };
    match numeric {
        Some(rule) => Cell::number(parse_f64(&text).map(|value| scale_number(value, rule))),
        None => Cell::Text(text),
    }
}

fn scale_number(value: f64, rule: &NumericRule) -> f64 {
    let value = rule.divide_by.map_or(value, |divisor| value / divisor);
    rule.round.map_or(value, |places| round_to(value, places))
}

fn age_from_entry(table: &Table, rule: &AgeFromEntry, days: &Regex) -> Result<Vec<Cell>> {
    let entry_idx = table.require_column(&rule.entry_column)?;
    let days_idx = table.require_column(&rule.days_column)?;
    Ok((0..table.len())
        .map(|row| {
            let entry = table.cell(row, entry_idx).as_f64();
            let elapsed = table.cell(row, days_idx).as_text().and_then(|label| {
                let captures = days.captures(&label)?;
                let matched = captures.get(1).or_else(|| captures.get(0))?;
                parse_f64(matched.as_str())
            });
            Cell::number(entry.zip(elapsed).map(|(entry, elapsed)| {
                let age = entry + elapsed / DAYS_PER_YEAR;
                rule.round.map_or(age, |places| round_to(age, places))
            }))
        })
        .collect())
}

struct FirstCodes {
    labels: Vec<Cell>,
    codes: Vec<Cell>,
    counts: Vec<Cell>,
}

/// Scans every column under the prefix; the first recognised code wins.
fn first_code(table: &Table, rule: &FirstCodeRule) -> FirstCodes {
    let columns: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with(&rule.column_prefix))
        .map(|(idx, _)| idx)
        .collect();
    let mut out = FirstCodes {
        labels: Vec::with_capacity(table.len()),
        codes: Vec::with_capacity(table.len()),
        counts: Vec::with_capacity(table.len()),
    };
    for row in 0..table.len() {
        let codes: Vec<String> = columns
            .iter()
            .filter_map(|&idx| table.cell(row, idx).as_text())
            .map(|code| code.chars().take(rule.code_length).collect())
            .collect();
        out.counts.push(Cell::Number(codes.len() as f64));
        if codes.is_empty() {
            out.labels
                .push(rule.default_none.clone().map_or(Cell::Missing, Cell::Text));
            out.codes.push(Cell::Missing);
            continue;
        }
        let recognised = codes
            .iter()
            .find_map(|code| rule.codes.get(code).map(|label| (code, label)));
        match recognised {
            Some((code, label)) => {
                out.labels.push(Cell::text(label));
                out.codes.push(Cell::text(code));
            }
            None => {
                out.labels
                    .push(rule.default_any.clone().map_or(Cell::Missing, Cell::Text));
                out.codes.push(Cell::text(&codes[0]));
            }
        }
    }
    out
}

fn describe(name: &str, rule: &FieldRule) -> ColumnDescription {
    let levels = rule.level_descriptions.clone().or_else(|| {
        rule.levels.as_ref().map(|levels| {
            levels
                .values()
                .map(|label| (label.clone(), label.clone()))
                .collect()
        })
    });
    ColumnDescription {
        original_field_name: rule.source_name(),
        description: rule
            .description
            .clone()
            .unwrap_or_else(|| default_description(name)),
        levels,
    }
}
