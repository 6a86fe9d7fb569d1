//! Command line arguments

use std::path::PathBuf;
use anyhow::{anyhow, bail, Context, Result};

use qv_core::{ParamValue, Parameter, ParameterKind, QuerySet};

pub const USAGE: &str = "\
Usage: queryview <spec.json> [options]

Options:
  --config <path>        JSON configuration file
  --matrix <id1> <id2>   resolve a matrix over two parameters
  --set <id>=<value>     fix a parameter
  --select <id>=<v1,v2>  select values of a matrix axis
  --check-files          report addresses that do not exist on disk
  --render               load and draw every resource
  -h, --help             print this help";

/// A `--set` or `--select` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub spec: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub matrix: Option<(String, String)>,
    pub assignments: Vec<Assignment>,
    pub check_files: bool,
    pub render: bool,
    pub help: bool,
}

impl CliArgs {
    /// Parse arguments, program name excluded
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => parsed.help = true,
                "--check-files" => parsed.check_files = true,
                "--render" => parsed.render = true,
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--matrix" => {
                    let axis1 = args.next().context("--matrix needs two parameter ids")?;
                    let axis2 = args.next().context("--matrix needs two parameter ids")?;
                    parsed.matrix = Some((axis1, axis2));
                }
                "--set" | "--select" => {
                    let raw = args.next().with_context(|| format!("{} needs <id>=<value>", arg))?;
                    let (id, value) = raw
                        .split_once('=')
                        .ok_or_else(|| anyhow!("expected <id>=<value>, got '{}'", raw))?;
                    let values = if arg == "--select" {
                        value.split(',').map(|v| v.trim().to_string()).collect()
                    } else {
                        vec![value.to_string()]
                    };
                    parsed.assignments.push(Assignment {
                        id: id.to_string(),
                        values,
                    });
                }
                other if other.starts_with('-') => bail!("unknown option '{}'", other),
                _ if parsed.spec.is_none() => parsed.spec = Some(PathBuf::from(&arg)),
                _ => bail!("unexpected argument '{}'", arg),
            }
        }

        Ok(parsed)
    }

    /// Apply `--matrix`, then every assignment in order
    pub fn apply(&self, query_set: &QuerySet) -> Result<()> {
        if let Some((axis1, axis2)) = &self.matrix {
            query_set.set_matrix_axes(axis1, axis2)?;
        }

        for assignment in &self.assignments {
            let parameter = query_set
                .parameter(&assignment.id)
                .ok_or_else(|| anyhow!("unknown parameter '{}'", assignment.id))?;
            let values = assignment
                .values
                .iter()
                .map(|raw| lookup_value(parameter, raw))
                .collect::<Result<Vec<_>>>()?;

            if parameter.is_variable() {
                parameter.set_value(values)?;
            } else {
                match values.as_slice() {
                    [value] => parameter.set_value(value.clone())?,
                    _ => bail!("parameter '{}' is fixed and takes one value", assignment.id),
                }
            }
        }
        Ok(())
    }
}

/// The value of `parameter` written as `raw`
fn lookup_value(parameter: &Parameter, raw: &str) -> Result<ParamValue> {
    let wanted = ParamValue::from(raw);
    parameter
        .values()
        .iter()
        .find(|v| {
            v.to_string() == raw || (parameter.kind() != ParameterKind::Set && v.numerically_eq(&wanted))
        })
        .cloned()
        .ok_or_else(|| anyhow!("'{}' is not a value of parameter '{}'", raw, parameter.label()))
}
