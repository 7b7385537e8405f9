//! Placeholder substitution in cell expressions.

use crate::error::{ModelError, ModelResult};
use crate::model::{CellInfo, LogicalUnitInfo};

const CELL_INPUT_PREFIX: &str = "input";
const CELL_OUTPUT_PREFIX: &str = "output";

/// Replaces every `{placeholder}` of `text` with the variable it names.
///
/// Candidates are tried in a fixed order: the cell's parameters (including
/// `out{o}_{p}` ids), the output's own parameters, `inputN`, `outputN`, and
/// finally the cell's variables. The text is trimmed first.
pub fn var_mapped_string(
    text: &str,
    unit: &LogicalUnitInfo,
    cell: &CellInfo,
    output: usize,
) -> ModelResult<String> {
    let text = text.trim();
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((before, placeholder, after)) = next_placeholder(rest) {
        out.push_str(before);
        let var_name = resolve_placeholder(placeholder, unit, cell, output).ok_or_else(|| {
            ModelError::UnresolvedPlaceholder {
                cell: cell.id.clone(),
                placeholder: placeholder.to_string(),
            }
        })?;
        out.push_str(var_name);
        rest = after;
    }
    out.push_str(rest);
    Ok(out)
}

/// Splits `text` around its first non-empty `{...}` group.
fn next_placeholder(text: &str) -> Option<(&str, &str, &str)> {
    let mut search_from = 0;
    loop {
        let open = search_from + text[search_from..].find('{')?;
        let close = open + 1 + text[open + 1..].find('}')?;
        if close > open + 1 {
            return Some((&text[..open], &text[open + 1..close], &text[close + 1..]));
        }
        search_from = close + 1;
    }
}

fn resolve_placeholder<'a>(
    id: &str,
    unit: &'a LogicalUnitInfo,
    cell: &'a CellInfo,
    output: usize,
) -> Option<&'a str> {
    cell.param_var_name(id)
        .or_else(|| cell.output_param_var_name(output, id))
        .or_else(|| {
            let n = positional(id, CELL_INPUT_PREFIX)?;
            unit.input_var_name(*cell.inputs.get(n - 1)?)
        })
        .or_else(|| {
            let n = positional(id, CELL_OUTPUT_PREFIX)?;
            cell.output_var_name(n - 1)
        })
        .or_else(|| cell.var_name(id))
}

/// Parses the 1-based position of `inputN`/`outputN` ids.
fn positional(id: &str, prefix: &str) -> Option<usize> {
    let digits = id.strip_prefix(prefix)?;
    let n: usize = digits.parse().ok()?;
    (n >= 1 && n.to_string() == digits).then_some(n)
}
