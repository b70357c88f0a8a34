//! Command text understood by the query engine, and parsers for its output.
//!
//! Only the small command subset used for scope resolution is covered:
//! corpus activation, region-set definition, `size`, `tabulate`, `group`
//! and `discard`.

use log::debug;
use qscope_common::{Result, error::Error};

use crate::QueryEngine;

/// Name of the scratch set used while tabulating regions.
pub const SCRATCH_SET: &str = "QscopeRegions";

/// Name under which an activated scope is loaded.
pub const SCOPE_SET: &str = "QscopeScope";

/// Makes `corpus` the active corpus for subsequent commands.
pub fn activate_corpus(corpus: &str) -> String {
    format!("{};", corpus.to_uppercase())
}

/// Defines `set` as the set of all regions of `element`, one match per region.
pub fn define_regions(set: &str, element: &str) -> String {
    format!("{set} = <{element}> [] expand to {element};")
}

pub fn size(set: &str) -> String {
    format!("size {set};")
}

/// Tabulates matches `from..=to` of `set`: match, matchend and the value of
/// each attribute at the match position, tab-separated.
pub fn tabulate(set: &str, from: u64, to: u64, attributes: &[String]) -> String {
    let mut columns = vec!["match".to_string(), "matchend".to_string()];
    columns.extend(attributes.iter().map(|a| format!("match {a}")));
    format!("tabulate {set} {from} {to} {};", columns.join(", "))
}

/// Frequency of each value of `attribute` over the matches of `set`.
pub fn group(set: &str, attribute: &str) -> String {
    format!("group {set} match {attribute};")
}

pub fn discard(set: &str) -> String {
    format!("discard {set};")
}

/// Parses the single-line output of `size`.
pub fn parse_size(lines: &[String]) -> Result<u64> {
    match lines {
        [line] => line
            .trim()
            .parse()
            .map_err(|_| Error::engine("size", format!("unexpected output '{line}'"))),
        _ => Err(Error::engine("size", format!("expected one line, got {}", lines.len()))),
    }
}

/// One row of `tabulate` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabulatedMatch {
    pub begin: u32,
    pub end: u32,
    pub values: Vec<String>,
}

pub fn parse_tabulate_line(line: &str, n_values: usize) -> Result<TabulatedMatch> {
    let bad = || Error::engine("tabulate", format!("unexpected row '{line}'"));
    let mut columns = line.split('\t');
    let begin = columns.next().and_then(|c| c.parse().ok()).ok_or_else(bad)?;
    let end = columns.next().and_then(|c| c.parse().ok()).ok_or_else(bad)?;
    let values: Vec<String> = columns.map(str::to_string).collect();
    if values.len() != n_values || begin > end {
        return Err(bad());
    }
    Ok(TabulatedMatch { begin, end, values })
}

/// Parses one `value<TAB>count` row of `group` output.
pub fn parse_group_line(line: &str) -> Result<(String, u64)> {
    line.rsplit_once('\t')
        .and_then(|(value, count)| Some((value.to_string(), count.trim().parse().ok()?)))
        .ok_or_else(|| Error::engine("group", format!("unexpected row '{line}'")))
}

/// Tabulates all matches of `set` in batches of `batch_size` rows, feeding each
/// row to `sink`. Returns the number of rows processed.
///
/// At most one batch of output is held in memory at a time.
pub fn tabulate_in_batches<F>(
    engine: &dyn QueryEngine,
    set: &str,
    attributes: &[String],
    batch_size: usize,
    mut sink: F,
) -> Result<u64>
where
    F: FnMut(TabulatedMatch) -> Result<()>,
{
    let total = parse_size(&engine.execute(&size(set))?)?;
    let batch_size = batch_size.max(1) as u64;
    let mut from = 0;
    let mut batches = 0;
    while from < total {
        let to = (from + batch_size).min(total) - 1;
        for line in engine.execute(&tabulate(set, from, to, attributes))? {
            sink(parse_tabulate_line(&line, attributes.len())?)?;
        }
        batches += 1;
        from = to + 1;
    }
    debug!("tabulated {total} matches of {set} in {batches} batches");
    Ok(total)
}
