//! The two-column text form of an interval list, as read and written by the
//! query engine's `dump`/`undump` commands.
//!
//! One interval per line, `begin<TAB>end`, ascending, adjacent intervals
//! merged.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use qscope_common::{Result, error::Error};

use crate::{Interval, IntervalList, coalesce};

/// Writes `intervals` in dump form. Adjacent intervals are merged on the way out.
pub fn write_dump<W: Write>(writer: W, intervals: &IntervalList) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    for interval in coalesce(intervals.iter().copied()) {
        writeln!(writer, "{}\t{}", interval.begin, interval.end)
            .map_err(|e| Error::io("write dump line", e))?;
    }
    writer.flush().map_err(|e| Error::io("flush dump", e))
}

/// Writes a dumpfile at `path`, overwriting any existing file.
pub fn write_dump_file(path: &Path, intervals: &IntervalList) -> Result<()> {
    let file =
        File::create(path).map_err(|e| Error::io(format!("create {}", path.display()), e))?;
    write_dump(file, intervals)
}

/// Reads dump form. Blank lines are skipped; the intervals must be ascending
/// and non-overlapping.
pub fn read_dump<R: BufRead>(reader: R) -> Result<IntervalList> {
    let mut intervals = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io("read dump line", e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        intervals.push(parse_line(line).ok_or_else(|| {
            Error::parse("dump line", format!("line {}: {line}", line_no + 1))
        })?);
    }
    IntervalList::from_sorted(intervals)
}

/// Reads the dumpfile at `path`.
pub fn read_dump_file(path: &Path) -> Result<IntervalList> {
    let file = File::open(path).map_err(|e| Error::io(format!("open {}", path.display()), e))?;
    read_dump(BufReader::new(file))
}

fn parse_line(line: &str) -> Option<Interval> {
    let mut columns = line.split('\t');
    let begin = columns.next()?.trim().parse().ok()?;
    let end = columns.next()?.trim().parse().ok()?;
    if columns.next().is_some() {
        return None;
    }
    Interval::try_new(begin, end)
}
