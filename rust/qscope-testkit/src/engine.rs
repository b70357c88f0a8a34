//! An in-memory [`QueryEngine`].
//!
//! Structural attributes are plain region vectors. Named sets are match lists
//! shared by all corpora. Commands are parsed just far enough to serve the
//! forms built by `qscope_backend::cqp`; anything else is an engine error.

use std::{cell::RefCell, collections::BTreeMap, path::Path};

use ahash::AHashMap;
use qscope_backend::{AttributeRegion, QueryEngine, RegionStream};
use qscope_common::{Result, error::Error};
use qscope_ranges::{IntervalList, dump_format};

/// The token index of one corpus.
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    pub wordcount: u64,
    /// Attribute handle (`text`, `text_id`, `u`, `u_who`, ...) to its regions
    /// in corpus order.
    pub attributes: BTreeMap<String, Vec<AttributeRegion>>,
}

impl CorpusIndex {
    fn regions(&self, attribute: &str) -> Result<&[AttributeRegion]> {
        self.attributes
            .get(attribute)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::not_found("attribute", attribute))
    }

    /// Value of `attribute` at `cpos`, if a region covers it.
    fn value_at(&self, attribute: &str, cpos: u32) -> Result<Option<&str>> {
        let regions = self.regions(attribute)?;
        let idx = regions.partition_point(|r| r.end < cpos);
        Ok(regions
            .get(idx)
            .filter(|r| r.begin <= cpos)
            .and_then(|r| r.value.as_deref()))
    }
}

#[derive(Default)]
pub struct MemoryEngine {
    corpora: RefCell<AHashMap<String, CorpusIndex>>,
    active: RefCell<Option<String>>,
    sets: RefCell<AHashMap<String, Vec<(u32, u32)>>>,
    history: RefCell<Vec<String>>,
}

impl MemoryEngine {
    pub fn new() -> MemoryEngine {
        Self::default()
    }

    pub fn add_corpus(&self, name: &str, index: CorpusIndex) {
        self.corpora.borrow_mut().insert(name.to_string(), index);
    }

    /// Registers the result of a named query: `(match, matchend)` pairs.
    pub fn define_set(&self, name: &str, matches: Vec<(u32, u32)>) {
        self.sets.borrow_mut().insert(name.to_string(), matches);
    }

    pub fn set(&self, name: &str) -> Option<Vec<(u32, u32)>> {
        self.sets.borrow().get(name).cloned()
    }

    /// Every command passed to [`QueryEngine::execute`] so far.
    pub fn commands(&self) -> Vec<String> {
        self.history.borrow().clone()
    }

    pub fn clear_commands(&self) {
        self.history.borrow_mut().clear();
    }

    fn with_active<T>(&self, command: &str, f: impl FnOnce(&CorpusIndex) -> Result<T>) -> Result<T> {
        let active = self.active.borrow();
        let name = active
            .as_deref()
            .ok_or_else(|| Error::engine(command, "no corpus activated"))?;
        let corpora = self.corpora.borrow();
        let index = corpora
            .get(name)
            .ok_or_else(|| Error::engine(command, format!("corpus {name} vanished")))?;
        f(index)
    }

    fn set_matches(&self, command: &str, name: &str) -> Result<Vec<(u32, u32)>> {
        self.set(name)
            .ok_or_else(|| Error::engine(command, format!("no such set {name}")))
    }

    fn activate(&self, command: &str, handle: &str) -> Result<Vec<String>> {
        let name = self
            .corpora
            .borrow()
            .keys()
            .find(|name| name.to_uppercase() == handle)
            .cloned()
            .ok_or_else(|| Error::engine(command, format!("unknown corpus {handle}")))?;
        *self.active.borrow_mut() = Some(name);
        Ok(Vec::new())
    }

    fn define_regions(&self, command: &str, set: &str, query: &str) -> Result<Vec<String>> {
        let (element, expand) = query
            .strip_prefix('<')
            .and_then(|q| q.split_once("> [] expand to "))
            .ok_or_else(|| Error::engine(command, "unsupported query"))?;
        if element != expand {
            return Err(Error::engine(command, "expansion element differs"));
        }
        let matches = self.with_active(command, |index| {
            Ok(index
                .regions(element)?
                .iter()
                .map(|r| (r.begin, r.end))
                .collect::<Vec<_>>())
        })?;
        self.define_set(set, matches);
        Ok(Vec::new())
    }

    fn tabulate(&self, command: &str, args: &str) -> Result<Vec<String>> {
        let bad = || Error::engine(command, "malformed tabulate");
        let mut parts = args.splitn(4, ' ');
        let set = parts.next().ok_or_else(bad)?;
        let from: usize = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let to: usize = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let columns: Vec<&str> = parts.next().ok_or_else(bad)?.split(", ").collect();
        if columns.len() < 2 || columns[0] != "match" || columns[1] != "matchend" {
            return Err(bad());
        }
        let attributes = columns[2..]
            .iter()
            .map(|c| c.strip_prefix("match ").ok_or_else(bad))
            .collect::<Result<Vec<_>>>()?;

        let matches = self.set_matches(command, set)?;
        let rows = matches.get(from..=to.min(matches.len().saturating_sub(1)));
        self.with_active(command, |index| {
            rows.unwrap_or_default()
                .iter()
                .map(|&(begin, end)| {
                    let mut line = format!("{begin}\t{end}");
                    for attribute in &attributes {
                        line.push('\t');
                        line.push_str(index.value_at(attribute, begin)?.unwrap_or_default());
                    }
                    Ok(line)
                })
                .collect()
        })
    }

    fn group(&self, command: &str, args: &str) -> Result<Vec<String>> {
        let (set, attribute) = match args.split_whitespace().collect::<Vec<_>>()[..] {
            [set, "match", attribute] => (set, attribute),
            _ => return Err(Error::engine(command, "malformed group")),
        };
        let matches = self.set_matches(command, set)?;
        self.with_active(command, |index| {
            let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
            for &(begin, _) in &matches {
                if let Some(value) = index.value_at(attribute, begin)? {
                    *counts.entry(value).or_default() += 1;
                }
            }
            Ok(counts
                .into_iter()
                .map(|(value, count)| format!("{value}\t{count}"))
                .collect())
        })
    }
}

impl QueryEngine for MemoryEngine {
    fn execute(&self, command: &str) -> Result<Vec<String>> {
        self.history.borrow_mut().push(command.to_string());
        let cmd = command
            .trim()
            .strip_suffix(';')
            .ok_or_else(|| Error::engine(command, "missing terminator"))?
            .trim();

        if let Some(set) = cmd.strip_prefix("size ") {
            Ok(vec![self.set_matches(command, set)?.len().to_string()])
        } else if let Some(args) = cmd.strip_prefix("tabulate ") {
            self.tabulate(command, args)
        } else if let Some(args) = cmd.strip_prefix("group ") {
            self.group(command, args)
        } else if let Some(set) = cmd.strip_prefix("discard ") {
            self.sets.borrow_mut().remove(set);
            Ok(Vec::new())
        } else if let Some((set, query)) = cmd.split_once(" = ") {
            self.define_regions(command, set, query)
        } else if !cmd.is_empty() && !cmd.contains(' ') {
            self.activate(command, cmd)
        } else {
            Err(Error::engine(command, "unsupported command"))
        }
    }

    fn open_attribute_stream(&self, corpus: &str, attribute: &str) -> Result<RegionStream<'_>> {
        let corpora = self.corpora.borrow();
        let index = corpora
            .get(corpus)
            .ok_or_else(|| Error::not_found("corpus", corpus))?;
        let regions = index.regions(attribute)?.to_vec();
        Ok(Box::new(regions.into_iter().map(Ok)))
    }

    fn undump(&self, name: &str, path: &Path) -> Result<()> {
        let list = dump_format::read_dump_file(path)?;
        self.define_set(name, list.to_pairs());
        Ok(())
    }

    fn dump(&self, name: &str, path: &Path) -> Result<()> {
        let matches = self.set_matches("dump", name)?;
        let list = IntervalList::from_pairs(matches)?;
        dump_format::write_dump_file(path, &list)
    }

    fn corpus_wordcount(&self, corpus: &str) -> Result<u64> {
        self.corpora
            .borrow()
            .get(corpus)
            .map(|index| index.wordcount)
            .ok_or_else(|| Error::not_found("corpus", corpus))
    }

    fn corpus_text_count(&self, corpus: &str) -> Result<u64> {
        let corpora = self.corpora.borrow();
        let index = corpora
            .get(corpus)
            .ok_or_else(|| Error::not_found("corpus", corpus))?;
        Ok(index.regions("text")?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use qscope_backend::cqp;

    use super::*;

    fn region(begin: u32, end: u32, value: Option<&str>) -> AttributeRegion {
        AttributeRegion {
            begin,
            end,
            value: value.map(str::to_string),
        }
    }

    fn engine() -> MemoryEngine {
        let mut index = CorpusIndex {
            wordcount: 20,
            ..Default::default()
        };
        index
            .attributes
            .insert("u".into(), vec![region(0, 4, None), region(10, 14, None)]);
        index.attributes.insert(
            "u_who".into(),
            vec![region(0, 4, Some("s1")), region(10, 14, Some("s2"))],
        );
        let engine = MemoryEngine::new();
        engine.add_corpus("demo", index);
        engine
    }

    #[test]
    fn test_define_size_tabulate() {
        let engine = engine();
        engine.execute(&cqp::activate_corpus("demo")).unwrap();
        engine
            .execute(&cqp::define_regions(cqp::SCRATCH_SET, "u"))
            .unwrap();
        assert_eq!(
            engine.execute(&cqp::size(cqp::SCRATCH_SET)).unwrap(),
            vec!["2"]
        );
        let rows = engine
            .execute(&cqp::tabulate(cqp::SCRATCH_SET, 1, 5, &["u_who".to_string()]))
            .unwrap();
        assert_eq!(rows, vec!["10\t14\ts2"]);
        engine.execute(&cqp::discard(cqp::SCRATCH_SET)).unwrap();
        assert!(engine.set(cqp::SCRATCH_SET).is_none());
    }

    #[test]
    fn test_group_and_errors() {
        let engine = engine();
        engine.define_set("Q", vec![(1, 1), (2, 3), (11, 11)]);
        assert!(engine.execute(&cqp::group("Q", "u_who")).is_err());
        engine.execute("DEMO;").unwrap();
        assert_eq!(
            engine.execute(&cqp::group("Q", "u_who")).unwrap(),
            vec!["s1\t2", "s2\t1"]
        );
        assert!(engine.execute("OTHER;").is_err());
        assert!(engine.execute("show corpora").is_err());
        assert_eq!(engine.corpus_text_count("demo").ok(), None);
    }

    #[test]
    fn test_dump_undump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.dump");
        let engine = engine();
        engine.define_set("A", vec![(0, 4), (5, 9)]);
        engine.dump("A", &path).unwrap();
        engine.undump("B", &path).unwrap();
        assert_eq!(engine.set("B").unwrap(), vec![(0, 9)]);
    }
}
