//! The query engine: the process that owns the token index, runs queries, and
//! holds named interval sets.

use std::path::Path;

use qscope_common::Result;
use qscope_ranges::Interval;

/// One region of a structural attribute, with its annotation value when the
/// attribute carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRegion {
    pub begin: u32,
    pub end: u32,
    pub value: Option<String>,
}

impl AttributeRegion {
    pub fn interval(&self) -> Interval {
        Interval::new(self.begin, self.end)
    }
}

/// Ordered, full-scan access to one structural attribute.
pub type RegionStream<'a> = Box<dyn Iterator<Item = Result<AttributeRegion>> + 'a>;

/// Operations this crate family needs from the query engine.
///
/// Command text for [`QueryEngine::execute`] is built by [`crate::cqp`].
pub trait QueryEngine {
    /// Runs one command and returns its output lines.
    fn execute(&self, command: &str) -> Result<Vec<String>>;

    /// Streams the regions of `attribute` (e.g. `text`, `u`, `text_id`,
    /// `u_who`) in corpus order.
    fn open_attribute_stream(&self, corpus: &str, attribute: &str) -> Result<RegionStream<'_>>;

    /// Loads the dumpfile at `path` as the named set `name`.
    fn undump(&self, name: &str, path: &Path) -> Result<()>;

    /// Saves the named set `name` to a dumpfile at `path`.
    fn dump(&self, name: &str, path: &Path) -> Result<()>;

    /// Number of tokens in the corpus.
    fn corpus_wordcount(&self, corpus: &str) -> Result<u64>;

    /// Number of texts in the corpus.
    fn corpus_text_count(&self, corpus: &str) -> Result<u64>;
}
