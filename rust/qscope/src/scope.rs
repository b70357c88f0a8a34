use std::path::Path;

use log::debug;
use qscope_backend::{ScopeSize, cqp};
use qscope_common::{Result, error::Error};
use qscope_format::{DELETED_SUBCORPUS, ItemType, ScopeString, SubcorpusId, UrlScope};
use qscope_ranges::{Interval, IntervalList, dump_format};
use qscope_restriction::{ItemListOutcome, Restriction, ScopeContext, items::corpus_texts};
use qscope_subcorpus::Subcorpus;

/// Where a query runs.
///
/// Built once per request from a URL fragment or a stored scope string and
/// replaced, never mutated.
#[derive(Debug, Clone)]
pub enum QueryScope {
    WholeCorpus,
    Restriction(Restriction),
    /// A saved subcorpus. The scope's id is the subcorpus' own.
    Subcorpus(Subcorpus),
    /// A well-formed restriction that matches no tokens.
    Empty(Restriction),
    /// A scope that referred to a subcorpus which no longer exists.
    DeletedSubcorpus,
}

impl QueryScope {
    /// Unserializes a stored scope string.
    ///
    /// Unusable restrictions fall back to the whole corpus. A subcorpus id
    /// missing from the store is a deleted subcorpus.
    pub fn from_serialisation(ctx: &ScopeContext<'_>, s: &str) -> Result<QueryScope> {
        match ScopeString::classify(s) {
            Ok(ScopeString::WholeCorpus) => Ok(QueryScope::WholeCorpus),
            Ok(ScopeString::DeletedSubcorpus) => Ok(QueryScope::DeletedSubcorpus),
            Ok(ScopeString::Subcorpus(id)) => Self::load_subcorpus(ctx, id),
            Ok(ScopeString::Restriction(s)) => {
                Ok(Self::from_restriction(Restriction::from_serialisation(ctx, s)?))
            }
            Err(e) if e.is_parse_failure() => {
                debug!("scope string {s:?} read as whole corpus: {e}");
                Ok(QueryScope::WholeCorpus)
            }
            Err(e) => Err(e),
        }
    }

    /// Reads the scope items of a URL query string.
    pub fn from_url(ctx: &ScopeContext<'_>, query: &str) -> Result<QueryScope> {
        match UrlScope::parse(query) {
            Ok(UrlScope::WholeCorpus) => Ok(QueryScope::WholeCorpus),
            Ok(UrlScope::DeletedSubcorpus) => Ok(QueryScope::DeletedSubcorpus),
            Ok(UrlScope::Subcorpus(id)) => Self::load_subcorpus(ctx, id),
            Ok(UrlScope::Restriction(spec)) => {
                Ok(Self::from_restriction(Restriction::from_spec(ctx, spec)?))
            }
            Err(e) if e.is_parse_failure() => {
                debug!("url scope {query:?} read as whole corpus: {e}");
                Ok(QueryScope::WholeCorpus)
            }
            Err(e) => Err(e),
        }
    }

    /// Scope of a saved subcorpus.
    pub fn from_subcorpus(subcorpus: Subcorpus) -> Result<QueryScope> {
        if subcorpus.id().is_none() {
            return Err(Error::invalid_operation(format!(
                "scope of unsaved subcorpus {}",
                subcorpus.name()
            )));
        }
        Ok(QueryScope::Subcorpus(subcorpus))
    }

    fn from_restriction(restriction: Option<Restriction>) -> QueryScope {
        match restriction {
            None => QueryScope::WholeCorpus,
            Some(r) if r.is_empty() => QueryScope::Empty(r),
            Some(r) => QueryScope::Restriction(r),
        }
    }

    fn load_subcorpus(ctx: &ScopeContext<'_>, id: SubcorpusId) -> Result<QueryScope> {
        match Subcorpus::load(ctx, id)? {
            Some(subcorpus) => Ok(QueryScope::Subcorpus(subcorpus)),
            None => {
                debug!("subcorpus {id} of {} no longer exists", ctx.corpus);
                Ok(QueryScope::DeletedSubcorpus)
            }
        }
    }

    pub fn is_whole_corpus(&self) -> bool {
        matches!(self, QueryScope::WholeCorpus)
    }

    /// The stored form: `""`, a restriction string, a subcorpus id or the
    /// deleted-subcorpus tombstone.
    ///
    /// A subcorpus without an id has nothing to refer back to and is stored
    /// as the tombstone.
    pub fn serialise(&self) -> String {
        match self {
            QueryScope::WholeCorpus => String::new(),
            QueryScope::Restriction(r) | QueryScope::Empty(r) => r.serialise().to_string(),
            QueryScope::Subcorpus(subcorpus) => subcorpus
                .id()
                .map_or_else(|| DELETED_SUBCORPUS.to_string(), |id| id.to_string()),
            QueryScope::DeletedSubcorpus => DELETED_SUBCORPUS.to_string(),
        }
    }

    pub fn url_serialise(&self) -> String {
        match self {
            QueryScope::WholeCorpus => UrlScope::WholeCorpus.serialise(),
            QueryScope::Restriction(r) | QueryScope::Empty(r) => r.url_serialise(),
            QueryScope::Subcorpus(subcorpus) => subcorpus
                .id()
                .map_or(UrlScope::DeletedSubcorpus, UrlScope::Subcorpus)
                .serialise(),
            QueryScope::DeletedSubcorpus => UrlScope::DeletedSubcorpus.serialise(),
        }
    }

    /// Id of the subcorpus this scope runs in.
    pub fn subcorpus_id(&self) -> Option<SubcorpusId> {
        match self {
            QueryScope::Subcorpus(subcorpus) => subcorpus.id(),
            _ => None,
        }
    }

    pub fn size(&self, ctx: &ScopeContext<'_>) -> Result<ScopeSize> {
        match self {
            QueryScope::WholeCorpus => Ok(ScopeSize::new(
                ctx.engine.corpus_text_count(ctx.corpus)?,
                ctx.engine.corpus_wordcount(ctx.corpus)?,
            )),
            QueryScope::Restriction(r) | QueryScope::Empty(r) => Ok(r.size()),
            QueryScope::Subcorpus(subcorpus) => Ok(subcorpus.size()),
            QueryScope::DeletedSubcorpus => Ok(ScopeSize::EMPTY),
        }
    }

    pub fn n_items(&self, ctx: &ScopeContext<'_>) -> Result<u64> {
        Ok(self.size(ctx)?.n_items)
    }

    pub fn n_tokens(&self, ctx: &ScopeContext<'_>) -> Result<u64> {
        Ok(self.size(ctx)?.n_tokens)
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            QueryScope::WholeCorpus => ItemType::Text,
            QueryScope::Restriction(r) | QueryScope::Empty(r) => r.item_type(),
            QueryScope::Subcorpus(subcorpus) => subcorpus.item_type(),
            QueryScope::DeletedSubcorpus => ItemType::Mixed,
        }
    }

    /// The corpus positions in scope.
    pub fn intervals(&self, ctx: &ScopeContext<'_>) -> Result<IntervalList> {
        match self {
            QueryScope::WholeCorpus => {
                let wordcount = ctx.engine.corpus_wordcount(ctx.corpus)?;
                if wordcount == 0 {
                    return Ok(IntervalList::new());
                }
                let last = u32::try_from(wordcount - 1).map_err(|_| {
                    Error::consistency(format!(
                        "{} has {wordcount} tokens, more than corpus positions allow",
                        ctx.corpus
                    ))
                })?;
                IntervalList::from_sorted(vec![Interval::new(0, last)])
            }
            QueryScope::Restriction(r) => r.intervals(ctx).cloned(),
            QueryScope::Empty(_) | QueryScope::DeletedSubcorpus => Ok(IntervalList::new()),
            QueryScope::Subcorpus(subcorpus) => subcorpus.intervals(ctx),
        }
    }

    pub fn item_list(&self, ctx: &ScopeContext<'_>) -> Result<ItemListOutcome> {
        match self {
            QueryScope::WholeCorpus => corpus_texts(ctx).map(ItemListOutcome::Items),
            QueryScope::Restriction(r) | QueryScope::Empty(r) => r.item_list(ctx),
            QueryScope::Subcorpus(subcorpus) => subcorpus.item_list(ctx),
            QueryScope::DeletedSubcorpus => Ok(ItemListOutcome::unsupported(
                "the subcorpus of this scope has been deleted",
            )),
        }
    }

    /// Loads the scope into the query engine, returning the name of the set
    /// to search within, or `None` when the search is unrestricted.
    ///
    /// The context's corpus is activated first in all cases. A deleted
    /// subcorpus cannot be activated.
    pub fn activate(&self, ctx: &ScopeContext<'_>) -> Result<Option<String>> {
        ctx.engine.execute(&cqp::activate_corpus(ctx.corpus))?;
        match self {
            QueryScope::WholeCorpus => return Ok(None),
            QueryScope::DeletedSubcorpus => {
                return Err(Error::invalid_operation(
                    "activate a scope whose subcorpus has been deleted",
                ));
            }
            QueryScope::Subcorpus(subcorpus) => {
                ctx.engine.undump(cqp::SCOPE_SET, &subcorpus.dumpfile(ctx)?)?;
            }
            QueryScope::Restriction(_) | QueryScope::Empty(_) => {
                load_scratch_dump(ctx, &self.intervals(ctx)?)?;
            }
        }
        debug!("activated {} in {} as {}", self.describe(), ctx.corpus, cqp::SCOPE_SET);
        Ok(Some(cqp::SCOPE_SET.to_string()))
    }

    /// One line for logs and listings.
    pub fn describe(&self) -> String {
        match self {
            QueryScope::WholeCorpus => "whole corpus".to_string(),
            QueryScope::Restriction(r) => r.describe(),
            QueryScope::Empty(r) => format!("empty scope ({})", r.describe()),
            QueryScope::Subcorpus(subcorpus) => match subcorpus.id() {
                Some(id) => format!("subcorpus {id}: {}", subcorpus.describe()),
                None => format!("unsaved subcorpus: {}", subcorpus.describe()),
            },
            QueryScope::DeletedSubcorpus => "deleted subcorpus".to_string(),
        }
    }
}

/// Undumps `intervals` as the scope set through a temporary dumpfile in the
/// cache directory. The file is removed once loaded.
fn load_scratch_dump(ctx: &ScopeContext<'_>, intervals: &IntervalList) -> Result<()> {
    let dir: &Path = &ctx.config.cache_directory;
    std::fs::create_dir_all(dir).map_err(|e| Error::io(format!("create {}", dir.display()), e))?;
    let mut file = tempfile::Builder::new()
        .prefix("scope_")
        .suffix(".dump")
        .tempfile_in(dir)
        .map_err(|e| Error::io(format!("create scratch dumpfile in {}", dir.display()), e))?;
    dump_format::write_dump(&mut file, intervals)?;
    ctx.engine.undump(cqp::SCOPE_SET, file.path())
}
