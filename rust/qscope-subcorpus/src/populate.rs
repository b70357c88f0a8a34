//! Ways of creating a subcorpus. Each returns an unsaved subcorpus.

use std::path::Path;

use ahash::AHashSet;
use log::{debug, warn};
use qscope_backend::{ScopeSize, cqp};
use qscope_common::{Result, error::Error};
use qscope_format::{Family, ItemList, SubcorpusContent};
use qscope_ranges::dump_format;
use qscope_restriction::{Restriction, ScopeContext, items::locate_items};

use crate::Subcorpus;

impl Subcorpus {
    /// From explicit items of `family`: ids of `id_attribute`, or sequence
    /// positions when `id_attribute` is empty.
    ///
    /// Items are validated, sorted and deduplicated. Items the corpus does not
    /// have are dropped.
    pub fn populate_from_list<I, S>(
        ctx: &ScopeContext<'_>,
        name: &str,
        family: &str,
        id_attribute: &str,
        items: I,
    ) -> Result<Subcorpus>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let family = Family::from_name(family)?;
        let list = ItemList::from_strings(
            family.element_name(),
            id_attribute,
            items,
            ctx.config.max_item_id_length,
        )?;
        let (list, size) = measure_list(ctx, &list)?;
        Self::unsaved(ctx, name, SubcorpusContent::List(list), size)
    }

    /// From the `family` items containing a match of the named query result
    /// `query_set`.
    pub fn populate_from_query(
        ctx: &ScopeContext<'_>,
        name: &str,
        query_set: &str,
        family: &str,
    ) -> Result<Subcorpus> {
        let family = Family::from_name(family)?;
        let element = family.element_name();
        let Some(id_field) = ctx.metadata.xml_id_field(ctx.corpus, element)? else {
            return Err(Error::unsupported(
                "subcorpus from query",
                format!("{element} regions have no id attribute"),
            ));
        };
        ctx.engine.execute(&cqp::activate_corpus(ctx.corpus))?;
        let rows = ctx
            .engine
            .execute(&cqp::group(query_set, &family.attribute_handle(&id_field)))?;
        let ids = rows
            .iter()
            .map(|row| cqp::parse_group_line(row).map(|(id, _)| id))
            .collect::<Result<Vec<_>>>()?;
        debug!("query {query_set} hits {} {element} items", ids.len());
        Self::populate_from_list(ctx, name, element, &id_field, ids)
    }

    /// From every text not in `source`. Only text-based subcorpora can be
    /// inverted.
    pub fn populate_from_inverting(
        ctx: &ScopeContext<'_>,
        name: &str,
        source: &Subcorpus,
    ) -> Result<Subcorpus> {
        let downgraded = source.downgraded(ctx)?;
        let excluded = match downgraded.list() {
            Some(list)
                if list.family() == Family::TEXT_ELEMENT && list.id_attribute().is_some() =>
            {
                list
            }
            _ => {
                return Err(Error::unsupported(
                    "subcorpus inversion",
                    format!("{} is not made of whole texts", source.name()),
                ));
            }
        };
        let remaining = ctx
            .metadata
            .text_ids(ctx.corpus, &[])?
            .into_iter()
            .filter(|id| !excluded.contains(id));
        Self::populate_from_list(ctx, name, Family::TEXT_ELEMENT, "id", remaining)
    }

    /// Wraps a resolved restriction.
    pub fn populate_from_restriction(
        ctx: &ScopeContext<'_>,
        name: &str,
        restriction: &Restriction,
    ) -> Result<Subcorpus> {
        Self::unsaved(
            ctx,
            name,
            SubcorpusContent::Restriction(restriction.spec().clone()),
            restriction.size(),
        )
    }

    /// From an uploaded two-column interval file. The intervals are kept as
    /// given and written to the dumpfile on save.
    pub fn populate_from_dump_file(
        ctx: &ScopeContext<'_>,
        name: &str,
        path: &Path,
    ) -> Result<Subcorpus> {
        let intervals = dump_format::read_dump_file(path)?;
        let wordcount = ctx.engine.corpus_wordcount(ctx.corpus)?;
        if let Some(last) = intervals.as_slice().last() {
            if u64::from(last.end) >= wordcount {
                return Err(Error::invalid_arg(
                    "intervals",
                    format!("{last} lies beyond the {wordcount} tokens of {}", ctx.corpus),
                ));
            }
        }
        let size = ScopeSize::new(intervals.len() as u64, intervals.n_tokens());
        let mut subcorpus = Self::unsaved(ctx, name, SubcorpusContent::Arbitrary, size)?;
        subcorpus.staged = Some(intervals);
        Ok(subcorpus)
    }
}

/// Reduces `list` to the items the corpus has and measures them.
pub(crate) fn measure_list(
    ctx: &ScopeContext<'_>,
    list: &ItemList,
) -> Result<(ItemList, ScopeSize)> {
    if list.family() == Family::TEXT_ELEMENT && list.id_attribute() == Some("id") {
        let known: AHashSet<String> = ctx
            .metadata
            .text_ids(ctx.corpus, &[])?
            .into_iter()
            .collect();
        let missing: Vec<String> = list
            .items()
            .into_iter()
            .filter(|id| !known.contains(id))
            .collect();
        let list = if missing.is_empty() {
            list.clone()
        } else {
            warn!(
                "dropping {} texts not found in {}: {}",
                missing.len(),
                ctx.corpus,
                missing.join(" ")
            );
            list.with_removed(&missing)
        };
        let size = ctx.metadata.text_size_for_ids(ctx.corpus, &list.items())?;
        return Ok((list, size));
    }
    let (list, intervals) = locate_items(ctx, list)?;
    let size = ScopeSize::new(list.len() as u64, intervals.n_tokens());
    Ok((list, size))
}
