//! Conversions between whole items of one family and their intervals.

use std::collections::BTreeSet;

use ahash::AHashSet;
use log::warn;
use qscope_common::Result;
use qscope_format::{Family, ItemList, handle::is_handle};
use qscope_ranges::IntervalList;

use crate::{ScopeContext, materialize::collect_regions};

/// The result of asking a scope for its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemListOutcome {
    Items(ItemList),
    /// The scope is not made of whole items of one family.
    Unsupported { reason: String },
}

impl ItemListOutcome {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        ItemListOutcome::Unsupported {
            reason: reason.into(),
        }
    }

    pub fn items(self) -> Option<ItemList> {
        match self {
            ItemListOutcome::Items(list) => Some(list),
            ItemListOutcome::Unsupported { .. } => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ItemListOutcome::Unsupported { .. })
    }
}

/// Every text of the context's corpus.
pub fn corpus_texts(ctx: &ScopeContext<'_>) -> Result<ItemList> {
    text_list(ctx.metadata.text_ids(ctx.corpus, &[])?)
}

/// A text list from stored ids. Ids that are not handles cannot be listed and
/// are skipped.
pub(crate) fn text_list(ids: Vec<String>) -> Result<ItemList> {
    let (usable, unusable): (Vec<_>, Vec<_>) = ids.into_iter().partition(|id| is_handle(id));
    if !unusable.is_empty() {
        warn!("skipping {} unusable text ids", unusable.len());
    }
    ItemList::identified(Family::TEXT_ELEMENT, "id", usable, usize::MAX)
}

/// The items of `family` whose regions are exactly intervals of `intervals`.
///
/// Items are named by the family's id attribute when it has one, by sequence
/// position otherwise.
pub fn region_items(
    ctx: &ScopeContext<'_>,
    family: &Family,
    intervals: &IntervalList,
) -> Result<ItemList> {
    let element = family.element_name();
    let is_member = |begin: u32, end: u32| {
        intervals
            .search_position(begin)
            .map(|idx| intervals.as_slice()[idx])
            .is_some_and(|i| i.begin == begin && i.end == end)
    };

    match ctx.metadata.xml_id_field(ctx.corpus, element)? {
        Some(id_field) => {
            let mut ids = BTreeSet::new();
            for region in ctx
                .engine
                .open_attribute_stream(ctx.corpus, &family.attribute_handle(&id_field))?
            {
                let region = region?;
                if !is_member(region.begin, region.end) {
                    continue;
                }
                match region.value {
                    Some(id) if is_handle(&id) => {
                        ids.insert(id);
                    }
                    other => warn!("skipping unusable {element} id {other:?} in {}", ctx.corpus),
                }
            }
            ItemList::identified(element, &id_field, ids, usize::MAX)
        }
        None => {
            let mut positions = Vec::new();
            let stream = ctx.engine.open_attribute_stream(ctx.corpus, element)?;
            for (position, region) in stream.enumerate() {
                let region = region?;
                if is_member(region.begin, region.end) {
                    positions.push(position as u32);
                }
            }
            ItemList::positional(element, positions)
        }
    }
}

/// Looks up the regions of the items in `list`.
///
/// Returns the list reduced to the items the corpus actually has, and their
/// intervals. Missing items are dropped with a warning.
pub fn locate_items(ctx: &ScopeContext<'_>, list: &ItemList) -> Result<(ItemList, IntervalList)> {
    let family = Family::from_name(list.family())?;
    let mut found = AHashSet::new();
    let intervals = match list.id_attribute() {
        Some(id_attribute) => {
            collect_regions(ctx, &family.attribute_handle(id_attribute), |region| {
                match region.value.as_deref() {
                    Some(id) if list.contains(id) => {
                        found.insert(id.to_string());
                        true
                    }
                    _ => false,
                }
            })?
        }
        None => {
            let mut position = 0u32;
            collect_regions(ctx, family.element_name(), |_| {
                let keep = list.contains(&position.to_string());
                if keep {
                    found.insert(position.to_string());
                }
                position += 1;
                keep
            })?
        }
    };

    let missing: Vec<String> = list
        .items()
        .into_iter()
        .filter(|item| !found.contains(item))
        .collect();
    if missing.is_empty() {
        return Ok((list.clone(), intervals));
    }
    warn!(
        "dropping {} {} items not found in {}: {}",
        missing.len(),
        list.family(),
        ctx.corpus,
        missing.join(" ")
    );
    Ok((list.with_removed(&missing), intervals))
}
