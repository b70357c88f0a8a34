//! Interval materialization of planned condition sets.

use ahash::AHashSet;
use log::debug;
use qscope_backend::{AttributeRegion, cqp};
use qscope_common::Result;
use qscope_format::Family;
use qscope_ranges::{Interval, IntervalList, intersect_all};

use crate::{
    ScopeContext,
    plan::{Accept, SetPlan},
};

/// Intervals satisfying every plan. Plans after the first empty intermediate
/// result are not evaluated.
pub(crate) fn materialize(ctx: &ScopeContext<'_>, plans: &[SetPlan]) -> Result<IntervalList> {
    itertools::process_results(plans.iter().map(|plan| set_intervals(ctx, plan)), |lists| {
        intersect_all(lists)
    })
}

pub(crate) fn set_intervals(ctx: &ScopeContext<'_>, plan: &SetPlan) -> Result<IntervalList> {
    match plan {
        SetPlan::Texts { filters } if filters.is_empty() => {
            collect_regions(ctx, Family::TEXT_ELEMENT, |_| true)
        }
        SetPlan::Texts { filters } => {
            let ids: AHashSet<String> = ctx
                .metadata
                .text_ids(ctx.corpus, filters)?
                .into_iter()
                .collect();
            collect_regions(ctx, &Family::Text.attribute_handle("id"), |r| {
                has_value_in(r, &ids)
            })
        }
        SetPlan::Within { element } => collect_regions(ctx, element, |_| true),
        SetPlan::Values { handle, values, .. } => collect_regions(ctx, handle, |r| {
            r.value.as_ref().is_some_and(|v| values.contains(v))
        }),
        SetPlan::Linked {
            handle, filters, ..
        } => {
            let ids: AHashSet<String> = ctx
                .metadata
                .idlink_ids(ctx.corpus, handle, filters)?
                .into_iter()
                .collect();
            collect_regions(ctx, handle, |r| has_value_in(r, &ids))
        }
        SetPlan::Tabulated { element, tests } => tabulated(ctx, element, tests),
    }
}

fn has_value_in(region: &AttributeRegion, set: &AHashSet<String>) -> bool {
    region.value.as_ref().is_some_and(|v| set.contains(v))
}

/// Streams `attribute` and keeps the regions `keep` accepts.
pub(crate) fn collect_regions<F>(
    ctx: &ScopeContext<'_>,
    attribute: &str,
    mut keep: F,
) -> Result<IntervalList>
where
    F: FnMut(&AttributeRegion) -> bool,
{
    let mut intervals = Vec::new();
    for region in ctx.engine.open_attribute_stream(ctx.corpus, attribute)? {
        let region = region?;
        if keep(&region) {
            intervals.push(region.interval());
        }
    }
    IntervalList::from_sorted(intervals)
}

/// Defines the element's regions as a set in the engine and tabulates it in
/// batches, testing each region's attribute values.
fn tabulated(
    ctx: &ScopeContext<'_>,
    element: &str,
    tests: &[crate::plan::RegionTest],
) -> Result<IntervalList> {
    let mut accepted = Vec::with_capacity(tests.len());
    for test in tests {
        let set: AHashSet<String> = match &test.accept {
            Accept::Values(values) => values.iter().cloned().collect(),
            Accept::LinkedRows(filters) => ctx
                .metadata
                .idlink_ids(ctx.corpus, &test.handle, filters)?
                .into_iter()
                .collect(),
        };
        if set.is_empty() {
            return Ok(IntervalList::new());
        }
        accepted.push(set);
    }
    let attributes: Vec<String> = tests.iter().map(|t| t.handle.clone()).collect();

    let engine = ctx.engine;
    engine.execute(&cqp::activate_corpus(ctx.corpus))?;
    engine.execute(&cqp::define_regions(cqp::SCRATCH_SET, element))?;
    let mut intervals = Vec::new();
    let tabulated = cqp::tabulate_in_batches(
        engine,
        cqp::SCRATCH_SET,
        &attributes,
        ctx.config.tabulate_batch_size,
        |row| {
            if row.values.iter().zip(&accepted).all(|(v, set)| set.contains(v)) {
                intervals.push(Interval::new(row.begin, row.end));
            }
            Ok(())
        },
    );
    let discarded = engine.execute(&cqp::discard(cqp::SCRATCH_SET));
    let total = tabulated?;
    discarded?;
    debug!(
        "tabulated {total} {element} regions of {}, {} kept",
        ctx.corpus,
        intervals.len()
    );
    IntervalList::from_sorted(intervals)
}
