use std::cell::OnceCell;

use itertools::Itertools;
use log::{debug, warn};
use qscope_backend::{FieldKind, ScopeSize};
use qscope_common::{Result, error::Error, verify_arg};
use qscope_format::{ConditionSet, ItemType, RestrictionSpec, UrlScope};
use qscope_ranges::IntervalList;

use crate::{
    ItemListOutcome, ScopeContext,
    items::{region_items, text_list},
    materialize::materialize,
    plan::{SetPlan, plan},
};

/// How a restriction's size was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One aggregate over the per-text metadata.
    TextAggregate,
    /// Sum of the precomputed sizes of classification categories.
    CategorySum,
    /// Aggregate of precomputed per-row sizes of a linked table.
    IdLinkAggregate,
    /// Counting the materialized intervals.
    Materialize,
}

/// A resolved restriction of one corpus.
///
/// Sizes are known from construction on. Intervals are computed on first use
/// unless resolution (or the cache) already produced them.
#[derive(Debug, Clone)]
pub struct Restriction {
    corpus: String,
    spec: RestrictionSpec,
    serialisation: String,
    plans: Vec<SetPlan>,
    strategy: Strategy,
    size: ScopeSize,
    intervals: OnceCell<IntervalList>,
    from_cache: bool,
}

impl Restriction {
    /// Resolves `spec` in the context's corpus.
    ///
    /// Fails with a parse error when a condition names a field the corpus
    /// does not have, or one that cannot be restricted on.
    pub fn resolve(ctx: &ScopeContext<'_>, spec: RestrictionSpec) -> Result<Restriction> {
        if spec.is_empty() {
            return Err(Error::invalid_arg(
                "spec",
                "a restriction needs at least one condition set",
            ));
        }
        let plans = plan(ctx, &spec)?;
        let strategy = choose_strategy(&plans);
        let mut restriction = Restriction {
            corpus: ctx.corpus.to_string(),
            serialisation: spec.serialise(),
            spec,
            plans,
            strategy,
            size: ScopeSize::EMPTY,
            intervals: OnceCell::new(),
            from_cache: false,
        };

        let cache = ctx.cache();
        if restriction.must_cache() {
            match cache.get(ctx.corpus, &restriction.serialisation) {
                Ok(Some(hit)) => {
                    restriction.size = hit.size;
                    restriction.intervals = OnceCell::from(hit.intervals);
                    restriction.from_cache = true;
                    return Ok(restriction);
                }
                Ok(None) => {}
                Err(e) if e.is_storage_failure() => {
                    warn!("restriction cache unreadable, recomputing: {e}");
                    if let Err(e) = cache.remove(ctx.corpus, &restriction.serialisation) {
                        if !e.is_storage_failure() {
                            return Err(e);
                        }
                        warn!("unreadable cache entry not removed: {e}");
                    }
                }
                Err(e) => return Err(e),
            }
        }

        if strategy == Strategy::Materialize {
            let intervals = materialize(ctx, &restriction.plans)?;
            restriction.size = ScopeSize::new(intervals.len() as u64, intervals.n_tokens());
            restriction.intervals = OnceCell::from(intervals);
        } else {
            restriction.size = aggregate(ctx, &restriction.plans[0])?;
        }
        debug!(
            "resolved {} in {} by {strategy:?}: {} items, {} tokens",
            restriction.serialisation,
            restriction.corpus,
            restriction.size.n_items,
            restriction.size.n_tokens
        );

        if restriction.must_cache() {
            let intervals = restriction.intervals(ctx)?;
            match cache.put(ctx.corpus, &restriction.serialisation, restriction.size, intervals) {
                Ok(_) => {}
                Err(e) if e.is_storage_failure() => warn!("restriction not cached: {e}"),
                Err(e) => return Err(e),
            }
        }
        Ok(restriction)
    }

    /// Resolves `spec`, treating an empty spec or an unusable condition as no
    /// restriction at all.
    pub fn from_spec(ctx: &ScopeContext<'_>, spec: RestrictionSpec) -> Result<Option<Restriction>> {
        if spec.is_empty() {
            return Ok(None);
        }
        match Self::resolve(ctx, spec) {
            Ok(restriction) => Ok(Some(restriction)),
            Err(e) if e.is_parse_failure() => {
                debug!("ignoring restriction: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Parses and resolves a serialized restriction. A malformed string is no
    /// restriction.
    pub fn from_serialisation(ctx: &ScopeContext<'_>, s: &str) -> Result<Option<Restriction>> {
        match RestrictionSpec::parse(s) {
            Ok(spec) => Self::from_spec(ctx, spec),
            Err(e) if e.is_parse_failure() => {
                debug!("ignoring restriction string {s:?}: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Builds a restriction from the scope items of a URL query string.
    /// Fragments selecting no restriction (whole corpus, subcorpora,
    /// malformed items) give `None`.
    pub fn from_url(ctx: &ScopeContext<'_>, query: &str) -> Result<Option<Restriction>> {
        match UrlScope::parse(query) {
            Ok(UrlScope::Restriction(spec)) => Self::from_spec(ctx, spec),
            Ok(_) => Ok(None),
            Err(e) if e.is_parse_failure() => {
                debug!("ignoring url scope {query:?}: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn corpus(&self) -> &str {
        &self.corpus
    }

    pub fn spec(&self) -> &RestrictionSpec {
        &self.spec
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn size(&self) -> ScopeSize {
        self.size
    }

    pub fn n_items(&self) -> u64 {
        self.size.n_items
    }

    pub fn n_tokens(&self) -> u64 {
        self.size.n_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    pub fn item_type(&self) -> ItemType {
        self.spec.item_type()
    }

    /// Materialized restrictions and all multi-family ones go to the cache.
    pub fn must_cache(&self) -> bool {
        self.strategy == Strategy::Materialize || self.plans.len() >= 2
    }

    /// True when sizes and intervals came from the restriction cache.
    pub fn was_cached(&self) -> bool {
        self.from_cache
    }

    /// Canonical serialization, also the cache key.
    pub fn serialise(&self) -> &str {
        &self.serialisation
    }

    pub fn url_serialise(&self) -> String {
        UrlScope::Restriction(self.spec.clone()).serialise()
    }

    /// The restriction's intervals, materialized on first call.
    pub fn intervals(&self, ctx: &ScopeContext<'_>) -> Result<&IntervalList> {
        if let Some(intervals) = self.intervals.get() {
            return Ok(intervals);
        }
        verify_arg!(ctx, ctx.corpus == self.corpus);
        let intervals = materialize(ctx, &self.plans)?;
        if intervals.n_tokens() != self.size.n_tokens {
            warn!(
                "{} in {}: metadata counts {} tokens, index has {}",
                self.serialisation,
                self.corpus,
                self.size.n_tokens,
                intervals.n_tokens()
            );
        }
        Ok(self.intervals.get_or_init(|| intervals))
    }

    /// The whole items selected, for single-family restrictions.
    pub fn item_list(&self, ctx: &ScopeContext<'_>) -> Result<ItemListOutcome> {
        let Some(family) = self.spec.single_family() else {
            return Ok(ItemListOutcome::unsupported(format!(
                "{} constrains several attribute families",
                self.serialisation
            )));
        };
        if let [SetPlan::Texts { filters }] = &self.plans[..] {
            verify_arg!(ctx, ctx.corpus == self.corpus);
            let ids = ctx.metadata.text_ids(ctx.corpus, filters)?;
            return text_list(ids).map(ItemListOutcome::Items);
        }
        let intervals = self.intervals(ctx)?;
        region_items(ctx, family, intervals).map(ItemListOutcome::Items)
    }

    /// One line for logs and listings, e.g.
    /// `u where mode is radio or tv: 4 items, 20 tokens`.
    pub fn describe(&self) -> String {
        format!(
            "{}: {} items, {} tokens",
            self.spec.sets().map(describe_set).join("; "),
            self.size.n_items,
            self.size.n_tokens
        )
    }
}

fn choose_strategy(plans: &[SetPlan]) -> Strategy {
    match plans {
        [SetPlan::Texts { .. }] => Strategy::TextAggregate,
        [
            SetPlan::Values {
                kind: FieldKind::Classification,
                ..
            },
        ] => Strategy::CategorySum,
        [SetPlan::Linked { .. }] => Strategy::IdLinkAggregate,
        _ => Strategy::Materialize,
    }
}

fn aggregate(ctx: &ScopeContext<'_>, plan: &SetPlan) -> Result<ScopeSize> {
    match plan {
        SetPlan::Texts { filters } => ctx.metadata.text_aggregate(ctx.corpus, filters),
        SetPlan::Values { handle, values, .. } => values
            .iter()
            .map(|value| ctx.metadata.category_size(ctx.corpus, handle, value))
            .sum(),
        SetPlan::Linked {
            handle, filters, ..
        } => ctx.metadata.idlink_aggregate(ctx.corpus, handle, filters),
        SetPlan::Within { .. } | SetPlan::Tabulated { .. } => Err(Error::consistency(format!(
            "no aggregate for {} plans",
            plan.element()
        ))),
    }
}

fn describe_set(set: &ConditionSet) -> String {
    let element = set.family().element_name();
    if set.is_within_only() {
        return format!("within {element}");
    }
    let tests = set
        .grouped()
        .into_iter()
        .map(|(key, values)| {
            let field = match key.linked_subfield {
                Some(sub) => format!("{}/{sub}", key.field),
                None => key.field,
            };
            format!("{field} is {}", values.iter().join(" or "))
        })
        .join(" and ");
    format!("{element} where {tests}")
}
