//! Editing the items of a subcorpus.

use log::info;
use qscope_common::{Result, error::Error};
use qscope_format::{ItemList, SubcorpusContent};
use qscope_restriction::{ItemListOutcome, Restriction, ScopeContext};

use crate::{Subcorpus, populate::measure_list};

impl Subcorpus {
    /// The subcorpus with restriction content converted to a list when the
    /// restriction selects whole items of one family, or to arbitrary
    /// intervals otherwise. Other modes are returned unchanged.
    ///
    /// Nothing is saved; the result keeps this subcorpus's id.
    pub fn downgraded(&self, ctx: &ScopeContext<'_>) -> Result<Subcorpus> {
        let SubcorpusContent::Restriction(spec) = &self.content else {
            return Ok(self.clone());
        };
        let restriction = Restriction::resolve(ctx, spec.clone())?;
        let mut downgraded = self.clone();
        match restriction.item_list(ctx)? {
            ItemListOutcome::Items(list) => {
                downgraded.content = SubcorpusContent::List(list);
            }
            ItemListOutcome::Unsupported { .. } => {
                downgraded.content = SubcorpusContent::Arbitrary;
                downgraded.staged = Some(restriction.intervals(ctx)?.clone());
            }
        }
        downgraded.size = restriction.size();
        info!(
            "subcorpus '{}' downgraded from {} to {}",
            self.name,
            spec,
            downgraded.content.serialise()
        );
        Ok(downgraded)
    }

    /// Adds items (validated like on creation), then saves.
    pub fn add_items<I, S>(&mut self, ctx: &ScopeContext<'_>, items: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let max_len = ctx.config.max_item_id_length;
        self.edit_list(ctx, "add items", |list| list.with_added(items, max_len))
    }

    /// Removes items, then saves. Items not in the subcorpus are ignored.
    pub fn remove_items<I, S>(&mut self, ctx: &ScopeContext<'_>, items: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.edit_list(ctx, "remove items", |list| Ok(list.with_removed(items)))
    }

    fn edit_list<F>(&mut self, ctx: &ScopeContext<'_>, operation: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&ItemList) -> Result<ItemList>,
    {
        let mut next = self.downgraded(ctx)?;
        let Some(list) = next.list() else {
            return Err(Error::unsupported(
                operation,
                format!("subcorpus '{}' is not made of whole items", self.name),
            ));
        };
        let (list, size) = measure_list(ctx, &edit(list)?)?;
        next.content = SubcorpusContent::List(list);
        next.size = size;
        next.staged = None;
        next.invalidate(ctx)?;
        next.save(ctx)?;
        *self = next;
        Ok(())
    }
}
