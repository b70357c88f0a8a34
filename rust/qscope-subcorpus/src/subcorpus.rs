use std::path::PathBuf;

use log::debug;
use qscope_backend::ScopeSize;
use qscope_common::{Result, ScopeConfig, error::Error};
use qscope_format::{Family, ItemList, ItemType, SubcorpusContent, SubcorpusId};
use qscope_ranges::{IntervalList, dump_format};
use qscope_restriction::{ItemListOutcome, Restriction, ScopeContext, items::locate_items};

/// A subcorpus, saved or not yet saved.
#[derive(Debug, Clone)]
pub struct Subcorpus {
    pub(crate) id: Option<SubcorpusId>,
    pub(crate) name: String,
    pub(crate) corpus: String,
    pub(crate) user: String,
    pub(crate) content: SubcorpusContent,
    pub(crate) size: ScopeSize,
    /// Intervals of arbitrary content not yet written to the dumpfile.
    pub(crate) staged: Option<IntervalList>,
}

impl Subcorpus {
    pub(crate) fn unsaved(
        ctx: &ScopeContext<'_>,
        name: &str,
        content: SubcorpusContent,
        size: ScopeSize,
    ) -> Result<Subcorpus> {
        qscope_format::handle::verify_handle("subcorpus name", name)?;
        Ok(Subcorpus {
            id: None,
            name: name.to_string(),
            corpus: ctx.corpus.to_string(),
            user: ctx.user.to_string(),
            content,
            size,
            staged: None,
        })
    }

    pub fn id(&self) -> Option<SubcorpusId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn corpus(&self) -> &str {
        &self.corpus
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn content(&self) -> &SubcorpusContent {
        &self.content
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

    pub fn item_type(&self) -> ItemType {
        match &self.content {
            SubcorpusContent::List(list) => match Family::from_name(list.family()) {
                Ok(Family::Element(element)) => ItemType::Element(element),
                _ => ItemType::Text,
            },
            SubcorpusContent::Restriction(spec) => spec.item_type(),
            SubcorpusContent::Arbitrary => ItemType::Mixed,
        }
    }

    /// Where the dumpfile of subcorpus `id` lives.
    pub fn dumpfile_path(config: &ScopeConfig, id: SubcorpusId) -> PathBuf {
        config.cache_directory.join(format!("subcorpus_{id}.dump"))
    }

    /// The member intervals.
    pub fn intervals(&self, ctx: &ScopeContext<'_>) -> Result<IntervalList> {
        match &self.content {
            SubcorpusContent::List(list) => Ok(locate_items(ctx, list)?.1),
            SubcorpusContent::Restriction(spec) => {
                let restriction = Restriction::resolve(ctx, spec.clone())?;
                Ok(restriction.intervals(ctx)?.clone())
            }
            SubcorpusContent::Arbitrary => {
                if let Some(staged) = &self.staged {
                    return Ok(staged.clone());
                }
                let path = self.saved_dumpfile_path(ctx)?;
                if !path.is_file() {
                    return Err(self.missing_dumpfile());
                }
                dump_format::read_dump_file(&path)
            }
        }
    }

    /// Path of the dumpfile, written first if it does not exist yet.
    pub fn dumpfile(&self, ctx: &ScopeContext<'_>) -> Result<PathBuf> {
        let path = self.saved_dumpfile_path(ctx)?;
        if path.is_file() {
            return Ok(path);
        }
        if matches!(self.content, SubcorpusContent::Arbitrary) && self.staged.is_none() {
            return Err(self.missing_dumpfile());
        }
        std::fs::create_dir_all(&ctx.config.cache_directory).map_err(|e| {
            Error::io(format!("create {}", ctx.config.cache_directory.display()), e)
        })?;
        dump_format::write_dump_file(&path, &self.intervals(ctx)?)?;
        debug!("wrote dumpfile {}", path.display());
        Ok(path)
    }

    pub fn item_list(&self, ctx: &ScopeContext<'_>) -> Result<ItemListOutcome> {
        match &self.content {
            SubcorpusContent::List(list) => Ok(ItemListOutcome::Items(list.clone())),
            SubcorpusContent::Restriction(spec) => {
                Restriction::resolve(ctx, spec.clone())?.item_list(ctx)
            }
            SubcorpusContent::Arbitrary => Ok(ItemListOutcome::unsupported(format!(
                "subcorpus {} holds arbitrary intervals",
                self.name
            ))),
        }
    }

    /// The list content, if the subcorpus is in list mode.
    pub fn list(&self) -> Option<&ItemList> {
        match &self.content {
            SubcorpusContent::List(list) => Some(list),
            _ => None,
        }
    }

    /// One line for logs and listings.
    pub fn describe(&self) -> String {
        let mode = match &self.content {
            SubcorpusContent::List(list) => format!("{} list", list.family()),
            SubcorpusContent::Restriction(spec) => format!("restriction {spec}"),
            SubcorpusContent::Arbitrary => "arbitrary intervals".to_string(),
        };
        format!(
            "{} ({mode}): {} items, {} tokens",
            self.name, self.size.n_items, self.size.n_tokens
        )
    }

    pub(crate) fn saved_dumpfile_path(&self, ctx: &ScopeContext<'_>) -> Result<PathBuf> {
        let id = self.id.ok_or_else(|| {
            Error::invalid_operation(format!("dumpfile of unsaved subcorpus {}", self.name))
        })?;
        Ok(Self::dumpfile_path(ctx.config, id))
    }

    fn missing_dumpfile(&self) -> Error {
        Error::consistency(format!(
            "dumpfile of arbitrary subcorpus {} ({:?}) is missing",
            self.name, self.id
        ))
    }
}
