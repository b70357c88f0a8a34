//! Small synthetic corpora.
//!
//! A [`FixtureCorpus`] describes texts, XML regions and linked tables once and
//! derives both the token index served by [`MemoryEngine`] and the metadata
//! tables read by `SqliteMetadataStore`, so the two always agree.

use std::collections::{BTreeMap, BTreeSet};

use qscope_backend::{AttributeRegion, FieldKind, SqliteMetadataStore};
use qscope_db::Database;
use rusqlite::params_from_iter;

use crate::engine::{CorpusIndex, MemoryEngine};

#[derive(Debug, Clone)]
struct FixtureRegion {
    begin: u32,
    end: u32,
    fields: BTreeMap<String, String>,
}

impl FixtureRegion {
    fn new(begin: u32, end: u32, fields: &[(&str, &str)]) -> Self {
        assert!(begin <= end, "reversed region [{begin}, {end}]");
        FixtureRegion {
            begin,
            end,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn tokens(&self) -> u64 {
        (self.end - self.begin) as u64 + 1
    }
}

#[derive(Debug, Clone)]
pub struct FixtureCorpus {
    name: String,
    wordcount: u64,
    /// Text id to its region; the id is stored under the `id` field.
    texts: Vec<FixtureRegion>,
    text_fields: BTreeMap<String, FieldKind>,
    regions: BTreeMap<String, Vec<FixtureRegion>>,
    /// Attribute handle to (family, kind).
    xml_fields: BTreeMap<String, (String, FieldKind)>,
    /// Attribute handle to rows of its linked table: id and column values.
    links: BTreeMap<String, Vec<(String, BTreeMap<String, String>)>>,
}

impl FixtureCorpus {
    pub fn new(name: &str, wordcount: u64) -> Self {
        FixtureCorpus {
            name: name.to_string(),
            wordcount,
            texts: Vec::new(),
            text_fields: BTreeMap::new(),
            regions: BTreeMap::new(),
            xml_fields: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a text. Fields not declared with [`FixtureCorpus::text_field`]
    /// are classifications.
    pub fn text(mut self, id: &str, begin: u32, end: u32, fields: &[(&str, &str)]) -> Self {
        let mut region = FixtureRegion::new(begin, end, fields);
        for field in region.fields.keys() {
            self.text_fields
                .entry(field.clone())
                .or_insert(FieldKind::Classification);
        }
        region.fields.insert("id".to_string(), id.to_string());
        self.texts.push(region);
        self
    }

    pub fn text_field(mut self, field: &str, kind: FieldKind) -> Self {
        self.text_fields.insert(field.to_string(), kind);
        self
    }

    /// Adds a region of `element`. Fields not declared with
    /// [`FixtureCorpus::xml_field`] are classifications.
    pub fn region(mut self, element: &str, begin: u32, end: u32, fields: &[(&str, &str)]) -> Self {
        let region = FixtureRegion::new(begin, end, fields);
        for field in region.fields.keys() {
            self.xml_fields
                .entry(format!("{element}_{field}"))
                .or_insert((element.to_string(), FieldKind::Classification));
        }
        self.regions.entry(element.to_string()).or_default().push(region);
        self
    }

    pub fn xml_field(mut self, element: &str, field: &str, kind: FieldKind) -> Self {
        self.xml_fields
            .insert(format!("{element}_{field}"), (element.to_string(), kind));
        self
    }

    /// Adds a row to the table linked through `element_field`, making that
    /// attribute an id link.
    pub fn link_row(mut self, element: &str, field: &str, id: &str, columns: &[(&str, &str)]) -> Self {
        let handle = format!("{element}_{field}");
        self.xml_fields
            .insert(handle.clone(), (element.to_string(), FieldKind::IdLink));
        self.links.entry(handle).or_default().push((
            id.to_string(),
            columns
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        self
    }

    /// The token index: one attribute for each element, one per field.
    pub fn index(&self) -> CorpusIndex {
        let mut attributes: BTreeMap<String, Vec<AttributeRegion>> = BTreeMap::new();
        let families = std::iter::once(("text", &self.texts))
            .chain(self.regions.iter().map(|(el, regions)| (el.as_str(), regions)));
        for (element, regions) in families {
            let mut sorted = regions.clone();
            sorted.sort_by_key(|r| r.begin);
            for region in &sorted {
                attributes
                    .entry(element.to_string())
                    .or_default()
                    .push(AttributeRegion {
                        begin: region.begin,
                        end: region.end,
                        value: None,
                    });
                for (field, value) in &region.fields {
                    attributes
                        .entry(format!("{element}_{field}"))
                        .or_default()
                        .push(AttributeRegion {
                            begin: region.begin,
                            end: region.end,
                            value: Some(value.clone()),
                        });
                }
            }
        }
        CorpusIndex {
            wordcount: self.wordcount,
            attributes,
        }
    }

    /// Registers the corpus with `engine` and writes its metadata tables.
    pub fn install(&self, engine: &MemoryEngine, db: &Database) -> anyhow::Result<()> {
        engine.add_corpus(&self.name, self.index());
        SqliteMetadataStore::install_schema(db)?;
        self.install_texts(db)?;
        self.install_xml(db)?;
        self.install_links(db)?;
        Ok(())
    }

    fn install_texts(&self, db: &Database) -> anyhow::Result<()> {
        let conn = db.connection();
        let table = SqliteMetadataStore::text_table(&self.name)?;
        let fields: Vec<&String> = self.text_fields.keys().collect();
        let columns: String = fields.iter().map(|f| format!(", {f} TEXT")).collect();
        conn.execute_batch(&format!(
            "CREATE TABLE {table} (text_id TEXT PRIMARY KEY, words INTEGER NOT NULL{columns});"
        ))?;

        let names: String = fields.iter().map(|f| format!(", {f}")).collect();
        let marks: String = fields.iter().map(|_| ", ?").collect();
        let sql = format!("INSERT INTO {table} (text_id, words{names}) VALUES (?, ?{marks})");
        for text in &self.texts {
            let mut values = vec![
                text.fields.get("id").cloned().unwrap_or_default(),
                text.tokens().to_string(),
            ];
            values.extend(fields.iter().map(|f| text.fields.get(*f).cloned().unwrap_or_default()));
            conn.execute(&sql, params_from_iter(values))?;
        }
        for (field, kind) in &self.text_fields {
            conn.execute(
                "INSERT INTO text_metadata_fields (corpus, handle, datatype) VALUES (?1, ?2, ?3)",
                (&self.name, field, kind.as_str()),
            )?;
        }
        Ok(())
    }

    fn install_xml(&self, db: &Database) -> anyhow::Result<()> {
        let conn = db.connection();
        for (handle, (family, kind)) in &self.xml_fields {
            conn.execute(
                "INSERT INTO xml_metadata (corpus, handle, att_family, datatype) \
                 VALUES (?1, ?2, ?3, ?4)",
                (&self.name, handle, family, kind.as_str()),
            )?;
            if *kind != FieldKind::Classification {
                continue;
            }
            let field = &handle[family.len() + 1..];
            let mut categories: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
            for region in self.regions.get(family).into_iter().flatten() {
                if let Some(value) = region.fields.get(field) {
                    let entry = categories.entry(value).or_default();
                    entry.0 += 1;
                    entry.1 += region.tokens();
                }
            }
            for (category, (segments, words)) in categories {
                conn.execute(
                    "INSERT INTO xml_metadata_values \
                     (corpus, att_handle, handle, category_num_words, category_num_segments) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    (&self.name, handle, category, words as i64, segments as i64),
                )?;
            }
        }
        Ok(())
    }

    fn install_links(&self, db: &Database) -> anyhow::Result<()> {
        let conn = db.connection();
        for (handle, rows) in &self.links {
            let (family, _) = &self.xml_fields[handle];
            let field = &handle[family.len() + 1..];
            let table = SqliteMetadataStore::idlink_table(&self.name, handle)?;
            let columns: BTreeSet<&String> = rows.iter().flat_map(|(_, cols)| cols.keys()).collect();
            let defs: String = columns.iter().map(|c| format!(", {c} TEXT")).collect();
            conn.execute_batch(&format!(
                "CREATE TABLE {table} (__ID TEXT PRIMARY KEY, n_items INTEGER NOT NULL, \
                 n_tokens INTEGER NOT NULL{defs});"
            ))?;

            let names: String = columns.iter().map(|c| format!(", {c}")).collect();
            let marks: String = columns.iter().map(|_| ", ?").collect();
            let sql = format!("INSERT INTO {table} (__ID, n_items, n_tokens{names}) VALUES (?, ?, ?{marks})");
            for (id, values) in rows {
                let members = self
                    .regions
                    .get(family)
                    .into_iter()
                    .flatten()
                    .filter(|r| r.fields.get(field) == Some(id));
                let (n_items, n_tokens) = members.fold((0u64, 0u64), |(n, t), r| (n + 1, t + r.tokens()));
                let mut params = vec![id.clone(), n_items.to_string(), n_tokens.to_string()];
                params.extend(columns.iter().map(|c| values.get(*c).cloned().unwrap_or_default()));
                conn.execute(&sql, params_from_iter(params))?;
            }
        }
        Ok(())
    }

    /// The corpus most tests run against.
    ///
    /// 40 tokens in three texts:
    ///
    /// | text | span    | genre   | year |
    /// |------|---------|---------|------|
    /// | T1   | 0..=19  | fiction | 1990 |
    /// | T2   | 20..=29 | news    | 2000 |
    /// | T3   | 30..=39 | fiction | 2000 |
    ///
    /// `heading` regions `[0,4]` (bold) and `[10,14]` (italic); utterances
    /// `u` with an `id`, a speaker link `who` (speakers `s1`..`s3` with `sex`
    /// and `age`) and a `mode` classification.
    pub fn demo() -> FixtureCorpus {
        FixtureCorpus::new("demo", 40)
            .text("T1", 0, 19, &[("genre", "fiction"), ("year", "1990"), ("title", "First")])
            .text("T2", 20, 29, &[("genre", "news"), ("year", "2000"), ("title", "Second")])
            .text("T3", 30, 39, &[("genre", "fiction"), ("year", "2000"), ("title", "Third")])
            .text_field("title", FieldKind::FreeText)
            .region("heading", 0, 4, &[("rend", "bold")])
            .region("heading", 10, 14, &[("rend", "italic")])
            .region("u", 5, 9, &[("id", "u1"), ("who", "s1"), ("mode", "radio")])
            .region("u", 15, 19, &[("id", "u2"), ("who", "s2"), ("mode", "tv")])
            .region("u", 20, 24, &[("id", "u3"), ("who", "s1"), ("mode", "radio")])
            .region("u", 30, 34, &[("id", "u4"), ("who", "s3"), ("mode", "tv")])
            .xml_field("u", "id", FieldKind::UniqueId)
            .link_row("u", "who", "s1", &[("sex", "f"), ("age", "old")])
            .link_row("u", "who", "s2", &[("sex", "m"), ("age", "young")])
            .link_row("u", "who", "s3", &[("sex", "f"), ("age", "young")])
    }
}
