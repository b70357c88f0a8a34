use qscope_common::error::ErrorKind;
use qscope_format::{RestrictionSpec, SubcorpusContent, SubcorpusId};
use qscope_restriction::{Restriction, ScopeContext};
use qscope_subcorpus::Subcorpus;
use qscope_testkit::{FixtureCorpus, TestEnv};

fn with_ctx<T>(env: &TestEnv, f: impl FnOnce(&ScopeContext<'_>) -> T) -> T {
    with_corpus_ctx(env, "demo", f)
}

fn with_corpus_ctx<T>(env: &TestEnv, corpus: &str, f: impl FnOnce(&ScopeContext<'_>) -> T) -> T {
    let metadata = env.metadata();
    let ctx = ScopeContext::new(corpus, "alice", &env.config, &env.engine, &metadata, &env.db);
    f(&ctx)
}

fn restriction(ctx: &ScopeContext<'_>, s: &str) -> Restriction {
    Restriction::resolve(ctx, RestrictionSpec::parse(s).unwrap()).unwrap()
}

#[test]
fn test_list_is_sorted_and_deduplicated() {
    let fixture = FixtureCorpus::new("ab", 20)
        .text("A", 0, 9, &[("genre", "x")])
        .text("B", 10, 19, &[("genre", "y")]);
    let env = TestEnv::with_corpus(&fixture).unwrap();
    with_corpus_ctx(&env, "ab", |ctx| {
        let sc = Subcorpus::populate_from_list(ctx, "mine", "text", "id", ["B", "A", "A"]).unwrap();
        assert_eq!(sc.list().unwrap().items(), vec!["A", "B"]);
        assert_eq!(sc.content().serialise(), "^text^id^A B");
        assert_eq!((sc.n_items(), sc.n_tokens()), (2, 20));
    });
}

#[test]
fn test_unknown_items_are_dropped() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, |ctx| {
        let sc = Subcorpus::populate_from_list(ctx, "t", "text", "id", ["T2", "T9"]).unwrap();
        assert_eq!(sc.content().serialise(), "^text^id^T2");
        assert_eq!(sc.n_tokens(), 10);

        let sc = Subcorpus::populate_from_list(ctx, "u", "u", "id", ["u3", "u7"]).unwrap();
        assert_eq!(sc.content().serialise(), "^u^id^u3");
        assert_eq!(sc.n_tokens(), 5);

        let err = Subcorpus::populate_from_list(ctx, "bad", "text", "id", ["T-1"]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    });
}

#[test]
fn test_delete_invalidates_dependents() {
    let env = TestEnv::demo().unwrap();
    let conn = env.db.connection();
    conn.execute(
        "INSERT INTO sqlite_sequence (name, seq) VALUES ('saved_subcorpora', 22)",
        [],
    )
    .unwrap();
    with_ctx(&env, |ctx| {
        let mut sc = Subcorpus::populate_from_list(ctx, "sc", "text", "id", ["T1"]).unwrap();
        let id = sc.save(ctx).unwrap();
        assert_eq!(id, SubcorpusId(23));

        conn.execute_batch(
            "INSERT INTO query_history (corpus, user, cqp_query, query_scope) \
                 VALUES ('demo', 'alice', 'dog', '23'), ('demo', 'alice', 'cat', '');
             INSERT INTO saved_queries (query_name, corpus, user, cqp_query, query_scope) \
                 VALUES ('q1', 'demo', 'alice', 'dog', '23');
             CREATE TABLE freq_sc23 (item TEXT, n INTEGER);
             INSERT INTO saved_freqtables VALUES ('freq_sc23', 'demo', '23');",
        )
        .unwrap();
        let dumpfile = sc.dumpfile(ctx).unwrap();
        assert!(dumpfile.is_file());

        sc.delete(ctx).unwrap();

        assert!(!dumpfile.exists());
        assert!(Subcorpus::load(ctx, id).unwrap().is_none());
        let scopes: Vec<String> = conn
            .prepare("SELECT query_scope FROM query_history ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(scopes, vec!["~~", ""]);
        let saved: String = conn
            .query_row("SELECT query_scope FROM saved_queries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(saved, "~~");
        assert!(!env.db.table_exists("freq_sc23").unwrap());
    });
}

#[test]
fn test_save_load_rename_and_collisions() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, |ctx| {
        let mut a = Subcorpus::populate_from_list(ctx, "first", "text", "id", ["T1"]).unwrap();
        let a_id = a.save(ctx).unwrap();
        let mut b = Subcorpus::populate_from_list(ctx, "second", "text", "id", ["T2"]).unwrap();
        b.save(ctx).unwrap();

        let loaded = Subcorpus::load_by_name(ctx, "first").unwrap().unwrap();
        assert_eq!(loaded.id(), Some(a_id));
        assert_eq!(loaded.content(), a.content());
        assert_eq!(loaded.size(), a.size());

        // Renaming onto an existing name replaces that subcorpus.
        b.rename(ctx, "first").unwrap();
        assert!(Subcorpus::load(ctx, a_id).unwrap().is_none());
        let names: Vec<_> = Subcorpus::list_for_user(ctx)
            .unwrap()
            .iter()
            .map(|sc| sc.name().to_string())
            .collect();
        assert_eq!(names, vec!["first"]);

        let other = ctx.with_user("bob");
        assert!(Subcorpus::list_for_user(&other).unwrap().is_empty());
        assert!(Subcorpus::populate_from_list(ctx, "has space", "text", "id", ["T1"]).is_err());
    });
}

#[test]
fn test_add_and_remove_items() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, |ctx| {
        let mut sc = Subcorpus::populate_from_list(ctx, "sc", "text", "id", ["T1"]).unwrap();
        let id = sc.save(ctx).unwrap();
        let dumpfile = sc.dumpfile(ctx).unwrap();

        sc.add_items(ctx, ["T3", "T9"]).unwrap();
        assert_eq!(sc.content().serialise(), "^text^id^T1 T3");
        assert_eq!(sc.n_tokens(), 30);
        assert!(!dumpfile.exists());
        assert_eq!(
            Subcorpus::load(ctx, id).unwrap().unwrap().content().serialise(),
            "^text^id^T1 T3"
        );

        sc.remove_items(ctx, ["T1", "T2"]).unwrap();
        assert_eq!(sc.content().serialise(), "^text^id^T3");
        assert_eq!((sc.n_items(), sc.n_tokens()), (1, 10));
        assert!(sc.add_items(ctx, ["bad-id"]).is_err());
    });
}

#[test]
fn test_restriction_content_downgrades_before_edit() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, |ctx| {
        let r = restriction(ctx, "$^u|mode~radio");
        let mut sc = Subcorpus::populate_from_restriction(ctx, "radio", &r).unwrap();
        sc.save(ctx).unwrap();
        assert_eq!(sc.content().serialise(), "$^u|mode~radio");
        assert_eq!(sc.n_items(), 2);

        sc.add_items(ctx, ["u2"]).unwrap();
        assert_eq!(sc.content().serialise(), "^u^id^u1 u2 u3");
        assert_eq!((sc.n_items(), sc.n_tokens()), (3, 15));

        let r = restriction(ctx, "@^--text|genre~fiction^u");
        let mut mixed = Subcorpus::populate_from_restriction(ctx, "mixed", &r).unwrap();
        mixed.save(ctx).unwrap();
        let err = mixed.add_items(ctx, ["u1"]).unwrap_err();
        assert!(err.is_unsupported());
        assert!(matches!(mixed.content(), SubcorpusContent::Restriction(_)));

        let downgraded = mixed.downgraded(ctx).unwrap();
        assert!(matches!(downgraded.content(), SubcorpusContent::Arbitrary));
        assert_eq!(downgraded.size(), mixed.size());
    });
}

#[test]
fn test_from_query_and_inversion() {
    let env = TestEnv::demo().unwrap();
    env.engine.define_set("Dog", vec![(6, 6), (7, 8), (31, 31)]);
    with_ctx(&env, |ctx| {
        let sc = Subcorpus::populate_from_query(ctx, "dogs", "Dog", "u").unwrap();
        assert_eq!(sc.content().serialise(), "^u^id^u1 u4");
        let err = Subcorpus::populate_from_query(ctx, "h", "Dog", "heading").unwrap_err();
        assert!(err.is_unsupported());

        let texts = Subcorpus::populate_from_query(ctx, "texts", "Dog", "text").unwrap();
        assert_eq!(texts.content().serialise(), "^text^id^T1 T3");
        let inverted = Subcorpus::populate_from_inverting(ctx, "rest", &texts).unwrap();
        assert_eq!(inverted.content().serialise(), "^text^id^T2");

        let err = Subcorpus::populate_from_inverting(ctx, "x", &sc).unwrap_err();
        assert!(err.is_unsupported());

        let r = restriction(ctx, "$^--text|year~2000");
        let by_restriction = Subcorpus::populate_from_restriction(ctx, "y", &r).unwrap();
        let inverted = Subcorpus::populate_from_inverting(ctx, "not_y", &by_restriction).unwrap();
        assert_eq!(inverted.content().serialise(), "^text^id^T1");
    });
}

#[test]
fn test_arbitrary_subcorpus_from_dump_file() {
    let env = TestEnv::demo().unwrap();
    let upload = env.dir.path().join("upload.txt");
    std::fs::write(&upload, "3\t7\n12\t12\n").unwrap();
    with_ctx(&env, |ctx| {
        let mut sc = Subcorpus::populate_from_dump_file(ctx, "upload", &upload).unwrap();
        assert_eq!((sc.n_items(), sc.n_tokens()), (2, 6));
        sc.save(ctx).unwrap();
        assert_eq!(sc.content().serialise(), "^^^");

        let loaded = Subcorpus::load(ctx, sc.id().unwrap()).unwrap().unwrap();
        assert_eq!(loaded.intervals(ctx).unwrap().to_pairs(), vec![(3, 7), (12, 12)]);
        assert!(loaded.item_list(ctx).unwrap().is_unsupported());
        assert!(loaded.clone().add_items(ctx, ["u1"]).unwrap_err().is_unsupported());

        let copy = loaded.duplicate(ctx, "copy").unwrap();
        assert_eq!(copy.intervals(ctx).unwrap().to_pairs(), vec![(3, 7), (12, 12)]);

        std::fs::remove_file(loaded.dumpfile(ctx).unwrap()).unwrap();
        let err = loaded.intervals(ctx).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Consistency { .. }));
        assert!(loaded.dumpfile(ctx).is_err());

        std::fs::write(&upload, "30\t45\n").unwrap();
        assert!(Subcorpus::populate_from_dump_file(ctx, "too_long", &upload).is_err());
    });
}

#[test]
fn test_duplicate_list_copies_dumpfile() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, |ctx| {
        let mut sc = Subcorpus::populate_from_list(ctx, "orig", "u", "id", ["u1", "u2"]).unwrap();
        sc.save(ctx).unwrap();
        sc.dumpfile(ctx).unwrap();

        let copy = sc.duplicate(ctx, "copy").unwrap();
        assert_ne!(copy.id(), sc.id());
        assert_eq!(copy.content(), sc.content());
        let path = Subcorpus::dumpfile_path(ctx.config, copy.id().unwrap());
        assert!(path.is_file());
        assert!(sc.duplicate(ctx, "orig").is_err());
        assert_eq!(Subcorpus::list_for_user(ctx).unwrap().len(), 2);
    });
}
