use qscope_backend::ScopeSize;
use qscope_common::ScopeConfig;
use qscope_format::{ItemType, RestrictionSpec};
use qscope_restriction::{ItemListOutcome, Restriction, ScopeContext, Strategy};
use qscope_testkit::TestEnv;

fn with_ctx<T>(env: &TestEnv, config: &ScopeConfig, f: impl FnOnce(&ScopeContext<'_>) -> T) -> T {
    let metadata = env.metadata();
    let ctx = ScopeContext::new("demo", "alice", config, &env.engine, &metadata, &env.db);
    f(&ctx)
}

fn resolve(ctx: &ScopeContext<'_>, s: &str) -> Restriction {
    Restriction::resolve(ctx, RestrictionSpec::parse(s).unwrap()).unwrap()
}

#[test]
fn test_heading_from_url() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        let r = Restriction::from_url(ctx, "del=begin&t=heading&del=end")
            .unwrap()
            .unwrap();
        assert_eq!(r.item_type(), ItemType::Element("heading".into()));
        assert_eq!(r.n_items(), 2);
        assert_eq!(r.intervals(ctx).unwrap().to_pairs(), vec![(0, 4), (10, 14)]);
        assert_eq!(r.serialise(), "$^heading");
        assert_eq!(r.url_serialise(), "del=begin&t=heading&del=end");
    });
}

#[test]
fn test_text_aggregate() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        let r = resolve(ctx, "$^--text|genre~fiction");
        assert_eq!(r.strategy(), Strategy::TextAggregate);
        assert!(!r.must_cache());
        assert_eq!(r.size(), ScopeSize::new(2, 30));
        assert_eq!(r.intervals(ctx).unwrap().to_pairs(), vec![(0, 19), (30, 39)]);
        let items = r.item_list(ctx).unwrap().items().unwrap();
        assert_eq!(items.serialise(), "^text^id^T1 T3");
    });
    assert!(env.engine.commands().is_empty());
}

#[test]
fn test_category_sum() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        let r = resolve(ctx, "$^u|mode~tv.mode~radio");
        assert_eq!(r.strategy(), Strategy::CategorySum);
        assert_eq!(r.size(), ScopeSize::new(4, 20));
        assert_eq!(r.describe(), "u where mode is radio or tv: 4 items, 20 tokens");
        assert_eq!(
            r.intervals(ctx).unwrap().to_pairs(),
            vec![(5, 9), (15, 19), (20, 24), (30, 34)]
        );
    });
}

#[test]
fn test_idlink_aggregate() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        let r = resolve(ctx, "$^u|who/sex~f");
        assert_eq!(r.strategy(), Strategy::IdLinkAggregate);
        assert_eq!(r.size(), ScopeSize::new(3, 15));
        assert_eq!(
            r.intervals(ctx).unwrap().to_pairs(),
            vec![(5, 9), (20, 24), (30, 34)]
        );
        let items = r.item_list(ctx).unwrap().items().unwrap();
        assert_eq!(items.serialise(), "^u^id^u1 u3 u4");
    });
}

#[test]
fn test_multi_field_set_is_tabulated_in_batches() {
    let env = TestEnv::demo().unwrap();
    let mut config = env.config.clone();
    config.tabulate_batch_size = 1;
    with_ctx(&env, &config, |ctx| {
        let r = resolve(ctx, "$^u|mode~radio.who/sex~f");
        assert_eq!(r.strategy(), Strategy::Materialize);
        assert!(r.must_cache());
        assert_eq!(r.size(), ScopeSize::new(2, 10));
        assert_eq!(r.intervals(ctx).unwrap().to_pairs(), vec![(5, 9), (20, 24)]);
    });
    let tabulates = env
        .engine
        .commands()
        .iter()
        .filter(|c| c.starts_with("tabulate "))
        .count();
    assert_eq!(tabulates, 4);
    assert!(env.engine.set("QscopeRegions").is_none());
}

#[test]
fn test_multi_family_intersection() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        let r = resolve(ctx, "@^u|mode~tv^--text|genre~fiction");
        assert_eq!(r.serialise(), "@^--text|genre~fiction^u|mode~tv");
        assert_eq!(r.item_type(), ItemType::Mixed);
        assert_eq!(r.intervals(ctx).unwrap().to_pairs(), vec![(15, 19), (30, 34)]);
        assert_eq!(r.size(), ScopeSize::new(2, 10));
        assert!(matches!(
            r.item_list(ctx).unwrap(),
            ItemListOutcome::Unsupported { .. }
        ));
    });
}

#[test]
fn test_cold_and_cached_resolution_agree() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        for s in ["$^heading", "@^--text|year~2000^u", "$^u|mode~radio.who/age~old"] {
            let cold = resolve(ctx, s);
            assert!(!cold.was_cached(), "{s}");
            let warm = resolve(ctx, s);
            assert!(warm.was_cached(), "{s}");
            assert_eq!(cold.size(), warm.size(), "{s}");
            assert_eq!(cold.intervals(ctx).unwrap(), warm.intervals(ctx).unwrap(), "{s}");
        }
        assert_eq!(ctx.cache().len().unwrap(), 3);
    });
}

#[test]
fn test_cheap_strategies_are_not_cached() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        resolve(ctx, "$^--text|genre~news");
        resolve(ctx, "$^u|who/sex~m");
        assert!(ctx.cache().is_empty().unwrap());
    });
}

#[test]
fn test_no_match_is_empty() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        let r = resolve(ctx, "$^--text|genre~poetry");
        assert!(r.is_empty());
        assert!(r.intervals(ctx).unwrap().is_empty());
        let r = resolve(ctx, "@^heading^u");
        assert!(r.is_empty());
    });
}

#[test]
fn test_unusable_input_is_no_restriction() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        for s in ["", "heading", "$^", "$^u|colour~red", "$^--text|title~First"] {
            assert!(Restriction::from_serialisation(ctx, s).unwrap().is_none(), "{s:?}");
        }
        for q in [
            "del=begin&del=end",
            "del=begin&t=~sc~3&del=end",
            "del=begin&t=u|mode&del=end",
        ] {
            assert!(Restriction::from_url(ctx, q).unwrap().is_none(), "{q}");
        }
        let err = Restriction::resolve(ctx, RestrictionSpec::parse("$^u|colour~red").unwrap())
            .unwrap_err();
        assert!(err.is_parse_failure());
    });
}

#[test]
fn test_empty_text_set_skips_later_sets() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        let r = resolve(ctx, "@^--text|genre~poetry^u|mode~radio.who/sex~f");
        assert!(r.is_empty());
        assert!(r.intervals(ctx).unwrap().is_empty());
    });
    let commands = env.engine.commands();
    assert!(
        !commands.iter().any(|c| c.starts_with("tabulate ")),
        "{commands:?}"
    );
}

#[test]
fn test_unreadable_cache_row_is_replaced() {
    let env = TestEnv::demo().unwrap();
    with_ctx(&env, &env.config, |ctx| {
        let cold = resolve(ctx, "$^heading");
        assert!(!cold.was_cached());
        env.db
            .connection()
            .execute("UPDATE saved_restrictions SET data = x'0102'", [])
            .unwrap();

        let recomputed = resolve(ctx, "$^heading");
        assert!(!recomputed.was_cached());
        assert_eq!(recomputed.size(), cold.size());
        assert_eq!(recomputed.intervals(ctx).unwrap().to_pairs(), vec![(0, 4), (10, 14)]);

        let warm = resolve(ctx, "$^heading");
        assert!(warm.was_cached());
        assert_eq!(warm.size(), cold.size());
        assert_eq!(warm.intervals(ctx).unwrap(), cold.intervals(ctx).unwrap());
        assert_eq!(ctx.cache().len().unwrap(), 1);
    });
}
