use strata::errors::ErrorKind;
use strata::schema::{
    add_fields, drop_collection_if_exists, ensure_collection, set_access_rules, AccessRules,
    CollectionBuilder, Field, RuleKind,
};
use strata::store::StoreOperations;
use strata_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_ensure_collection_twice() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let builder = CollectionBuilder::base("notes")
                .field(Field::text("body").max(2000).required())
                .field(Field::bool("pinned"))
                .rules_all("@request.auth.id != ''");

            let tx = store.begin_transaction()?;
            let first = builder.ensure(&tx)?;
            let second = builder.ensure(&tx)?;
            tx.commit()?;

            assert_eq!(first.id(), second.id());
            let notes = store.find_collection_by_name_or_id("notes")?;
            assert_eq!(notes.field_names(), vec!["body", "pinned"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_factory_runs_only_for_missing_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let mut calls = 0;
            for _ in 0..3 {
                ensure_collection(&store, "bookmarks", |_| {
                    calls += 1;
                    let mut collection = CollectionBuilder::base("bookmarks").open_all().build()?;
                    add_fields(&mut collection, vec![Field::url("url").required()])?;
                    set_access_rules(&mut collection, AccessRules::all("@request.auth.id != ''"));
                    Ok(collection)
                })?;
            }
            assert_eq!(calls, 1);

            let bookmarks = store.find_collection_by_name_or_id("bookmarks")?;
            assert_eq!(
                bookmarks.rules().get(RuleKind::Create),
                Some("@request.auth.id != ''")
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_add_fields_duplicate_aborts_unit() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let result = store.run_in_transaction(|tx| {
                let mut collection = CollectionBuilder::base("drafts").open_all().build()?;
                add_fields(&mut collection, vec![Field::text("title"), Field::text("title")])?;
                tx.save_collection(&mut collection)
            });
            assert_eq!(result.unwrap_err().kind(), &ErrorKind::DuplicateField);
            assert!(!store.has_collection("drafts")?);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_drop_referenced_collection_is_refused() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let tags = CollectionBuilder::base("tags")
                .field(Field::text("name"))
                .open_all()
                .ensure(&store)?;
            CollectionBuilder::base("links")
                .field(Field::relation("tags", tags.id()).max_select(10))
                .open_all()
                .ensure(&store)?;

            let err = drop_collection_if_exists(&store, "tags").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            drop_collection_if_exists(&store, "links")?;
            drop_collection_if_exists(&store, "tags")?;
            drop_collection_if_exists(&store, "tags")?;
            assert_eq!(store.collection_names()?, vec!["_superusers", "users"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_system_collection_cannot_be_dropped() {
    run_test(
        create_test_context,
        |ctx| {
            let err = drop_collection_if_exists(&ctx.store(), "users").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            Ok(())
        },
        cleanup,
    )
}
