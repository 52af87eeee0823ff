use strata::common::{Value, USERS_COLLECTION};
use strata::errors::ErrorKind;
use strata::record::Record;
use strata::schema::{CollectionBuilder, Field};
use strata::store::StoreOperations;
use strata_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_transaction_isolation() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let tx = store.begin_transaction()?;
            CollectionBuilder::base("drafts").open_all().ensure(&tx)?;

            assert!(tx.has_collection("drafts")?);
            assert!(!store.has_collection("drafts")?);

            tx.rollback()?;
            assert!(!store.has_collection("drafts")?);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_conflicting_commit() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let first = store.begin_transaction()?;
            let second = store.begin_transaction()?;
            CollectionBuilder::base("first").open_all().ensure(&first)?;
            CollectionBuilder::base("second").open_all().ensure(&second)?;

            first.commit()?;
            let err = second.commit().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionConflict);
            assert!(store.has_collection("first")?);
            assert!(!store.has_collection("second")?);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_required_relation_blocks_unlink() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let folders = CollectionBuilder::base("folders")
                .field(Field::text("name"))
                .open_all()
                .ensure(&store)?;
            let files = CollectionBuilder::base("files")
                .field(Field::relation("folder", folders.id()).required())
                .open_all()
                .ensure(&store)?;

            let mut folder = Record::new(&folders);
            folder.set("name", "inbox");
            store.save_record(&mut folder)?;

            let mut file = Record::new(&files);
            file.set("folder", folder.id());
            store.save_record(&mut file)?;

            let err = store.delete_record(&folder).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            assert_eq!(store.find_records("folders")?.len(), 1);
            assert_eq!(
                store.find_record_by_id("files", file.id())?.get("folder"),
                Value::from(folder.id())
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_autodate_fields() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let users = store.find_collection_by_name_or_id(USERS_COLLECTION)?;
            let mut user = Record::new(&users);
            user.set("email", "someone@example.com");
            user.set("password", "password-1234");
            store.save_record(&mut user)?;

            let created = user.get("created");
            let updated = user.get("updated");
            assert!(created.as_date_time().is_some());

            user.set("name", "Someone");
            store.save_record(&mut user)?;
            assert_eq!(user.get("created"), created);
            assert!(user.get("updated").as_date_time() >= updated.as_date_time());

            let found =
                store.find_auth_record_by_identifier(USERS_COLLECTION, "SOMEONE@example.com")?;
            assert_eq!(found.get_string("name").as_deref(), Some("Someone"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unknown_record() {
    run_test(
        create_test_context,
        |ctx| {
            let err = ctx
                .store()
                .find_record_by_id(USERS_COLLECTION, "nosuchrecord123")
                .unwrap_err();
            assert!(err.is_not_found());
            let err = ctx.store().find_records("missing").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::CollectionNotFound);
            Ok(())
        },
        cleanup,
    )
}
