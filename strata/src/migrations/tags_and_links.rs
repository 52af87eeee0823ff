use crate::common::USERS_COLLECTION;
use crate::migration::{Migration, Version};
use crate::schema::{drop_collection_if_exists, CollectionBuilder, Field};
use crate::store::StoreOperations;

pub const VERSION: Version = Version::new(1768297642);
pub const NAME: &str = "tags_and_links";

pub const TAGS_COLLECTION: &str = "tags";
pub const LINKS_COLLECTION: &str = "links";

/// Signed-in users only ever see and touch their own records.
pub const OWNER_RULE: &str = "@request.auth.id != '' && user = @request.auth.id";

/// Creates the `tags` and `links` collections, both owned by a user.
pub fn migration() -> Migration {
    Migration::new(
        VERSION,
        NAME,
        |tx| {
            let users = tx.find_collection_by_name_or_id(USERS_COLLECTION)?;

            let tags = CollectionBuilder::base(TAGS_COLLECTION)
                .field(Field::autodate("created").on_create())
                .field(Field::autodate("updated").on_create().on_update())
                .field(Field::text("name").max(100).required())
                .field(Field::text("color").max(100).required())
                .field(
                    Field::relation("user", users.id())
                        .cascade_delete()
                        .max_select(1)
                        .required(),
                )
                .rules_all(OWNER_RULE)
                .unique_index("idx_unique_tag_per_user", &["name", "user"])
                .ensure(tx)?;

            CollectionBuilder::base(LINKS_COLLECTION)
                .field(Field::url("url").required())
                .field(Field::text("title").max(1000))
                .field(Field::text("description").max(5000))
                .field(Field::url("og_image"))
                .field(Field::text("og_site_name").max(200))
                .field(Field::text("og_type").max(100))
                .field(Field::text("favicon").max(200))
                .field(Field::text("notes").max(5000))
                .field(Field::relation("tags", tags.id()).max_select(100))
                .field(
                    Field::relation("user", users.id())
                        .cascade_delete()
                        .max_select(1)
                        .required(),
                )
                .field(Field::bool("is_favorite"))
                .field(Field::bool("archived"))
                .rules_all(OWNER_RULE)
                .ensure(tx)?;

            Ok(())
        },
        |tx| {
            // links references tags, so it goes first
            drop_collection_if_exists(tx, LINKS_COLLECTION)?;
            drop_collection_if_exists(tx, TAGS_COLLECTION)
        },
    )
}
