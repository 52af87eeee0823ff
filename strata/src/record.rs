use im::OrdMap;
use std::fmt::{Debug, Formatter};

use crate::common::{Value, AUTH_EMAIL, AUTH_PASSWORD};
use crate::schema::Collection;

/// A single entry of a collection.
///
/// Field values live in a persistent `im::OrdMap`, so cloning a record
/// (which the in-memory store does on every read) shares structure
/// instead of copying it.
///
/// On auth records, setting the `password` field stages the plain
/// password; the store validates and hashes it on save and the plain
/// text never reaches the stored field.
#[derive(Clone, PartialEq, Eq)]
pub struct Record {
    id: String,
    collection_id: String,
    collection_name: String,
    auth: bool,
    data: OrdMap<String, Value>,
    plain_password: Option<String>,
}

impl Record {
    /// A new, unsaved record for `collection`.
    pub fn new(collection: &Collection) -> Self {
        Record {
            id: String::new(),
            collection_id: collection.id().to_string(),
            collection_name: collection.name().to_string(),
            auth: collection.is_auth(),
            data: OrdMap::new(),
            plain_password: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// True until the store saves the record for the first time.
    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    /// Sets a field value.
    ///
    /// A non-string `password` on an auth record replaces the stored hash
    /// as-is, so the next save rejects it.
    pub fn set<T: Into<Value>>(&mut self, key: &str, value: T) {
        let value = value.into();
        if self.auth && key == AUTH_PASSWORD {
            if let Value::String(password) = value {
                self.plain_password = Some(password);
                return;
            }
            self.plain_password = None;
        }
        self.data.insert(key.to_string(), value);
    }

    /// Returns the value of `key`, `Value::Null` if unset.
    pub fn get(&self, key: &str) -> Value {
        self.data.get(key).cloned().unwrap_or_default()
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.data.get(key).and_then(|v| v.as_string().cloned())
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.data
            .get(key)
            .and_then(|v| v.as_bool().copied())
            .unwrap_or(false)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Field names that are set, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// The email identifier of an auth record.
    pub fn email(&self) -> Option<String> {
        self.get_string(AUTH_EMAIL)
    }

    /// The stored password hash of an auth record.
    pub fn password_hash(&self) -> Option<String> {
        if self.auth {
            self.get_string(AUTH_PASSWORD)
        } else {
            None
        }
    }

    pub fn is_auth(&self) -> bool {
        self.auth
    }

    pub(crate) fn assign_id(&mut self, id: String) {
        if self.id.is_empty() {
            self.id = id;
        }
    }

    pub(crate) fn take_plain_password(&mut self) -> Option<String> {
        self.plain_password.take()
    }

    pub(crate) fn set_raw(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }
}

impl Debug for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // never print a staged password
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("collection", &self.collection_name)
            .field("data", &self.data)
            .finish()
    }
}
