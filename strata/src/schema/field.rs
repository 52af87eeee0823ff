use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

use crate::common::{Value, MAX_TEXT_LENGTH, MIN_PASSWORD_LENGTH};
use crate::errors::{ErrorKind, StrataError, StrataResult};

static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+[^\s]*$").expect("valid url regex")
});

/// Variant-specific part of a field definition.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FieldKind {
    /// Plain text; `max` of zero falls back to the store-wide limit.
    Text { max: usize },
    Url,
    Email,
    Password,
    Bool,
    /// Reference to records of another collection, by collection id.
    Relation {
        collection_id: String,
        cascade_delete: bool,
        min_select: usize,
        max_select: usize,
    },
    /// Timestamp maintained by the store.
    Autodate { on_create: bool, on_update: bool },
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "text",
            FieldKind::Url => "url",
            FieldKind::Email => "email",
            FieldKind::Password => "password",
            FieldKind::Bool => "bool",
            FieldKind::Relation { .. } => "relation",
            FieldKind::Autodate { .. } => "autodate",
        }
    }
}

/// A typed attribute definition on a collection.
///
/// Shared metadata lives on the struct, variant payload in [`FieldKind`].
/// Constructors return a field with every flag off, and the chained
/// setters flip them:
///
/// ```text
/// Field::text("name").max(100).required()
/// Field::relation("user", USERS_COLLECTION_ID).cascade_delete().max_select(1).required()
/// Field::autodate("updated").on_create().on_update()
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Field {
    name: String,
    required: bool,
    system: bool,
    hidden: bool,
    presentable: bool,
    kind: FieldKind,
}

impl Field {
    fn with_kind(name: &str, kind: FieldKind) -> Self {
        Field {
            name: name.to_string(),
            required: false,
            system: false,
            hidden: false,
            presentable: false,
            kind,
        }
    }

    pub fn text(name: &str) -> Self {
        Field::with_kind(name, FieldKind::Text { max: 0 })
    }

    pub fn url(name: &str) -> Self {
        Field::with_kind(name, FieldKind::Url)
    }

    pub fn email(name: &str) -> Self {
        Field::with_kind(name, FieldKind::Email)
    }

    pub fn password(name: &str) -> Self {
        let mut field = Field::with_kind(name, FieldKind::Password);
        field.hidden = true;
        field
    }

    pub fn bool(name: &str) -> Self {
        Field::with_kind(name, FieldKind::Bool)
    }

    /// A single-select, non-cascading relation to `collection_id`.
    pub fn relation(name: &str, collection_id: &str) -> Self {
        Field::with_kind(
            name,
            FieldKind::Relation {
                collection_id: collection_id.to_string(),
                cascade_delete: false,
                min_select: 0,
                max_select: 1,
            },
        )
    }

    pub fn autodate(name: &str) -> Self {
        Field::with_kind(
            name,
            FieldKind::Autodate {
                on_create: false,
                on_update: false,
            },
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn presentable(mut self) -> Self {
        self.presentable = true;
        self
    }

    /// Sets the maximum length of a text field. No effect on other kinds.
    pub fn max(mut self, max: usize) -> Self {
        if let FieldKind::Text { max: current } = &mut self.kind {
            *current = max;
        }
        self
    }

    pub fn cascade_delete(mut self) -> Self {
        if let FieldKind::Relation { cascade_delete, .. } = &mut self.kind {
            *cascade_delete = true;
        }
        self
    }

    pub fn min_select(mut self, min: usize) -> Self {
        if let FieldKind::Relation { min_select, .. } = &mut self.kind {
            *min_select = min;
        }
        self
    }

    pub fn max_select(mut self, max: usize) -> Self {
        if let FieldKind::Relation { max_select, .. } = &mut self.kind {
            *max_select = max;
        }
        self
    }

    pub fn on_create(mut self) -> Self {
        if let FieldKind::Autodate { on_create, .. } = &mut self.kind {
            *on_create = true;
        }
        self
    }

    pub fn on_update(mut self) -> Self {
        if let FieldKind::Autodate { on_update, .. } = &mut self.kind {
            *on_update = true;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_presentable(&self) -> bool {
        self.presentable
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The target collection id of a relation field.
    pub fn relation_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Relation { collection_id, .. } => Some(collection_id),
            _ => None,
        }
    }

    pub fn is_cascade_delete(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Relation {
                cascade_delete: true,
                ..
            }
        )
    }

    /// Checks the definition itself, independent of any record.
    pub fn validate_definition(&self) -> StrataResult<()> {
        if !FIELD_NAME.is_match(&self.name) {
            log::error!("Invalid field name '{}'", self.name);
            return Err(StrataError::new(
                &format!("Invalid field name '{}'", self.name),
                ErrorKind::ValidationError,
            ));
        }

        match &self.kind {
            FieldKind::Relation {
                collection_id,
                min_select,
                max_select,
                ..
            } => {
                if collection_id.is_empty() {
                    return Err(StrataError::new(
                        &format!("Relation field '{}' has no target collection", self.name),
                        ErrorKind::ValidationError,
                    ));
                }
                if *max_select == 0 || min_select > max_select {
                    return Err(StrataError::new(
                        &format!(
                            "Relation field '{}' has invalid selection bounds {}..{}",
                            self.name, min_select, max_select
                        ),
                        ErrorKind::ValidationError,
                    ));
                }
            }
            FieldKind::Autodate {
                on_create,
                on_update,
            } => {
                if !on_create && !on_update {
                    return Err(StrataError::new(
                        &format!(
                            "Autodate field '{}' must set on-create or on-update",
                            self.name
                        ),
                        ErrorKind::ValidationError,
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Validates a record value against this field and returns it in
    /// normalized form.
    ///
    /// Relation existence is checked by the store, which knows the target
    /// collection; here only the shape and selection bounds are checked.
    /// Passwords arrive already hashed, so only presence is checked.
    pub fn validate_value(&self, value: &Value) -> StrataResult<Value> {
        if value.is_blank() {
            if self.required && !matches!(self.kind, FieldKind::Autodate { .. }) {
                return Err(self.invalid("cannot be blank"));
            }
            return Ok(match &self.kind {
                FieldKind::Bool => Value::Bool(false),
                FieldKind::Relation { max_select, .. } if *max_select > 1 => {
                    Value::Array(Vec::new())
                }
                FieldKind::Relation { .. } => Value::String(String::new()),
                FieldKind::Autodate { .. } => value.clone(),
                _ => Value::String(String::new()),
            });
        }

        match &self.kind {
            FieldKind::Text { max } => {
                let text = self.expect_string(value)?;
                let limit = if *max == 0 { MAX_TEXT_LENGTH } else { *max };
                if text.chars().count() > limit {
                    return Err(self.invalid(&format!("must be at most {} characters", limit)));
                }
                Ok(value.clone())
            }
            FieldKind::Url => {
                let text = self.expect_string(value)?;
                if !URL.is_match(text) {
                    return Err(self.invalid("must be a valid url"));
                }
                Ok(value.clone())
            }
            FieldKind::Email => {
                let text = self.expect_string(value)?;
                if !EMAIL.is_match(text) {
                    return Err(self.invalid("must be a valid email address"));
                }
                Ok(Value::String(text.to_lowercase()))
            }
            FieldKind::Password => {
                self.expect_string(value)?;
                Ok(value.clone())
            }
            FieldKind::Bool => match value {
                Value::Bool(_) => Ok(value.clone()),
                other => Err(self.invalid(&format!("expects bool, got {}", other.type_name()))),
            },
            FieldKind::Relation {
                min_select,
                max_select,
                ..
            } => {
                let ids = value.as_id_list().ok_or_else(|| {
                    self.invalid(&format!("expects record ids, got {}", value.type_name()))
                })?;
                let mut unique = ids.clone();
                unique.sort();
                unique.dedup();
                if unique.len() != ids.len() {
                    return Err(self.invalid("contains duplicate record ids"));
                }
                if ids.len() < *min_select || ids.len() > *max_select {
                    return Err(self.invalid(&format!(
                        "must select between {} and {} records",
                        min_select, max_select
                    )));
                }
                if *max_select == 1 {
                    Ok(Value::String(ids.into_iter().next().unwrap_or_default()))
                } else {
                    Ok(Value::from(ids))
                }
            }
            FieldKind::Autodate { .. } => match value {
                Value::DateTime(_) => Ok(value.clone()),
                other => Err(self.invalid(&format!(
                    "expects datetime, got {}",
                    other.type_name()
                ))),
            },
        }
    }

    /// Minimum length check for plain passwords before they are hashed.
    pub(crate) fn validate_plain_password(&self, password: &str) -> StrataResult<()> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(self.invalid(&format!(
                "must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    fn expect_string<'a>(&self, value: &'a Value) -> StrataResult<&'a String> {
        value.as_string().ok_or_else(|| {
            self.invalid(&format!("expects string, got {}", value.type_name()))
        })
    }

    fn invalid(&self, reason: &str) -> StrataError {
        StrataError::new(
            &format!("Field '{}' {}", self.name, reason),
            ErrorKind::ValidationError,
        )
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.kind.type_name())?;
        if self.required {
            write!(f, " (required)")?;
        }
        Ok(())
    }
}
