use std::fmt::{Display, Formatter};

/// The CRUD operation a rule gates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum RuleKind {
    List,
    View,
    Create,
    Update,
    Delete,
}

impl RuleKind {
    pub const ALL: [RuleKind; 5] = [
        RuleKind::List,
        RuleKind::View,
        RuleKind::Create,
        RuleKind::Update,
        RuleKind::Delete,
    ];
}

impl Display for RuleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuleKind::List => "list",
            RuleKind::View => "view",
            RuleKind::Create => "create",
            RuleKind::Update => "update",
            RuleKind::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

/// Per-operation access predicates of a collection.
///
/// Each rule is an opaque filter expression handed to the store for
/// evaluation; `None` means unrestricted. Nothing here parses the
/// expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AccessRules {
    pub list: Option<String>,
    pub view: Option<String>,
    pub create: Option<String>,
    pub update: Option<String>,
    pub delete: Option<String>,
}

impl AccessRules {
    /// Every operation unrestricted.
    pub fn unrestricted() -> Self {
        AccessRules::default()
    }

    /// The same expression for all five operations.
    pub fn all(expression: &str) -> Self {
        let mut rules = AccessRules::default();
        for kind in RuleKind::ALL {
            rules.set(kind, Some(expression.to_string()));
        }
        rules
    }

    pub fn get(&self, kind: RuleKind) -> Option<&str> {
        self.slot(kind).as_deref()
    }

    pub fn set(&mut self, kind: RuleKind, expression: Option<String>) {
        *self.slot_mut(kind) = expression;
    }

    pub fn is_unrestricted(&self, kind: RuleKind) -> bool {
        self.slot(kind).is_none()
    }

    fn slot(&self, kind: RuleKind) -> &Option<String> {
        match kind {
            RuleKind::List => &self.list,
            RuleKind::View => &self.view,
            RuleKind::Create => &self.create,
            RuleKind::Update => &self.update,
            RuleKind::Delete => &self.delete,
        }
    }

    fn slot_mut(&mut self, kind: RuleKind) -> &mut Option<String> {
        match kind {
            RuleKind::List => &mut self.list,
            RuleKind::View => &mut self.view,
            RuleKind::Create => &mut self.create,
            RuleKind::Update => &mut self.update,
            RuleKind::Delete => &mut self.delete,
        }
    }
}
