use serde::{Deserialize, Serialize};

/// Boolean precondition over other rules.
///
/// Textual leaves use a leading `!` for negation, so `"!closed"` holds when the
/// `closed` rule fails. In JSON a tree is either a leaf string,
/// `{"all": [...]}` or `{"any": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ConditionRepr", into = "ConditionRepr")]
pub enum ConditionTree {
    All(Vec<ConditionTree>),
    Any(Vec<ConditionTree>),
    Leaf { rule: String, negated: bool },
}

impl ConditionTree {
    pub fn all<I, C>(children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ConditionTree>,
    {
        Self::All(children.into_iter().map(Into::into).collect())
    }

    pub fn any<I, C>(children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ConditionTree>,
    {
        Self::Any(children.into_iter().map(Into::into).collect())
    }

    /// Parses a leaf, honoring the `!` prefix.
    pub fn leaf(name: &str) -> Self {
        match name.strip_prefix('!') {
            Some(rule) => Self::Leaf {
                rule: rule.to_string(),
                negated: true,
            },
            None => Self::Leaf {
                rule: name.to_string(),
                negated: false,
            },
        }
    }

    pub fn not(rule: &str) -> Self {
        Self::Leaf {
            rule: rule.to_string(),
            negated: true,
        }
    }

    /// Every rule name mentioned in the tree, in depth-first order.
    pub fn referenced_rules(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_rules(&mut names);
        names
    }

    fn collect_rules<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::All(children) | Self::Any(children) => {
                for child in children {
                    child.collect_rules(names);
                }
            }
            Self::Leaf { rule, .. } => names.push(rule),
        }
    }
}

impl From<&str> for ConditionTree {
    fn from(name: &str) -> Self {
        Self::leaf(name)
    }
}

impl From<String> for ConditionTree {
    fn from(name: String) -> Self {
        Self::leaf(&name)
    }
}

impl std::fmt::Display for ConditionTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn join(children: &[ConditionTree]) -> String {
            children
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }
        match self {
            Self::All(children) => write!(f, "all({})", join(children)),
            Self::Any(children) => write!(f, "any({})", join(children)),
            Self::Leaf {
                rule,
                negated: true,
            } => write!(f, "!{}", rule),
            Self::Leaf { rule, .. } => write!(f, "{}", rule),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ConditionRepr {
    Leaf(String),
    All { all: Vec<ConditionTree> },
    Any { any: Vec<ConditionTree> },
}

impl From<ConditionRepr> for ConditionTree {
    fn from(repr: ConditionRepr) -> Self {
        match repr {
            ConditionRepr::Leaf(name) => Self::leaf(&name),
            ConditionRepr::All { all } => Self::All(all),
            ConditionRepr::Any { any } => Self::Any(any),
        }
    }
}

impl From<ConditionTree> for ConditionRepr {
    fn from(tree: ConditionTree) -> Self {
        match tree {
            ConditionTree::All(all) => Self::All { all },
            ConditionTree::Any(any) => Self::Any { any },
            leaf @ ConditionTree::Leaf { .. } => Self::Leaf(leaf.to_string()),
        }
    }
}
