//! Canonical tool identifiers.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

const SEPARATOR: char = ':';

/// Canonical identifier of a tool: `namespace:name`, or just `name` when the
/// tool is not namespaced.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolId {
    namespace: Option<String>,
    name: String,
}

impl ToolId {
    /// Creates an identifier from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToolId`] when the name is empty or either part
    /// contains the `:` separator.
    pub fn new(namespace: Option<&str>, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        validate_segment(&name, &name, "name")?;
        let namespace = match namespace {
            Some(ns) if !ns.is_empty() => {
                validate_segment(ns, &name, "namespace")?;
                Some(ns.to_owned())
            }
            _ => None,
        };
        Ok(Self { namespace, name })
    }

    /// Returns the namespace, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the bare tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn validate_segment(segment: &str, id: &str, label: &str) -> Result<(), Error> {
    if segment.trim().is_empty() {
        return Err(Error::InvalidToolId {
            id: id.to_owned(),
            reason: format!("{label} cannot be empty"),
        });
    }
    if segment.contains(SEPARATOR) {
        return Err(Error::InvalidToolId {
            id: id.to_owned(),
            reason: format!("{label} cannot contain `{SEPARATOR}`"),
        });
    }
    Ok(())
}

impl Display for ToolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}{SEPARATOR}{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for ToolId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(SEPARATOR) {
            Some((namespace, name)) => {
                if namespace.is_empty() {
                    return Err(Error::InvalidToolId {
                        id: s.to_owned(),
                        reason: "namespace cannot be empty".into(),
                    });
                }
                Self::new(Some(namespace), name).map_err(|_| Error::InvalidToolId {
                    id: s.to_owned(),
                    reason: "expected `namespace:name`".into(),
                })
            }
            None => Self::new(None, s),
        }
    }
}

impl TryFrom<String> for ToolId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ToolId> for String {
    fn from(value: ToolId) -> Self {
        value.to_string()
    }
}
