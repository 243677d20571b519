//! Backend bindings that tie a tool to a concrete execution mechanism.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminant of a [`Backend`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Tool served by a remote protocol server.
    Remote,
    /// Tool fulfilled by a pluggable provider.
    Provider,
    /// Tool implemented by an in-process handler.
    Local,
}

impl BackendKind {
    /// Returns the lowercase label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Provider => "provider",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote protocol server binding.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct RemoteBackend {
    server: String,
}

impl RemoteBackend {
    /// Returns the server (connection) identifier.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }
}

/// Provider binding.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderBackend {
    provider_id: String,
    tool_id: String,
}

impl ProviderBackend {
    /// Returns the provider identifier.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Returns the provider-local tool identifier.
    #[must_use]
    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }
}

/// In-process handler binding.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct LocalBackend {
    name: String,
}

impl LocalBackend {
    /// Returns the handler name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Binding of a tool to exactly one execution mechanism.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backend {
    /// Remote protocol server.
    Remote(RemoteBackend),
    /// Pluggable provider.
    Provider(ProviderBackend),
    /// In-process handler.
    Local(LocalBackend),
}

impl Backend {
    /// Creates a remote backend bound to the supplied server identifier.
    #[must_use]
    pub fn remote(server: impl Into<String>) -> Self {
        Self::Remote(RemoteBackend {
            server: server.into(),
        })
    }

    /// Creates a provider backend.
    #[must_use]
    pub fn provider(provider_id: impl Into<String>, tool_id: impl Into<String>) -> Self {
        Self::Provider(ProviderBackend {
            provider_id: provider_id.into(),
            tool_id: tool_id.into(),
        })
    }

    /// Creates a local backend bound to the supplied handler name.
    #[must_use]
    pub fn local(name: impl Into<String>) -> Self {
        Self::Local(LocalBackend { name: name.into() })
    }

    /// Returns the kind of this backend.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Remote(_) => BackendKind::Remote,
            Self::Provider(_) => BackendKind::Provider,
            Self::Local(_) => BackendKind::Local,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(remote) => write!(f, "remote:{}", remote.server),
            Self::Provider(provider) => {
                write!(f, "provider:{}/{}", provider.provider_id, provider.tool_id)
            }
            Self::Local(local) => write!(f, "local:{}", local.name),
        }
    }
}
