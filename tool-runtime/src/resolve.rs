//! Tool and backend resolution with fallbacks.

use thiserror::Error;
use tool_index::IndexError;
use tool_primitives::{Backend, Tool};
use tracing::debug;

use crate::config::RunnerConfig;

/// Tool definition and candidate backends for one call.
#[derive(Clone, Debug)]
pub(crate) struct Resolved {
    pub(crate) tool: Tool,
    pub(crate) backends: Vec<Backend>,
}

#[derive(Debug, Error)]
pub(crate) enum ResolveError {
    #[error("tool not found")]
    ToolNotFound {
        #[source]
        source: Option<IndexError>,
    },

    #[error("no backends available")]
    NoBackends,

    #[error(transparent)]
    Index(IndexError),
}

/// Looks the tool up in the index, then falls back to the configured
/// resolvers. Index faults other than "not found" abort resolution; resolver
/// failures count as "nothing found".
pub(crate) fn resolve(config: &RunnerConfig, tool_id: &str) -> Result<Resolved, ResolveError> {
    let mut tool = None;
    let mut backends = Vec::new();
    let mut not_found = None;

    if let Some(index) = &config.index {
        match index.get_tool(tool_id) {
            Ok((found, default)) => {
                backends = match index.get_all_backends(tool_id) {
                    Ok(all) if !all.is_empty() => all,
                    Ok(_) => vec![default],
                    Err(err) if err.is_not_found() => {
                        debug!(tool_id, "backend list missing; using default backend");
                        vec![default]
                    }
                    Err(err) => return Err(ResolveError::Index(err)),
                };
                tool = Some(found);
            }
            Err(err) if err.is_not_found() => not_found = Some(err),
            Err(err) => return Err(ResolveError::Index(err)),
        }
    }

    if tool.is_none() {
        if let Some(resolver) = &config.tool_resolver {
            match resolver(tool_id) {
                Ok(found) => {
                    debug!(tool_id, "tool resolved by fallback resolver");
                    tool = Some(found);
                }
                Err(err) => debug!(tool_id, error = %err, "fallback tool resolver failed"),
            }
        }
    }

    let Some(tool) = tool else {
        return Err(ResolveError::ToolNotFound { source: not_found });
    };

    if backends.is_empty() {
        if let Some(resolver) = &config.backends_resolver {
            match resolver(tool_id) {
                Ok(found) => backends = found,
                Err(err) => debug!(tool_id, error = %err, "fallback backends resolver failed"),
            }
        }
    }

    if backends.is_empty() {
        return Err(ResolveError::NoBackends);
    }

    debug!(tool_id, candidates = backends.len(), "tool resolved");
    Ok(Resolved { tool, backends })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use anyhow::anyhow;
    use tool_index::InMemoryIndex;

    use crate::config::RunnerBuilder;
    use crate::testing::{ScriptedIndex, tool};

    fn config(builder: RunnerBuilder) -> RunnerConfig {
        builder.build().config().clone()
    }

    #[test]
    fn index_hit_returns_all_backends() {
        let index = InMemoryIndex::new();
        index
            .register(
                tool("echo"),
                vec![Backend::remote("srv"), Backend::local("echo")],
            )
            .unwrap();
        let cfg = config(RunnerBuilder::new().with_index(Arc::new(index)));

        let resolved = resolve(&cfg, "echo").unwrap();
        assert_eq!(resolved.tool.name(), "echo");
        assert_eq!(resolved.backends.len(), 2);
    }

    #[test]
    fn missing_backend_list_falls_back_to_default() {
        let index = ScriptedIndex::new(
            Ok((tool("echo"), Backend::remote("srv"))),
            Err(IndexError::not_found("echo")),
        );
        let cfg = config(RunnerBuilder::new().with_index(Arc::new(index)));

        let resolved = resolve(&cfg, "echo").unwrap();
        assert_eq!(resolved.backends, vec![Backend::remote("srv")]);
    }

    #[test]
    fn empty_backend_list_falls_back_to_default() {
        let index = ScriptedIndex::new(Ok((tool("echo"), Backend::local("h"))), Ok(Vec::new()));
        let cfg = config(RunnerBuilder::new().with_index(Arc::new(index)));

        let resolved = resolve(&cfg, "echo").unwrap();
        assert_eq!(resolved.backends, vec![Backend::local("h")]);
    }

    #[test]
    fn backend_list_fault_is_fatal() {
        let index = ScriptedIndex::new(
            Ok((tool("echo"), Backend::remote("srv"))),
            Err(IndexError::unavailable("db down")),
        );
        let cfg = config(
            RunnerBuilder::new()
                .with_index(Arc::new(index))
                .with_backends_resolver(|_| Ok(vec![Backend::local("h")])),
        );

        let err = resolve(&cfg, "echo").expect_err("fault");
        assert!(matches!(err, ResolveError::Index(IndexError::Unavailable { .. })));
    }

    #[test]
    fn tool_lookup_fault_is_fatal() {
        let index = ScriptedIndex::new(Err(IndexError::unavailable("db down")), Ok(Vec::new()));
        let cfg = config(
            RunnerBuilder::new()
                .with_index(Arc::new(index))
                .with_tool_resolver(|_| Ok(tool("echo"))),
        );

        assert!(matches!(
            resolve(&cfg, "echo").expect_err("fault"),
            ResolveError::Index(_)
        ));
    }

    #[test]
    fn fallback_resolvers_fill_gaps() {
        let cfg = config(
            RunnerBuilder::new()
                .with_index(Arc::new(InMemoryIndex::new()))
                .with_tool_resolver(|id| Ok(tool(id)))
                .with_backends_resolver(|_| Ok(vec![Backend::provider("p", "t")])),
        );

        let resolved = resolve(&cfg, "dynamic").unwrap();
        assert_eq!(resolved.tool.name(), "dynamic");
        assert_eq!(resolved.backends, vec![Backend::provider("p", "t")]);
    }

    #[test]
    fn resolver_errors_mean_not_found() {
        let cfg = config(
            RunnerBuilder::new()
                .with_index(Arc::new(InMemoryIndex::new()))
                .with_tool_resolver(|_| Err(anyhow!("boom"))),
        );
        let err = resolve(&cfg, "ghost").expect_err("missing");
        assert!(matches!(err, ResolveError::ToolNotFound { source: Some(ref e) } if e.is_not_found()));

        let cfg = config(RunnerBuilder::new());
        assert!(matches!(
            resolve(&cfg, "ghost").expect_err("missing"),
            ResolveError::ToolNotFound { source: None }
        ));
    }

    #[test]
    fn tool_without_backends_is_reported() {
        let cfg = config(
            RunnerBuilder::new()
                .with_tool_resolver(|id| Ok(tool(id)))
                .with_backends_resolver(|_| Err(anyhow!("nothing"))),
        );
        assert!(matches!(
            resolve(&cfg, "lonely").expect_err("no backends"),
            ResolveError::NoBackends
        ));
    }
}
