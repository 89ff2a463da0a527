//! Kernel source awaiting a build.

use std::sync::Arc;

use kiln_common::Dialect;
use kiln_runtime::Context;

/// Source text of one dialect, bound to the context it will be built for.
///
/// Immutable once created; clones share the source bytes.
#[derive(Clone, Debug)]
pub struct SourceBundle {
    context: Context,
    dialect: Dialect,
    source: Arc<[u8]>,
}

impl SourceBundle {
    /// Creates a bundle from source bytes.
    pub fn new(context: &Context, dialect: Dialect, source: impl Into<Vec<u8>>) -> Self {
        Self {
            context: context.clone(),
            dialect,
            source: Arc::from(source.into()),
        }
    }

    /// The owning context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The declared dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The source bytes.
    pub fn source(&self) -> &[u8] {
        &self.source
    }
}
