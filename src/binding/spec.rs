use crate::binding::InterfaceDescriptor;
use crate::{Error, Result};
use std::collections::HashMap;

/// Immutable pairing of one synchronous and one asynchronous interface
/// descriptor, plus optional sync-to-async routing overrides for facades that
/// fan out to multiple async backends.
///
/// Built once per client type by [`TypePairResolver::resolve`] and owned by
/// the bound client; never mutated after construction.
#[derive(Debug, Clone)]
pub struct ClientBindingSpec {
    sync: InterfaceDescriptor,
    invoker: InterfaceDescriptor,
    sync_to_async: HashMap<String, String>,
}

impl ClientBindingSpec {
    pub fn sync(&self) -> &InterfaceDescriptor {
        &self.sync
    }

    pub fn invoker(&self) -> &InterfaceDescriptor {
        &self.invoker
    }

    /// The async backend type that implements `sync_type`, honoring the
    /// override map before falling back to the paired invoker descriptor.
    pub fn async_backend_for(&self, sync_type: &str) -> &str {
        self.sync_to_async
            .get(sync_type)
            .map(String::as_str)
            .unwrap_or_else(|| self.invoker.type_path())
    }

    pub fn overrides(&self) -> &HashMap<String, String> {
        &self.sync_to_async
    }
}

/// Eager validation of the sync/async descriptor pair.
///
/// Both descriptors must be fully resolved at the point of construction; a
/// descriptor still carrying a type variable fails here, at binding setup,
/// never at first request.
pub struct TypePairResolver;

impl TypePairResolver {
    pub fn resolve(
        sync: InterfaceDescriptor,
        invoker: InterfaceDescriptor,
    ) -> Result<ClientBindingSpec> {
        Self::resolve_with_overrides(sync, invoker, HashMap::new())
    }

    /// As [`resolve`](Self::resolve), with sync-to-async routing overrides.
    pub fn resolve_with_overrides(
        sync: InterfaceDescriptor,
        invoker: InterfaceDescriptor,
        sync_to_async: HashMap<String, String>,
    ) -> Result<ClientBindingSpec> {
        Self::check_bound(&sync)?;
        Self::check_bound(&invoker)?;
        Ok(ClientBindingSpec {
            sync,
            invoker,
            sync_to_async,
        })
    }

    fn check_bound(descriptor: &InterfaceDescriptor) -> Result<()> {
        if let Some(variable) = descriptor.first_unresolved() {
            return Err(Error::UnboundType {
                descriptor: descriptor.to_string(),
                variable: variable.to_string(),
            });
        }
        Ok(())
    }
}
