use std::collections::BTreeMap;
use std::sync::Arc;

use keel_types::{validate_name, EntityDefinition, EntityInfo, Fqn, SchemaRef};
use tracing::{debug, info, warn};

use crate::discovery::{Discovery, EntityWarning};
use crate::domain::DomainObject;
use crate::error::{EntityErrors, RegistryError, RegistryResult};

/// One entity bound to its scope, name prefix and FQN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredEntity {
    fqn: Fqn,
    info: EntityInfo,
}

impl RegisteredEntity {
    fn new(scope: &str, name_prefix: &str, fqn: Fqn, definition: EntityDefinition) -> Self {
        Self {
            fqn,
            info: EntityInfo::new(SchemaRef::new(scope, name_prefix), Arc::new(definition)),
        }
    }

    pub fn fqn(&self) -> &Fqn {
        &self.fqn
    }

    pub fn scope(&self) -> &str {
        self.info.scope()
    }

    pub fn name_prefix(&self) -> &str {
        self.info.name_prefix()
    }

    pub fn definition(&self) -> &EntityDefinition {
        &self.info.definition
    }

    /// Addressing info to pass to a connector.
    pub fn entity_info(&self) -> &EntityInfo {
        &self.info
    }
}

/// Immutable index of registered entities keyed by FQN.
#[derive(Debug, Clone)]
pub struct Registry {
    scope: String,
    name_prefix: String,
    base: Fqn,
    index: BTreeMap<Fqn, RegisteredEntity>,
}

impl Registry {
    /// Build a registry for `scope` and `name_prefix` from everything
    /// `discovery` finds.
    ///
    /// Fails if discovery fails, if any declaration is invalid (all invalid
    /// declarations are reported together), or if two entities share an FQN.
    /// Invalid declarations are reported ahead of a duplicate.
    pub fn new(
        scope: impl Into<String>,
        name_prefix: impl Into<String>,
        discovery: &dyn Discovery,
    ) -> RegistryResult<Self> {
        let scope = scope.into();
        let name_prefix = name_prefix.into();
        validate_name(&scope).map_err(RegistryError::InvalidScope)?;
        let base = Fqn::parse(&name_prefix).map_err(RegistryError::InvalidPrefix)?;

        let found = discovery.discover()?;

        let mut warnings = found.warnings;
        let mut index = BTreeMap::new();
        let mut duplicate = None;
        for def in found.definitions {
            if let Err(e) = def.validate() {
                warnings.push(EntityWarning::new(def.name.clone(), e.to_string()));
                continue;
            }
            let fqn = match base.child(&def.name) {
                Ok(fqn) => fqn,
                Err(e) => {
                    warnings.push(EntityWarning::new(def.name.clone(), e.to_string()));
                    continue;
                }
            };
            if index.contains_key(&fqn) {
                duplicate.get_or_insert(fqn);
                continue;
            }
            debug!(%fqn, "indexed entity");
            let entity = RegisteredEntity::new(&scope, &name_prefix, fqn.clone(), def);
            index.insert(fqn, entity);
        }

        if !warnings.is_empty() {
            for w in &warnings {
                warn!(entity = %w.entity, reason = %w.reason, "invalid entity declaration");
            }
            return Err(RegistryError::InvalidEntities(EntityErrors(warnings)));
        }
        if let Some(fqn) = duplicate {
            return Err(RegistryError::DuplicateEntity { fqn });
        }

        info!(
            scope = %scope,
            prefix = %name_prefix,
            entities = index.len(),
            "registry built"
        );
        Ok(Self {
            scope,
            name_prefix,
            base,
            index,
        })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Look up the registration for a [`DomainObject`] type.
    pub fn find<E: DomainObject>(&self) -> RegistryResult<&RegisteredEntity> {
        self.find_by_name(E::NAME)
    }

    /// Look up the registration for an entity instance.
    pub fn find_entity<E: DomainObject>(&self, _entity: &E) -> RegistryResult<&RegisteredEntity> {
        self.find::<E>()
    }

    /// Look up by structural name.
    pub fn find_by_name(&self, name: &str) -> RegistryResult<&RegisteredEntity> {
        let not_found = || RegistryError::NotFound {
            entity: name.to_string(),
        };
        let fqn = self.base.child(name).map_err(|_| not_found())?;
        self.index.get(&fqn).ok_or_else(not_found)
    }

    /// Every registered entity, ordered by FQN.
    ///
    /// An empty registry is an error: it means discovery found nothing, which
    /// is a configuration problem upstream.
    pub fn find_all(&self) -> RegistryResult<Vec<&RegisteredEntity>> {
        if self.index.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(self.index.values().collect())
    }

    /// Every definition, ordered by FQN, for schema operations.
    pub fn definitions(&self) -> RegistryResult<Vec<EntityDefinition>> {
        Ok(self
            .find_all()?
            .into_iter()
            .map(|re| re.definition().clone())
            .collect())
    }
}
