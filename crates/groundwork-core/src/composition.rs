//! The composition graph: a set of resource specifications with derived
//! dependency edges and a deterministic provisioning order.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::id::{LogicalId, ResourceRef};
use crate::resource::ResourceProps;

/// One declared resource: identity plus typed properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSpec {
    pub id: LogicalId,
    pub props: ResourceProps,
}

/// A coherent set of resource specifications forming a DAG.
///
/// Registration order doubles as a valid provisioning order because every
/// reference must name an already-registered resource; [`Composition::ordered`]
/// still re-derives the order from the data so the engine never trusts
/// insertion order alone.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Composition {
    resources: Vec<ResourceSpec>,
    #[serde(skip)]
    index: HashMap<LogicalId, usize>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource specification.
    ///
    /// Re-adding an identical spec under the same id is a no-op returning the
    /// same ref, so repeated composition of the same sources stays idempotent.
    /// A differing spec under an existing id is a conflict. Every reference
    /// inside `props` must already be registered; requesting an output from a
    /// not-yet-created dependency fails here, at composition-build time.
    pub fn add<T>(&mut self, id: LogicalId, props: T) -> Result<ResourceRef<T>>
    where
        T: Into<ResourceProps>,
    {
        let props = props.into();
        props.validate()?;

        if let Some(existing) = self.get(&id) {
            if existing.props == props {
                return Ok(ResourceRef::new(id));
            }
            return Err(Error::Conflict(format!(
                "resource {id} already declared with different properties"
            )));
        }

        for referenced in props.references() {
            if !self.index.contains_key(&referenced) {
                return Err(Error::DependencyOrdering {
                    resource: id,
                    missing: referenced,
                });
            }
        }

        self.index.insert(id.clone(), self.resources.len());
        self.resources.push(ResourceSpec {
            id: id.clone(),
            props,
        });
        Ok(ResourceRef::new(id))
    }

    pub fn get(&self, id: &LogicalId) -> Option<&ResourceSpec> {
        self.index.get(id).map(|&i| &self.resources[i])
    }

    pub fn contains(&self, id: &LogicalId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceSpec> {
        self.resources.iter()
    }

    /// Topological provisioning order, dependencies first.
    ///
    /// Cycles cannot be built through [`add`](Self::add), but the sort still
    /// detects them so the engine fails loudly instead of looping if that
    /// invariant is ever broken.
    pub fn ordered(&self) -> Result<Vec<LogicalId>> {
        let mut order = Vec::with_capacity(self.resources.len());
        let mut state: HashMap<&LogicalId, VisitState> = HashMap::new();

        for spec in &self.resources {
            self.visit(&spec.id, &mut state, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        id: &'a LogicalId,
        state: &mut HashMap<&'a LogicalId, VisitState>,
        order: &mut Vec<LogicalId>,
    ) -> Result<()> {
        match state.get(id) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => {
                return Err(Error::CycleDetected(id.to_string()));
            }
            None => {}
        }
        state.insert(id, VisitState::InProgress);

        let spec = self.get(id).ok_or_else(|| Error::DependencyOrdering {
            resource: id.clone(),
            missing: id.clone(),
        })?;
        for dep in spec.props.references() {
            let dep_spec = self.get(&dep).ok_or_else(|| Error::DependencyOrdering {
                resource: id.clone(),
                missing: dep.clone(),
            })?;
            self.visit(&dep_spec.id, state, order)?;
        }

        state.insert(id, VisitState::Done);
        order.push(id.clone());
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum VisitState {
    InProgress,
    Done,
}
