//! Read facade over a set of named models.
//!
//! | Operation | Triggers updater | Result |
//! |-----------|------------------|--------|
//! | [`Provider::model_names`] | no | sorted model names |
//! | [`Provider::model`] / [`Provider::models`] | no | structural [`ModelDesc`] |
//! | [`Provider::data_point`] / [`Provider::data_points`] | yes, scoped to the requested roots | computed [`Point`] |

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::node::NodeRef;
use crate::{Meta, Point, ProviderError, Updater};

/// Structural description of a node and its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDesc {
    pub meta: Meta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelDesc>,
}

impl ModelDesc {
    pub fn describe(node: &NodeRef) -> Self {
        Self {
            meta: node.meta(),
            models: node.nodes().iter().map(Self::describe).collect(),
        }
    }
}

/// Named model roots plus an optional updater that refreshes them on read.
pub struct Provider {
    models: BTreeMap<String, NodeRef>,
    updater: Option<Updater>,
}

impl Provider {
    pub fn new(models: HashMap<String, NodeRef>, updater: Option<Updater>) -> Self {
        Self {
            models: models.into_iter().collect(),
            updater,
        }
    }

    pub fn updater(&self) -> Option<&Updater> {
        self.updater.as_ref()
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    pub fn model(&self, name: &str) -> Result<ModelDesc, ProviderError> {
        self.root(name).map(ModelDesc::describe)
    }

    pub fn models<S: AsRef<str>>(&self, names: &[S]) -> Result<BTreeMap<String, ModelDesc>, ProviderError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.model(name).map(|desc| (name.to_owned(), desc))
            })
            .collect()
    }

    /// Refresh the model's stale origins, then compute its point.
    pub async fn data_point(&self, cancel: &CancellationToken, name: &str) -> Result<Point, ProviderError> {
        let root = Arc::clone(self.root(name)?);
        self.refresh(cancel, std::slice::from_ref(&root)).await;
        Ok(root.data_point())
    }

    /// Like [`data_point`](Self::data_point) for several models sharing one
    /// update pass. Fails before fetching anything if any name is unknown.
    pub async fn data_points<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        names: &[S],
    ) -> Result<BTreeMap<String, Point>, ProviderError> {
        let roots = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.root(name).map(|root| (name.to_owned(), Arc::clone(root)))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let graphs = roots.values().cloned().collect::<Vec<_>>();
        self.refresh(cancel, &graphs).await;

        Ok(roots
            .into_iter()
            .map(|(name, root)| (name, root.data_point()))
            .collect())
    }

    fn root(&self, name: &str) -> Result<&NodeRef, ProviderError> {
        self.models
            .get(name)
            .ok_or_else(|| ProviderError::ModelNotFound {
                name: name.to_owned(),
            })
    }

    async fn refresh(&self, cancel: &CancellationToken, graphs: &[NodeRef]) {
        if let Some(updater) = &self.updater {
            updater.update(cancel, graphs).await;
        }
    }
}
