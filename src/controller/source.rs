//! Autoscaler snapshot sources
//!
//! A source lists every HorizontalPodAutoscaler in the cluster and
//! normalizes it. Autoscalers that fail normalization stay in the listing as
//! [`ListedAutoscaler::Malformed`] so that consumers can tell "skipped this
//! tick" apart from "gone from the cluster". Only a failed list call fails
//! the whole fetch.

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::autoscaling::{v1, v2};
use kube::{
    api::{Api, ListParams},
    client::Client,
    Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};

use crate::autoscaler::{AutoscalerConditions, AutoscalerKey, AutoscalerSnapshot, Condition};
use crate::config::ApiVersion;
use crate::error::{Error, Result};

/// One autoscaler returned by a list call
#[derive(Clone, Debug, PartialEq)]
pub enum ListedAutoscaler {
    Normalized(AutoscalerSnapshot),
    /// Present in the cluster but its payload could not be normalized.
    /// `conditions` is set when the conditions alone still decode.
    Malformed {
        key: AutoscalerKey,
        conditions: Option<Vec<Condition>>,
    },
}

impl ListedAutoscaler {
    pub fn key(&self) -> AutoscalerKey {
        match self {
            ListedAutoscaler::Normalized(snapshot) => snapshot.key(),
            ListedAutoscaler::Malformed { key, .. } => key.clone(),
        }
    }
}

/// Every autoscaler of one list call, in API order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutoscalerListing {
    pub items: Vec<ListedAutoscaler>,
}

impl AutoscalerListing {
    /// Autoscalers that normalized cleanly
    pub fn snapshots(&self) -> impl Iterator<Item = &AutoscalerSnapshot> {
        self.items.iter().filter_map(|item| match item {
            ListedAutoscaler::Normalized(snapshot) => Some(snapshot),
            ListedAutoscaler::Malformed { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<AutoscalerSnapshot>> for AutoscalerListing {
    fn from(snapshots: Vec<AutoscalerSnapshot>) -> Self {
        Self {
            items: snapshots.into_iter().map(ListedAutoscaler::Normalized).collect(),
        }
    }
}

/// Anything that can produce the current set of autoscalers
#[async_trait]
pub trait AutoscalerSource: Send + Sync {
    /// List all autoscalers across all namespaces
    async fn list_autoscalers(&self) -> Result<AutoscalerListing>;
}

/// Source backed by the Kubernetes API
pub struct KubeSource {
    client: Client,
    api_version: ApiVersion,
}

impl KubeSource {
    pub fn new(client: Client, api_version: ApiVersion) -> Self {
        Self {
            client,
            api_version,
        }
    }

    async fn list_as<K>(&self) -> Result<AutoscalerListing>
    where
        K: Resource + AutoscalerConditions + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
        for<'a> AutoscalerSnapshot: TryFrom<&'a K, Error = Error>,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(Error::KubeError)?;

        Ok(normalize_all(&list.items))
    }
}

/// Normalize every object, marking the ones with malformed payloads
pub fn normalize_all<K>(items: &[K]) -> AutoscalerListing
where
    K: Resource + AutoscalerConditions,
    for<'a> AutoscalerSnapshot: TryFrom<&'a K, Error = Error>,
{
    let items = items
        .iter()
        .map(|item| match AutoscalerSnapshot::try_from(item) {
            Ok(snapshot) => ListedAutoscaler::Normalized(snapshot),
            Err(e) => {
                if e.is_per_entity() {
                    warn!(
                        name = %item.name_any(),
                        namespace = ?item.namespace(),
                        "skipping autoscaler: {}",
                        e
                    );
                } else {
                    error!(name = %item.name_any(), "failed to normalize autoscaler: {}", e);
                }
                ListedAutoscaler::Malformed {
                    key: AutoscalerKey {
                        namespace: item.namespace().unwrap_or_default(),
                        name: item.name_any(),
                    },
                    conditions: item.autoscaler_conditions().ok(),
                }
            }
        })
        .collect();

    AutoscalerListing { items }
}

#[async_trait]
impl AutoscalerSource for KubeSource {
    #[instrument(skip(self), fields(api_version = ?self.api_version))]
    async fn list_autoscalers(&self) -> Result<AutoscalerListing> {
        let listing = match self.api_version {
            ApiVersion::V1 => self.list_as::<v1::HorizontalPodAutoscaler>().await?,
            ApiVersion::V2 => self.list_as::<v2::HorizontalPodAutoscaler>().await?,
        };
        debug!(count = listing.len(), "listed autoscalers");
        Ok(listing)
    }
}
