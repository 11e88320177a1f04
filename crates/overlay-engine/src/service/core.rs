//! Engine state, construction and the lookup-service notification fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use overlay_primitives::{ChainTracker, Outpoint};

use crate::domain::NO_DOCUMENTATION;
use crate::ports::{
    Advertiser, Broadcaster, LookupService, OverlayStorage, PeerTransport, TopicManager,
};

/// Static engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// This node's own public URL; excluded from gossip targets.
    pub hosting_url: Option<String>,
    /// Bootstrap domains always gossiped to when `tm_ship` admits.
    pub ship_tracker_domains: Vec<String>,
    /// Bootstrap domains always gossiped to when `tm_slap` admits.
    pub slap_tracker_domains: Vec<String>,
}

/// The overlay services engine.
///
/// Holds the plug-in capability sets and the storage, chain tracker and
/// transport handles. All state lives behind the ports; the engine itself
/// is immutable after construction and safe to share.
pub struct OverlayEngine {
    pub(crate) managers: HashMap<String, Arc<dyn TopicManager>>,
    pub(crate) lookup_services: HashMap<String, Arc<dyn LookupService>>,
    pub(crate) storage: Arc<dyn OverlayStorage>,
    pub(crate) chain_tracker: Arc<dyn ChainTracker>,
    pub(crate) broadcaster: Option<Arc<dyn Broadcaster>>,
    pub(crate) advertiser: Option<Arc<dyn Advertiser>>,
    pub(crate) peers: Option<Arc<dyn PeerTransport>>,
    pub(crate) config: EngineConfig,
}

impl OverlayEngine {
    /// Starts a builder over the two required capabilities.
    pub fn builder(
        storage: Arc<dyn OverlayStorage>,
        chain_tracker: Arc<dyn ChainTracker>,
    ) -> OverlayEngineBuilder {
        OverlayEngineBuilder {
            managers: HashMap::new(),
            lookup_services: HashMap::new(),
            storage,
            chain_tracker,
            broadcaster: None,
            advertiser: None,
            peers: None,
            config: EngineConfig::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn topic_manager_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.managers.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn lookup_service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lookup_services.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn topic_manager_documentation(&self, name: &str) -> String {
        self.managers
            .get(name)
            .and_then(|manager| manager.documentation())
            .unwrap_or_else(|| NO_DOCUMENTATION.to_string())
    }

    pub(crate) fn lookup_service_documentation(&self, name: &str) -> String {
        self.lookup_services
            .get(name)
            .and_then(|service| service.documentation())
            .unwrap_or_else(|| NO_DOCUMENTATION.to_string())
    }

    /// Fans an admission event out to every lookup service. A failing
    /// hook is logged and must never disturb the pipeline.
    pub(crate) async fn notify_output_added(
        &self,
        outpoint: &Outpoint,
        locking_script: &[u8],
        topic: &str,
    ) {
        for (name, service) in &self.lookup_services {
            if let Err(err) = service.output_added(outpoint, locking_script, topic).await {
                warn!(service = %name, %outpoint, topic, "output-added notification failed: {err}");
            }
        }
    }

    pub(crate) async fn notify_output_spent(&self, outpoint: &Outpoint, topic: &str) {
        for (name, service) in &self.lookup_services {
            if let Err(err) = service.output_spent(outpoint, topic).await {
                warn!(service = %name, %outpoint, topic, "output-spent notification failed: {err}");
            }
        }
    }

    pub(crate) async fn notify_output_deleted(&self, outpoint: &Outpoint, topic: &str) {
        for (name, service) in &self.lookup_services {
            if let Err(err) = service.output_deleted(outpoint, topic).await {
                warn!(service = %name, %outpoint, topic, "output-deleted notification failed: {err}");
            }
        }
    }
}

/// Builder assembling an engine from its capabilities.
pub struct OverlayEngineBuilder {
    managers: HashMap<String, Arc<dyn TopicManager>>,
    lookup_services: HashMap<String, Arc<dyn LookupService>>,
    storage: Arc<dyn OverlayStorage>,
    chain_tracker: Arc<dyn ChainTracker>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    advertiser: Option<Arc<dyn Advertiser>>,
    peers: Option<Arc<dyn PeerTransport>>,
    config: EngineConfig,
}

impl OverlayEngineBuilder {
    /// Registers a topic manager under its topic name.
    pub fn with_topic_manager(
        mut self,
        topic: impl Into<String>,
        manager: Arc<dyn TopicManager>,
    ) -> Self {
        self.managers.insert(topic.into(), manager);
        self
    }

    /// Registers a lookup service under its service name.
    pub fn with_lookup_service(
        mut self,
        service_name: impl Into<String>,
        service: Arc<dyn LookupService>,
    ) -> Self {
        self.lookup_services.insert(service_name.into(), service);
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn with_advertiser(mut self, advertiser: Arc<dyn Advertiser>) -> Self {
        self.advertiser = Some(advertiser);
        self
    }

    pub fn with_peer_transport(mut self, peers: Arc<dyn PeerTransport>) -> Self {
        self.peers = Some(peers);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> OverlayEngine {
        OverlayEngine {
            managers: self.managers,
            lookup_services: self.lookup_services,
            storage: self.storage,
            chain_tracker: self.chain_tracker,
            broadcaster: self.broadcaster,
            advertiser: self.advertiser,
            peers: self.peers,
            config: self.config,
        }
    }
}
