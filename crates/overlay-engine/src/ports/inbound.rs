//! Inbound port: the engine surface.

use async_trait::async_trait;

use overlay_primitives::{MerklePath, Txid};

use crate::domain::{EngineError, LookupAnswer, LookupQuestion, Steak, TaggedBeef};

/// Callback fired with the STEAK as soon as per-topic processing is done,
/// before broadcast and peer gossip begin.
pub type SteakCallback = Box<dyn FnOnce(&Steak) + Send>;

/// Primary API of the overlay services engine.
#[async_trait]
pub trait OverlayApi: Send + Sync {
    /// Runs the admission pipeline for every tagged topic.
    ///
    /// # Errors
    /// - `UnknownTopic`: a tagged topic has no registered manager.
    /// - `SpvInvalid`: the envelope failed SPV verification.
    /// - `Beef`: the envelope is malformed.
    ///
    /// Per-topic manager failures do not error; they yield an empty STEAK
    /// entry for that topic.
    async fn submit(
        &self,
        tagged: TaggedBeef,
        on_steak_ready: Option<SteakCallback>,
    ) -> Result<Steak, EngineError>;

    /// Answers a question via the named lookup service, hydrating any
    /// returned formula into an output list.
    ///
    /// # Errors
    /// - `UnknownService`: no service registered under that name.
    /// - `HistoryRehydration`: an output's envelope could not be rebuilt.
    async fn lookup(&self, question: &LookupQuestion) -> Result<LookupAnswer, EngineError>;

    /// Reconciles configured topics and services against the existing
    /// SHIP/SLAP advertisements, minting and revoking as needed.
    async fn sync_advertisements(&self) -> Result<(), EngineError>;

    /// Embeds a newly arrived Merkle proof into every output whose
    /// envelope transitively contains `txid`.
    ///
    /// # Errors
    /// - `NoMatchingOutputs`: no stored output was created by `txid`.
    async fn handle_new_merkle_proof(
        &self,
        txid: &Txid,
        proof: &MerklePath,
    ) -> Result<(), EngineError>;

    /// Names of the configured topic managers.
    fn list_topic_managers(&self) -> Vec<String>;

    /// Names of the configured lookup services.
    fn list_lookup_service_providers(&self) -> Vec<String>;

    /// Documentation for a topic manager, or a fixed placeholder when the
    /// manager is unknown or undocumented.
    fn get_documentation_for_topic_manager(&self, name: &str) -> String;

    /// Documentation for a lookup service, or a fixed placeholder when
    /// the service is unknown or undocumented.
    fn get_documentation_for_lookup_service_provider(&self, name: &str) -> String;
}
