//! `OverlayApi` implementation: thin delegation into the pipeline
//! submodules.

use async_trait::async_trait;

use overlay_primitives::{MerklePath, Txid};

use crate::domain::{EngineError, LookupAnswer, LookupQuestion, Steak, TaggedBeef};
use crate::ports::{OverlayApi, SteakCallback};

use super::core::OverlayEngine;

#[async_trait]
impl OverlayApi for OverlayEngine {
    async fn submit(
        &self,
        tagged: TaggedBeef,
        on_steak_ready: Option<SteakCallback>,
    ) -> Result<Steak, EngineError> {
        self.submit_inner(tagged, on_steak_ready).await
    }

    async fn lookup(&self, question: &LookupQuestion) -> Result<LookupAnswer, EngineError> {
        self.lookup_inner(question).await
    }

    async fn sync_advertisements(&self) -> Result<(), EngineError> {
        self.sync_advertisements_inner().await
    }

    async fn handle_new_merkle_proof(
        &self,
        txid: &Txid,
        proof: &MerklePath,
    ) -> Result<(), EngineError> {
        self.handle_new_merkle_proof_inner(txid, proof).await
    }

    fn list_topic_managers(&self) -> Vec<String> {
        self.topic_manager_names()
    }

    fn list_lookup_service_providers(&self) -> Vec<String> {
        self.lookup_service_names()
    }

    fn get_documentation_for_topic_manager(&self, name: &str) -> String {
        self.topic_manager_documentation(name)
    }

    fn get_documentation_for_lookup_service_provider(&self, name: &str) -> String {
        self.lookup_service_documentation(name)
    }
}
