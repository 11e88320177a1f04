//! Advertisement reconciliation.
//!
//! Idempotent: the required SHIP topics are the configured managers, the
//! required SLAP services are the configured lookup services. Missing
//! ones are minted and self-submitted; advertisements for topics or
//! services no longer configured are revoked. A single failing item is
//! logged and skipped.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::domain::{Advertisement, EngineError};

use super::core::OverlayEngine;

impl OverlayEngine {
    pub(crate) async fn sync_advertisements_inner(&self) -> Result<(), EngineError> {
        let Some(advertiser) = self.advertiser.clone() else {
            return Ok(());
        };

        let required_topics: BTreeSet<&str> =
            self.managers.keys().map(String::as_str).collect();
        let required_services: BTreeSet<&str> =
            self.lookup_services.keys().map(String::as_str).collect();

        let current_ship = advertiser
            .find_all_ship_advertisements()
            .await
            .map_err(EngineError::Advertiser)?;
        let current_slap = advertiser
            .find_all_slap_advertisements()
            .await
            .map_err(EngineError::Advertiser)?;

        // Mint what's missing.
        for topic in required_topics
            .iter()
            .filter(|topic| !current_ship.iter().any(|ad| ad.topic == **topic))
        {
            match advertiser.create_ship_advertisement(topic).await {
                Ok(tagged) => {
                    info!(topic, "advertising topic over SHIP");
                    if let Err(err) = self.submit_inner(tagged, None).await {
                        warn!(topic, "failed to submit SHIP advertisement: {err}");
                    }
                }
                Err(err) => warn!(topic, "failed to mint SHIP advertisement: {err}"),
            }
        }
        for service in required_services
            .iter()
            .filter(|service| !current_slap.iter().any(|ad| ad.service == **service))
        {
            match advertiser.create_slap_advertisement(service).await {
                Ok(tagged) => {
                    info!(service, "advertising lookup service over SLAP");
                    if let Err(err) = self.submit_inner(tagged, None).await {
                        warn!(service, "failed to submit SLAP advertisement: {err}");
                    }
                }
                Err(err) => warn!(service, "failed to mint SLAP advertisement: {err}"),
            }
        }

        // Revoke what's no longer configured.
        for ad in current_ship
            .into_iter()
            .filter(|ad| !required_topics.contains(ad.topic.as_str()))
        {
            let topic = ad.topic.clone();
            match advertiser
                .revoke_advertisement(&Advertisement::Ship(ad))
                .await
            {
                Ok(tagged) => {
                    info!(topic, "revoking stale SHIP advertisement");
                    if let Err(err) = self.submit_inner(tagged, None).await {
                        warn!(topic, "failed to submit SHIP revocation: {err}");
                    }
                }
                Err(err) => warn!(topic, "failed to mint SHIP revocation: {err}"),
            }
        }
        for ad in current_slap
            .into_iter()
            .filter(|ad| !required_services.contains(ad.service.as_str()))
        {
            let service = ad.service.clone();
            match advertiser
                .revoke_advertisement(&Advertisement::Slap(ad))
                .await
            {
                Ok(tagged) => {
                    info!(service, "revoking stale SLAP advertisement");
                    if let Err(err) = self.submit_inner(tagged, None).await {
                        warn!(service, "failed to submit SLAP revocation: {err}");
                    }
                }
                Err(err) => warn!(service, "failed to mint SLAP revocation: {err}"),
            }
        }

        Ok(())
    }
}
