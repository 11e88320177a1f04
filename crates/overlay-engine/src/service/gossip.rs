//! Peer propagation: derive the gossip target set from SHIP
//! advertisements plus the bootstrap trackers, then fan the envelope out.
//!
//! Everything here is best-effort. A failed SHIP lookup, an unparseable
//! advertisement or an unreachable peer is logged and skipped; gossip
//! never surfaces an error to the submitter.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;
use tracing::{debug, warn};

use overlay_primitives::Beef;

use crate::domain::{
    Advertisement, LookupAnswer, LookupQuestion, Steak, TaggedBeef, SERVICE_SHIP, TOPIC_SHIP,
    TOPIC_SLAP,
};

use super::core::OverlayEngine;

impl OverlayEngine {
    pub(crate) async fn propagate_to_peers(&self, tagged: &TaggedBeef, steak: &Steak) {
        let relevant: BTreeSet<&str> = steak
            .iter()
            .filter(|(_, entry)| !entry.outputs_to_admit.is_empty())
            .map(|(topic, _)| topic.as_str())
            .collect();
        if relevant.is_empty() {
            return;
        }
        let Some(advertiser) = &self.advertiser else {
            return;
        };
        let Some(peers) = &self.peers else {
            return;
        };

        let mut domain_topics: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        // Peers advertising a relevant topic over SHIP.
        for topic in &relevant {
            let question = LookupQuestion {
                service: SERVICE_SHIP.to_string(),
                query: json!({ "topic": topic }),
            };
            let answer = match self.lookup_inner(&question).await {
                Ok(answer) => answer,
                Err(err) => {
                    debug!(topic, "SHIP lookup unavailable: {err}");
                    continue;
                }
            };
            let LookupAnswer::OutputList { outputs } = answer else {
                continue;
            };
            for item in outputs {
                let Some(script) = advertised_script(&item.beef, item.output_index) else {
                    debug!(topic, "skipping undecodable SHIP output");
                    continue;
                };
                match advertiser.parse_advertisement(&script) {
                    Some(Advertisement::Ship(ad)) => {
                        domain_topics
                            .entry(ad.domain)
                            .or_default()
                            .insert((*topic).to_string());
                    }
                    _ => debug!(topic, "skipping non-SHIP advertisement output"),
                }
            }
        }

        // Bootstrap trackers for the reserved advertisement topics.
        if relevant.contains(TOPIC_SHIP) {
            for domain in &self.config.ship_tracker_domains {
                domain_topics
                    .entry(domain.clone())
                    .or_default()
                    .insert(TOPIC_SHIP.to_string());
            }
        }
        if relevant.contains(TOPIC_SLAP) {
            for domain in &self.config.slap_tracker_domains {
                domain_topics
                    .entry(domain.clone())
                    .or_default()
                    .insert(TOPIC_SLAP.to_string());
            }
        }

        // Never gossip to ourselves.
        if let Some(own) = &self.config.hosting_url {
            domain_topics.remove(own);
        }

        for (domain, topics) in domain_topics {
            let topics: Vec<String> = topics.into_iter().collect();
            match peers.submit(&domain, &tagged.beef, &topics).await {
                Ok(()) => debug!(domain, ?topics, "gossiped submission to peer"),
                Err(err) => warn!(domain, "peer gossip failed: {err}"),
            }
        }
    }
}

/// Pulls the locking script of one output out of an envelope.
fn advertised_script(beef: &[u8], output_index: u32) -> Option<Vec<u8>> {
    let tx = Beef::from_binary(beef).ok()?.subject().ok()?;
    tx.outputs
        .get(output_index as usize)
        .map(|output| output.locking_script.clone())
}
