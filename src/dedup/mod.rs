//! Candidate matching and merge semantics.

pub mod memory_store;
pub mod sqlite_store;
pub mod store;

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::domain::{CloudContext, NetworkInterface, Software, UnifiedHost, now_iso8601};
use crate::error::StoreError;
use store::{AssetStore, StoredHost};

/// Strict threshold: a highest score of exactly 45 is not confident enough
/// to merge. Any single strong identifier match clears it.
const CONFIDENCE_THRESHOLD: u32 = 45;

const WEIGHT_MAC: u32 = 50;
const WEIGHT_CLOUD_INSTANCE_ID: u32 = 50;
const WEIGHT_HOSTNAME: u32 = 15;
const WEIGHT_PRIVATE_IP: u32 = 10;
const WEIGHT_PUBLIC_IP: u32 = 10;

/// Scores `incoming` against `candidate` per the additive weight table.
fn score(incoming: &UnifiedHost, candidate: &UnifiedHost) -> u32 {
    let mut total = 0;
    if fields_match(&incoming.primary_mac_address, &candidate.primary_mac_address) {
        total += WEIGHT_MAC;
    }
    if fields_match(&incoming.cloud_instance_id, &candidate.cloud_instance_id) {
        total += WEIGHT_CLOUD_INSTANCE_ID;
    }
    if fields_match(&incoming.hostname, &candidate.hostname) {
        total += WEIGHT_HOSTNAME;
    }
    if fields_match(&incoming.private_ip, &candidate.private_ip) {
        total += WEIGHT_PRIVATE_IP;
    }
    if fields_match(&incoming.public_ip, &candidate.public_ip) {
        total += WEIGHT_PUBLIC_IP;
    }
    total
}

fn fields_match(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

/// Picks the highest-scoring candidate, breaking ties by store iteration
/// order (first one wins, since `candidates` preserves that order).
fn best_candidate(incoming: &UnifiedHost, candidates: &[StoredHost]) -> Option<(usize, u32)> {
    let mut best: Option<(usize, u32)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let candidate_score = score(incoming, &candidate.host);
        if best.is_none_or(|(_, top)| candidate_score > top) {
            best = Some((idx, candidate_score));
        }
    }
    best
}

fn merge_scalar(stored: Option<String>, incoming: Option<String>) -> Option<String> {
    incoming.or(stored)
}

fn strip_source(interfaces: Vec<NetworkInterface>, incoming_source: crate::domain::SourceTag) -> Vec<NetworkInterface> {
    interfaces
        .into_iter()
        .filter(|iface| !iface.sources.contains(&incoming_source))
        .collect()
}

/// Merges `incoming` network interfaces into `stored`: stored
/// interfaces carrying the incoming source are dropped first, then incoming
/// interfaces merge by MAC or append.
fn merge_network_interfaces(
    stored: Vec<NetworkInterface>,
    incoming: Vec<NetworkInterface>,
    incoming_source: crate::domain::SourceTag,
) -> Vec<NetworkInterface> {
    let mut result = strip_source(stored, incoming_source);
    for inc in incoming {
        if let Some(mac) = &inc.mac_address {
            if let Some(existing) = result.iter_mut().find(|i| i.mac_address.as_ref() == Some(mac)) {
                existing.sources.extend(inc.sources.iter().copied());
                existing.private_ip_v4 = inc.private_ip_v4.or_else(|| existing.private_ip_v4.clone());
                existing.public_ip_v4 = inc.public_ip_v4.or_else(|| existing.public_ip_v4.clone());
                existing.ip_v6 = inc.ip_v6.or_else(|| existing.ip_v6.clone());
                continue;
            }
        }
        result.push(inc);
    }
    result
}

fn strip_software_source(software: Vec<Software>, incoming_source: crate::domain::SourceTag) -> Vec<Software> {
    software
        .into_iter()
        .filter(|sw| !sw.sources.contains(&incoming_source))
        .collect()
}

/// Merges `incoming` software into `stored`, keyed by `(product, version)`.
/// Vendor is excluded from the identity key because not every source
/// reports it (Qualys never does, Tenable derives it from a CPE string) —
/// two sources naming the same product and version are the same entry even
/// when only one of them can name the vendor.
fn merge_software(
    stored: Vec<Software>,
    incoming: Vec<Software>,
    incoming_source: crate::domain::SourceTag,
) -> Vec<Software> {
    let mut result = strip_software_source(stored, incoming_source);
    for inc in incoming {
        let key = (inc.product.clone(), inc.version.clone());
        if let Some(existing) = result
            .iter_mut()
            .find(|sw| (sw.product.clone(), sw.version.clone()) == key)
        {
            existing.vendor = existing.vendor.clone().or_else(|| inc.vendor.clone());
            existing.sources.extend(inc.sources.iter().copied());
        } else {
            result.push(inc);
        }
    }
    result
}

fn merge_cloud_context(stored: Option<CloudContext>, incoming: Option<CloudContext>) -> Option<CloudContext> {
    match (stored, incoming) {
        (Some(stored), Some(incoming)) => Some(stored.merged_with(&incoming)),
        (Some(stored), None) => Some(stored),
        (None, Some(incoming)) => Some(incoming),
        (None, None) => None,
    }
}

/// Merges `incoming` into `stored` in place, per every field's merge rule.
fn merge_into(stored: &mut UnifiedHost, incoming: UnifiedHost) {
    let incoming_source = incoming.incoming_source_tag();

    stored.hostname = merge_scalar(stored.hostname.take(), incoming.hostname);
    stored.os_name = merge_scalar(stored.os_name.take(), incoming.os_name);
    stored.os_platform = merge_scalar(stored.os_platform.take(), incoming.os_platform);
    stored.kernel_version = merge_scalar(stored.kernel_version.take(), incoming.kernel_version);
    stored.manufacturer = merge_scalar(stored.manufacturer.take(), incoming.manufacturer);
    stored.product_model = merge_scalar(stored.product_model.take(), incoming.product_model);
    stored.processor_info = merge_scalar(stored.processor_info.take(), incoming.processor_info);
    stored.public_ip = merge_scalar(stored.public_ip.take(), incoming.public_ip);
    stored.private_ip = merge_scalar(stored.private_ip.take(), incoming.private_ip);
    stored.last_boot_timestamp = merge_scalar(stored.last_boot_timestamp.take(), incoming.last_boot_timestamp);
    stored.default_gateway = merge_scalar(stored.default_gateway.take(), incoming.default_gateway);

    // cloud_instance_id and primary_mac_address are the strong identifiers
    // themselves; treat them as scalars too so a later observation can fill
    // in a field the first observation left null.
    stored.cloud_instance_id = merge_scalar(stored.cloud_instance_id.take(), incoming.cloud_instance_id);
    stored.primary_mac_address = merge_scalar(stored.primary_mac_address.take(), incoming.primary_mac_address);

    for (key, value) in incoming.source_ids {
        stored.source_ids.insert(key, value);
    }

    stored.network_interfaces = merge_network_interfaces(
        std::mem::take(&mut stored.network_interfaces),
        incoming.network_interfaces,
        incoming_source,
    );
    stored.installed_software = merge_software(
        std::mem::take(&mut stored.installed_software),
        incoming.installed_software,
        incoming_source,
    );
    stored.cloud_context = merge_cloud_context(stored.cloud_context.take(), incoming.cloud_context);

    if incoming.qualys_security.is_some() {
        stored.qualys_security = incoming.qualys_security;
    }
    if incoming.crowdstrike_security.is_some() {
        stored.crowdstrike_security = incoming.crowdstrike_security;
    }
    if incoming.tenable_security.is_some() {
        stored.tenable_security = incoming.tenable_security;
    }

    stored.record_last_updated_at = now_iso8601();
}

/// Set-valued of distinct `(product, version)` keys, used by tests that want
/// to assert on software identity rather than source sets.
#[must_use]
pub fn software_keys(software: &[Software]) -> BTreeSet<(String, Option<String>)> {
    software.iter().map(|sw| (sw.product.clone(), sw.version.clone())).collect()
}

/// Matches incoming canonical hosts against a store and merges or inserts
/// them end to end.
pub struct Deduplicator<S: AssetStore> {
    store: S,
}

impl<S: AssetStore> Deduplicator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        self.store.ensure_indexes().await
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upserts `incoming`: merges into the highest-scoring candidate above
    /// threshold, else inserts as new.
    pub async fn upsert_host(&self, incoming: UnifiedHost) -> Result<(), StoreError> {
        let candidates = self.store.find_candidates(&incoming).await?;

        if candidates.is_empty() {
            debug!(hostname = ?incoming.hostname, "no candidates, inserting new record");
            let id = self.store.insert(incoming).await?;
            info!(id, "inserted new unified host");
            return Ok(());
        }

        for candidate in &candidates {
            let candidate_score = score(&incoming, &candidate.host);
            debug!(
                candidate_id = candidate.id,
                score = candidate_score,
                "scored candidate"
            );
        }

        match best_candidate(&incoming, &candidates) {
            Some((idx, candidate_score)) if candidate_score > CONFIDENCE_THRESHOLD => {
                let mut target = candidates[idx].host.clone();
                let target_id = candidates[idx].id.clone();
                merge_into(&mut target, incoming);
                self.store.replace(&target_id, target).await?;
                info!(id = target_id, score = candidate_score, "merged into existing unified host");
            }
            _ => {
                let id = self.store.insert(incoming).await?;
                info!(id, "no candidate cleared confidence threshold, inserted new unified host");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::memory_store::InMemoryAssetStore;
    use super::*;
    use crate::domain::SourceTag;

    fn host(source_id_key: &str, source_id: &str) -> UnifiedHost {
        UnifiedHost {
            source_ids: [(source_id_key.to_owned(), source_id.to_owned())].into(),
            ..UnifiedHost::default()
        }
    }

    #[tokio::test]
    async fn inserts_when_no_identifiers_present() {
        let dedup = Deduplicator::new(InMemoryAssetStore::new());
        dedup.upsert_host(host("qualys_id", "1")).await.unwrap();
        dedup.upsert_host(host("qualys_id", "2")).await.unwrap();
        assert_eq!(dedup.store().all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn merges_on_matching_mac() {
        let dedup = Deduplicator::new(InMemoryAssetStore::new());
        let mut first = host("qualys_id", "1");
        first.primary_mac_address = Some("AA:BB".to_owned());
        first.hostname = Some("box-1".to_owned());
        dedup.upsert_host(first).await.unwrap();

        let mut second = host("crowdstrike_id", "2");
        second.primary_mac_address = Some("AA:BB".to_owned());
        dedup.upsert_host(second).await.unwrap();

        let all = dedup.store().all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].host.hostname.as_deref(), Some("box-1"));
        assert!(all[0].host.source_ids.contains_key("qualys_id"));
        assert!(all[0].host.source_ids.contains_key("crowdstrike_id"));
    }

    #[tokio::test]
    async fn hostname_alone_is_below_threshold() {
        let dedup = Deduplicator::new(InMemoryAssetStore::new());
        let mut first = host("qualys_id", "1");
        first.hostname = Some("box-1".to_owned());
        dedup.upsert_host(first).await.unwrap();

        let mut second = host("crowdstrike_id", "2");
        second.hostname = Some("box-1".to_owned());
        dedup.upsert_host(second).await.unwrap();

        assert_eq!(dedup.store().all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn hostname_plus_private_and_public_ip_is_still_below_threshold() {
        let dedup = Deduplicator::new(InMemoryAssetStore::new());
        let mut first = host("qualys_id", "1");
        first.hostname = Some("box-1".to_owned());
        first.private_ip = Some("10.0.0.5".to_owned());
        first.public_ip = Some("8.8.8.8".to_owned());
        dedup.upsert_host(first).await.unwrap();

        let mut second = host("crowdstrike_id", "2");
        second.hostname = Some("box-1".to_owned());
        second.private_ip = Some("10.0.0.5".to_owned());
        second.public_ip = Some("8.8.8.8".to_owned());
        dedup.upsert_host(second).await.unwrap();

        // 15 + 10 + 10 = 35, below the strict 45 threshold.
        assert_eq!(dedup.store().all().await.unwrap().len(), 2);
    }

    #[test]
    fn network_interfaces_strip_incoming_source_then_merge_by_mac() {
        let stored = vec![NetworkInterface {
            mac_address: Some("AA:BB".to_owned()),
            private_ip_v4: Some("10.0.0.1".to_owned()),
            sources: BTreeSet::from([SourceTag::Qualys]),
            ..NetworkInterface::default()
        }];
        let incoming = vec![NetworkInterface {
            mac_address: Some("AA:BB".to_owned()),
            public_ip_v4: Some("8.8.8.8".to_owned()),
            sources: BTreeSet::from([SourceTag::CrowdStrike]),
            ..NetworkInterface::default()
        }];
        let merged = merge_network_interfaces(stored, incoming, SourceTag::CrowdStrike);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].private_ip_v4.as_deref(), Some("10.0.0.1"));
        assert_eq!(merged[0].public_ip_v4.as_deref(), Some("8.8.8.8"));
        assert!(merged[0].sources.contains(&SourceTag::Qualys));
        assert!(merged[0].sources.contains(&SourceTag::CrowdStrike));
    }

    #[test]
    fn resubmitting_same_source_replaces_that_sources_interfaces() {
        let stored = vec![NetworkInterface {
            mac_address: Some("AA:BB".to_owned()),
            private_ip_v4: Some("10.0.0.1".to_owned()),
            sources: BTreeSet::from([SourceTag::Qualys]),
            ..NetworkInterface::default()
        }];
        let incoming = vec![NetworkInterface {
            mac_address: Some("CC:DD".to_owned()),
            sources: BTreeSet::from([SourceTag::Qualys]),
            ..NetworkInterface::default()
        }];
        let merged = merge_network_interfaces(stored, incoming, SourceTag::Qualys);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].mac_address.as_deref(), Some("CC:DD"));
    }

    #[test]
    fn software_merges_on_product_and_version_filling_in_missing_vendor() {
        let stored = vec![Software {
            vendor: None,
            product: "nginx".to_owned(),
            version: Some("1.18".to_owned()),
            sources: BTreeSet::from([SourceTag::Qualys]),
        }];
        let incoming = vec![Software {
            vendor: Some("igor_sysoev".to_owned()),
            product: "nginx".to_owned(),
            version: Some("1.18".to_owned()),
            sources: BTreeSet::from([SourceTag::Tenable]),
        }];
        let merged = merge_software(stored, incoming, SourceTag::Tenable);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].vendor.as_deref(), Some("igor_sysoev"));
        assert_eq!(merged[0].sources.len(), 2);
    }
}
