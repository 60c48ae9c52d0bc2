//! End-to-end scenarios against an in-memory asset store.

use asset_unifier::dedup::memory_store::InMemoryAssetStore;
use asset_unifier::dedup::store::AssetStore;
use asset_unifier::dedup::Deduplicator;
use asset_unifier::domain::SourceTag;
use asset_unifier::normalize::normalize_host;
use serde_json::json;

async fn run_scenario(records: Vec<(SourceTag, serde_json::Value)>) -> Deduplicator<InMemoryAssetStore> {
    let dedup = Deduplicator::new(InMemoryAssetStore::new());
    for (source, raw) in records {
        let host = normalize_host(&raw, source).expect("record should normalize");
        dedup.upsert_host(host).await.unwrap();
    }
    dedup
}

#[tokio::test]
async fn s1_insert_then_merge_on_mac() {
    let qualys = json!({
        "id": 1,
        "name": "h1",
        "networkInterface": {"list": [
            {"HostAssetInterface": {"macAddress": "aa:bb:cc:00:11:22", "address": "10.0.0.1"}}
        ]}
    });
    let crowdstrike = json!({
        "device_id": "cs-1",
        "hostname": "h1-cs",
        "mac_address": "aa-bb-cc-00-11-22",
    });

    let dedup = run_scenario(vec![(SourceTag::Qualys, qualys), (SourceTag::CrowdStrike, crowdstrike)]).await;

    let all = dedup.store().all().await.unwrap();
    assert_eq!(all.len(), 1);
    let host = &all[0].host;
    assert!(host.source_ids.contains_key("qualys_id"));
    assert!(host.source_ids.contains_key("crowdstrike_id"));
    assert_eq!(host.hostname.as_deref(), Some("h1-cs"));
    assert_eq!(host.network_interfaces.len(), 1);
    assert_eq!(host.network_interfaces[0].sources.len(), 2);
}

#[tokio::test]
async fn s2_weak_match_inserts_two_records() {
    let qualys = json!({
        "id": 1,
        "name": "H",
        "address": "10.0.0.1",
    });
    let tenable = json!({
        "id": "t1",
        "operating_systems": ["Linux on Ubuntu"],
        "host_name": "H",
        "ipv4_addresses": ["10.0.0.1"],
    });

    let dedup = run_scenario(vec![(SourceTag::Qualys, qualys), (SourceTag::Tenable, tenable)]).await;
    assert_eq!(dedup.store().all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn s3_cloud_id_match_beats_hostname_mismatch() {
    let qualys = json!({
        "id": 1,
        "name": "alpha",
        "sourceInfo": {"list": [
            {"Ec2AssetSourceSimple": {"instanceId": "i-abc"}}
        ]}
    });
    let crowdstrike = json!({
        "device_id": "cs-1",
        "hostname": "beta",
        "instance_id": "i-abc",
    });

    let dedup = run_scenario(vec![(SourceTag::Qualys, qualys), (SourceTag::CrowdStrike, crowdstrike)]).await;
    let all = dedup.store().all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].host.hostname.as_deref(), Some("beta"));
}

#[tokio::test]
async fn s5_software_observed_by_two_sources_merges_into_one_entry() {
    let qualys = json!({
        "id": 1,
        "networkInterface": {"list": [
            {"HostAssetInterface": {"macAddress": "AA:BB", "address": "10.0.0.1"}}
        ]},
        "software": {"list": [
            {"HostAssetSoftware": {"name": "nginx", "version": "1.18"}}
        ]}
    });
    let tenable = json!({
        "id": "t1",
        "operating_systems": ["Linux on Ubuntu"],
        "display_mac_address": "AA:BB",
        "mac_addresses": ["AA:BB"],
        "installed_software": ["cpe:/a:igor_sysoev:nginx:1.18"],
    });

    let dedup = run_scenario(vec![(SourceTag::Qualys, qualys), (SourceTag::Tenable, tenable)]).await;
    let all = dedup.store().all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].host.installed_software.len(), 1);
    assert_eq!(all[0].host.installed_software[0].sources.len(), 2);
}

#[tokio::test]
async fn s6_null_safe_normalization_of_missing_network_interface() {
    let qualys = json!({"id": 1, "name": "no-iface-host"});
    let host = normalize_host(&qualys, SourceTag::Qualys).expect("non-blank record normalizes");
    assert!(host.network_interfaces.is_empty());
    assert!(host.primary_mac_address.is_none());
}

#[tokio::test]
async fn blank_raw_record_normalizes_to_none() {
    assert!(normalize_host(&json!(null), SourceTag::Qualys).is_none());
    assert!(normalize_host(&json!({}), SourceTag::Qualys).is_none());
}

#[tokio::test]
async fn idempotent_upsert_of_identical_record() {
    let dedup = Deduplicator::new(InMemoryAssetStore::new());
    let raw = json!({
        "id": 1,
        "name": "idempotent-host",
        "networkInterface": {"list": [
            {"HostAssetInterface": {"macAddress": "aa:bb:cc:dd:ee:ff", "address": "10.0.0.9"}}
        ]}
    });
    let host = normalize_host(&raw, SourceTag::Qualys).unwrap();

    dedup.upsert_host(host.clone()).await.unwrap();
    dedup.upsert_host(host).await.unwrap();

    let all = dedup.store().all().await.unwrap();
    assert_eq!(all.len(), 1, "second upsert should merge, not duplicate");
}
