//! CrowdStrike raw-record normalization.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::domain::{
    CloudContext, CrowdStrikeSecurityInfo, NetworkInterface, SourceTag, UnifiedHost, now_iso8601,
};
use crate::json_ext::{obj_at, owned_str_at, str_at};

fn normalize_mac(raw_mac: &str) -> String {
    raw_mac.replace('-', ":")
}

pub fn normalize(raw: &Value) -> UnifiedHost {
    let policies: HashMap<String, String> = obj_at(raw, "device_policies")
        .and_then(Value::as_object)
        .map(|policies| {
            policies
                .iter()
                .filter_map(|(policy_type, policy)| {
                    owned_str_at(policy, "policy_id").map(|id| (policy_type.clone(), id))
                })
                .collect()
        })
        .unwrap_or_default();

    let crowdstrike_security = CrowdStrikeSecurityInfo {
        agent_version: owned_str_at(raw, "agent_version"),
        status: owned_str_at(raw, "status"),
        first_seen: owned_str_at(raw, "first_seen"),
        last_seen: owned_str_at(raw, "last_seen"),
        policies,
    };

    let service_provider = str_at(raw, "service_provider");
    let cloud_context = service_provider.map(|provider| CloudContext {
        provider: Some(if provider == "AWS_EC2_V2" {
            "AWS".to_owned()
        } else {
            provider.to_owned()
        }),
        account_id: owned_str_at(raw, "service_provider_account_id"),
        instance_id: owned_str_at(raw, "instance_id"),
        availability_zone: owned_str_at(raw, "zone_group"),
        ..CloudContext::default()
    });

    let mac_address = owned_str_at(raw, "mac_address").map(|m| normalize_mac(&m));
    let local_ip = owned_str_at(raw, "local_ip");

    let network_interfaces = vec![NetworkInterface {
        mac_address: mac_address.clone(),
        private_ip_v4: local_ip.clone(),
        public_ip_v4: None,
        ip_v6: None,
        sources: BTreeSet::from([SourceTag::CrowdStrike]),
    }];

    let mut source_ids = HashMap::new();
    if let Some(device_id) = owned_str_at(raw, "device_id") {
        source_ids.insert("crowdstrike_id".to_owned(), device_id);
    }

    let now = now_iso8601();
    UnifiedHost {
        primary_mac_address: mac_address,
        cloud_instance_id: owned_str_at(raw, "instance_id"),
        source_ids,
        hostname: owned_str_at(raw, "hostname"),
        os_name: owned_str_at(raw, "os_version"),
        os_platform: owned_str_at(raw, "platform_name"),
        kernel_version: owned_str_at(raw, "kernel_version"),
        last_boot_timestamp: None,
        manufacturer: owned_str_at(raw, "system_manufacturer"),
        product_model: owned_str_at(raw, "system_product_name"),
        processor_info: None,
        total_memory_mb: None,
        public_ip: owned_str_at(raw, "external_ip"),
        private_ip: local_ip,
        default_gateway: owned_str_at(raw, "default_gateway_ip"),
        network_interfaces,
        cloud_context,
        qualys_security: None,
        crowdstrike_security: Some(crowdstrike_security),
        tenable_security: None,
        installed_software: Vec::new(),
        record_created_at: now.clone(),
        record_last_updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mac_separators_rewritten_to_colons() {
        let raw = json!({"device_id": "d1", "mac_address": "aa-bb-cc-dd-ee-ff"});
        let host = normalize(&raw);
        assert_eq!(host.primary_mac_address.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn aws_ec2_v2_service_provider_normalized_to_aws() {
        let raw = json!({"device_id": "d1", "service_provider": "AWS_EC2_V2", "instance_id": "i-1"});
        let host = normalize(&raw);
        assert_eq!(host.cloud_context.unwrap().provider.as_deref(), Some("AWS"));
    }

    #[test]
    fn no_service_provider_yields_no_cloud_context() {
        let raw = json!({"device_id": "d1"});
        let host = normalize(&raw);
        assert!(host.cloud_context.is_none());
    }

    #[test]
    fn policies_drop_entries_without_policy_id() {
        let raw = json!({
            "device_id": "d1",
            "device_policies": {
                "prevention": {"policy_id": "p1"},
                "sensor_update": {}
            }
        });
        let host = normalize(&raw);
        let security = host.crowdstrike_security.unwrap();
        assert_eq!(security.policies.get("prevention").map(String::as_str), Some("p1"));
        assert!(!security.policies.contains_key("sensor_update"));
    }
}
