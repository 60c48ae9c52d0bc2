//! Qualys raw-record normalization.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::domain::{
    CloudContext, NetworkInterface, OpenPort, QualysSecurityInfo, Software, SourceTag,
    UnifiedHost, now_iso8601,
};
use crate::json_ext::{i64_at, obj_at, owned_str_at, qualys_list, str_at};

/// Finds the `sourceInfo.list` entry carrying `Ec2AssetSourceSimple` and
/// returns its inner object, or `None` if no entry has it.
fn find_ec2_info(raw: &Value) -> Option<&Value> {
    qualys_list(raw, "sourceInfo")
        .iter()
        .find_map(|entry| obj_at(entry, "Ec2AssetSourceSimple"))
}

fn is_private_v4(address: &str) -> bool {
    address.starts_with("10.") || address.starts_with("172.") || address.starts_with("192.168.")
}

struct GroupedInterface {
    mac_address: String,
    private_ip_v4: Option<String>,
    public_ip_v4: Option<String>,
    ip_v6: Option<String>,
}

pub fn normalize(raw: &Value) -> UnifiedHost {
    let interfaces_list = qualys_list(raw, "networkInterface");

    let primary_mac = interfaces_list.iter().find_map(|entry| {
        obj_at(entry, "HostAssetInterface").and_then(|iface| owned_str_at(iface, "macAddress"))
    });

    let mut grouped: Vec<GroupedInterface> = Vec::new();
    let mut default_gateway = None;
    let mut public_ip_from_list = None;

    for entry in interfaces_list {
        let Some(iface) = obj_at(entry, "HostAssetInterface") else {
            continue;
        };
        let mac = str_at(iface, "macAddress");
        let address = str_at(iface, "address");

        let (mac, address) = match (mac, address) {
            (None, Some(address)) if address.contains('.') => {
                public_ip_from_list = Some(address.to_owned());
                continue;
            }
            (None, _) => continue,
            (Some(mac), address) => (mac, address),
        };

        if let Some(gateway) = owned_str_at(iface, "gatewayAddress") {
            default_gateway = Some(gateway);
        }

        let slot = match grouped.iter_mut().find(|g| g.mac_address == mac) {
            Some(slot) => slot,
            None => {
                grouped.push(GroupedInterface {
                    mac_address: mac.to_owned(),
                    private_ip_v4: None,
                    public_ip_v4: None,
                    ip_v6: None,
                });
                grouped.last_mut().expect("just pushed")
            }
        };

        if let Some(address) = address {
            if address.contains(':') {
                slot.ip_v6 = Some(address.to_owned());
            } else if is_private_v4(address) {
                slot.private_ip_v4 = Some(address.to_owned());
            } else {
                slot.public_ip_v4 = Some(address.to_owned());
            }
        }
    }

    if let (Some(public_ip), Some(primary_mac)) = (&public_ip_from_list, &primary_mac) {
        if let Some(slot) = grouped.iter_mut().find(|g| &g.mac_address == primary_mac) {
            if slot.public_ip_v4.is_none() {
                slot.public_ip_v4 = Some(public_ip.clone());
            }
        }
    }

    let network_interfaces: Vec<NetworkInterface> = grouped
        .into_iter()
        .map(|g| NetworkInterface {
            mac_address: Some(g.mac_address),
            private_ip_v4: g.private_ip_v4,
            public_ip_v4: g.public_ip_v4,
            ip_v6: g.ip_v6,
            sources: BTreeSet::from([SourceTag::Qualys]),
        })
        .collect();

    let agent_info = obj_at(raw, "agentInfo");
    let ec2_info = find_ec2_info(raw);

    let qualys_security = QualysSecurityInfo {
        agent_version: agent_info.and_then(|a| owned_str_at(a, "agentVersion")),
        last_checked_in: agent_info
            .and_then(|a| obj_at(a, "lastCheckedIn"))
            .and_then(|d| owned_str_at(d, "$date")),
        last_vuln_scan: obj_at(raw, "lastVulnScan").and_then(|d| owned_str_at(d, "$date")),
        vulnerability_qids: qualys_list(raw, "vuln")
            .iter()
            .filter_map(|v| obj_at(v, "HostAssetVuln").and_then(|inner| i64_at(inner, "qid")))
            .collect(),
        open_ports: qualys_list(raw, "openPort")
            .iter()
            .map(|p| {
                let inner = obj_at(p, "HostAssetOpenPort");
                OpenPort {
                    port: inner.and_then(|i| i64_at(i, "port")),
                    protocol: inner.and_then(|i| owned_str_at(i, "protocol")),
                }
            })
            .collect(),
    };

    let installed_software: Vec<Software> = qualys_list(raw, "software")
        .iter()
        .filter_map(|sw| {
            let inner = obj_at(sw, "HostAssetSoftware")?;
            let product = owned_str_at(inner, "name")?;
            Some(Software {
                vendor: None,
                product,
                version: owned_str_at(inner, "version"),
                sources: BTreeSet::from([SourceTag::Qualys]),
            })
        })
        .collect();

    let cloud_context = ec2_info.map(|ec2| CloudContext {
        provider: owned_str_at(raw, "cloudProvider"),
        account_id: owned_str_at(ec2, "accountId"),
        instance_id: owned_str_at(ec2, "instanceId"),
        instance_type: owned_str_at(ec2, "instanceType"),
        region: owned_str_at(ec2, "region"),
        availability_zone: owned_str_at(ec2, "availabilityZone"),
        image_id: owned_str_at(ec2, "imageId"),
        vpc_id: owned_str_at(ec2, "vpcId"),
        subnet_id: owned_str_at(ec2, "subnetId"),
    });

    let processor_info = qualys_list(raw, "processor")
        .first()
        .and_then(|p| obj_at(p, "HostAssetProcessor"))
        .and_then(|p| owned_str_at(p, "name"));

    let mut source_ids = HashMap::new();
    let id_str = raw.get("id").map_or_else(String::new, |v| {
        v.as_str().map_or_else(|| v.to_string(), str::to_owned)
    });
    source_ids.insert("qualys_id".to_owned(), id_str);

    let now = now_iso8601();
    UnifiedHost {
        primary_mac_address: primary_mac,
        cloud_instance_id: ec2_info.and_then(|e| owned_str_at(e, "instanceId")),
        source_ids,
        hostname: owned_str_at(raw, "name"),
        os_name: owned_str_at(raw, "os"),
        os_platform: agent_info.and_then(|a| owned_str_at(a, "platform")),
        kernel_version: None,
        last_boot_timestamp: owned_str_at(raw, "lastSystemBoot"),
        manufacturer: owned_str_at(raw, "manufacturer"),
        product_model: owned_str_at(raw, "model"),
        processor_info,
        total_memory_mb: i64_at(raw, "totalMemory"),
        public_ip: ec2_info.and_then(|e| owned_str_at(e, "publicIpAddress")),
        private_ip: owned_str_at(raw, "address"),
        default_gateway,
        network_interfaces,
        cloud_context,
        qualys_security: Some(qualys_security),
        crowdstrike_security: None,
        tenable_security: None,
        installed_software,
        record_created_at: now.clone(),
        record_last_updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn groups_interfaces_by_mac_and_classifies_addresses() {
        let raw = json!({
            "id": 42,
            "name": "host-a",
            "os": "Linux",
            "networkInterface": {"list": [
                {"HostAssetInterface": {"macAddress": "AA:BB", "address": "192.168.1.5", "gatewayAddress": "192.168.1.1"}},
                {"HostAssetInterface": {"macAddress": "AA:BB", "address": "8.8.8.8"}},
                {"HostAssetInterface": {"address": "203.0.113.9"}},
            ]}
        });
        let host = normalize(&raw);
        assert_eq!(host.primary_mac_address.as_deref(), Some("AA:BB"));
        assert_eq!(host.default_gateway.as_deref(), Some("192.168.1.1"));
        assert_eq!(host.network_interfaces.len(), 1);
        let iface = &host.network_interfaces[0];
        assert_eq!(iface.private_ip_v4.as_deref(), Some("192.168.1.5"));
        assert_eq!(iface.public_ip_v4.as_deref(), Some("8.8.8.8"));
    }

    #[test]
    fn standalone_public_ip_assigned_to_primary_mac() {
        let raw = json!({
            "id": 1,
            "networkInterface": {"list": [
                {"HostAssetInterface": {"macAddress": "AA:BB", "address": "192.168.1.5"}},
                {"HostAssetInterface": {"address": "203.0.113.9"}},
            ]}
        });
        let host = normalize(&raw);
        assert_eq!(host.network_interfaces[0].public_ip_v4.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn ec2_info_found_among_source_info_list() {
        let raw = json!({
            "id": 7,
            "sourceInfo": {"list": [
                {"SomeOtherSource": {}},
                {"Ec2AssetSourceSimple": {"instanceId": "i-123", "accountId": "acct-1"}},
            ]}
        });
        let host = normalize(&raw);
        assert_eq!(host.cloud_instance_id.as_deref(), Some("i-123"));
        assert_eq!(host.cloud_context.unwrap().account_id.as_deref(), Some("acct-1"));
    }
}
