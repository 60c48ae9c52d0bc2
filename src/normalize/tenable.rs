//! Tenable raw-record normalization.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::domain::{
    CloudContext, NetworkInterface, Software, SourceTag, TenableMitigation, TenableSecurityInfo,
    TenableTag, UnifiedHost, now_iso8601,
};
use crate::json_ext::{bool_at, list_at, owned_str_at, str_at};

/// Splits a CPE string (`cpe:/a:vendor:product:version[:...]`) into
/// vendor/product/version. Returns `None` when there are fewer than five
/// colon-separated segments.
fn parse_cpe(cpe_string: &str) -> Option<Software> {
    let parts: Vec<&str> = cpe_string.split(':').collect();
    if parts.len() < 5 {
        return None;
    }
    Some(Software {
        vendor: Some(parts[2].to_owned()),
        product: parts[3].to_owned(),
        version: Some(parts[4].to_owned()),
        sources: BTreeSet::from([SourceTag::Tenable]),
    })
}

/// Splits `"<Kernel X> on <OS name>"` into `(os_name, platform, kernel)`.
fn parse_os(os_str: &str) -> (String, String, Option<String>) {
    let (os_name, kernel) = match os_str.split_once(" on ") {
        Some((kernel_part, os_name)) => {
            let kernel = kernel_part.split_once("Kernel ").map(|(_, k)| k.to_owned());
            (os_name.to_owned(), kernel)
        }
        None => (os_str.to_owned(), None),
    };

    let platform = if os_name.contains("Linux") {
        "Linux"
    } else if os_name.contains("Windows") {
        "Windows"
    } else {
        "Unknown"
    };

    (os_name, platform.to_owned(), kernel)
}

fn is_private_v4(address: &str) -> bool {
    address.starts_with("10.") || address.starts_with("172.") || address.starts_with("192.168.")
}

pub fn normalize(raw: &Value) -> UnifiedHost {
    let os_string = list_at(raw, "operating_systems")
        .first()
        .and_then(Value::as_str)
        .unwrap_or_default();
    let (os_name, os_platform, kernel_version) = parse_os(os_string);

    let cloud_context = CloudContext {
        provider: Some("AWS".to_owned()),
        account_id: owned_str_at(raw, "aws_owner_id"),
        instance_id: owned_str_at(raw, "aws_ec2_instance_id"),
        instance_type: owned_str_at(raw, "aws_ec2_instance_type"),
        region: owned_str_at(raw, "aws_region"),
        availability_zone: owned_str_at(raw, "aws_availability_zone"),
        image_id: owned_str_at(raw, "aws_ec2_instance_ami_id"),
        vpc_id: owned_str_at(raw, "aws_vpc_id"),
        subnet_id: owned_str_at(raw, "aws_subnet_id"),
    };

    let tags: Vec<TenableTag> = list_at(raw, "tags")
        .iter()
        .map(|tag| TenableTag {
            id: owned_str_at(tag, "id"),
            category: owned_str_at(tag, "category"),
            value: owned_str_at(tag, "value"),
            tag_type: owned_str_at(tag, "type"),
        })
        .collect();

    let mitigations: Vec<TenableMitigation> = list_at(raw, "mitigations")
        .iter()
        .map(|mit| TenableMitigation {
            id: owned_str_at(mit, "id"),
            vendor_name: owned_str_at(mit, "vendor_name"),
            product_name: owned_str_at(mit, "product_name"),
            version: owned_str_at(mit, "version"),
            form_factor: owned_str_at(mit, "form_factor"),
            last_detected: owned_str_at(mit, "last_Detected"),
        })
        .collect();

    let tenable_security = TenableSecurityInfo {
        has_agent: bool_at(raw, "has_agent"),
        last_authenticated_scan_time: owned_str_at(raw, "last_authenticated_scan_time"),
        vulnerability_counts: raw.get("vuln_counts").cloned().unwrap_or(Value::Object(Default::default())),
        tags,
        mitigations,
    };

    let installed_software: Vec<Software> = list_at(raw, "installed_software")
        .iter()
        .filter_map(Value::as_str)
        .filter_map(parse_cpe)
        .collect();

    let mac_addresses: Vec<&str> = list_at(raw, "mac_addresses").iter().filter_map(Value::as_str).collect();
    let ipv4_addresses: Vec<&str> = list_at(raw, "ipv4_addresses").iter().filter_map(Value::as_str).collect();
    let ipv6_addresses: Vec<&str> = list_at(raw, "ipv6_addresses").iter().filter_map(Value::as_str).collect();

    let mut network_interfaces: Vec<NetworkInterface> = mac_addresses
        .iter()
        .map(|mac| NetworkInterface {
            mac_address: Some((*mac).to_owned()),
            sources: BTreeSet::from([SourceTag::Tenable]),
            ..NetworkInterface::default()
        })
        .collect();

    if let Some(primary) = network_interfaces.first_mut() {
        let (private_ips, public_ips): (Vec<&str>, Vec<&str>) =
            ipv4_addresses.iter().partition(|ip| is_private_v4(ip));
        if let Some(private) = private_ips.first() {
            primary.private_ip_v4 = Some((*private).to_owned());
        }
        if let Some(public) = public_ips.first() {
            primary.public_ip_v4 = Some((*public).to_owned());
        }
        if let Some(v6) = ipv6_addresses.first() {
            primary.ip_v6 = Some((*v6).to_owned());
        }
    }

    let display_ipv4 = str_at(raw, "display_ipv4_address");
    let private_ip = ipv4_addresses
        .iter()
        .find(|ip| Some(**ip) != display_ipv4)
        .map(|ip| (*ip).to_owned());

    let mut source_ids = HashMap::new();
    if let Some(id) = owned_str_at(raw, "id") {
        source_ids.insert("tenable_id".to_owned(), id);
    }

    let now = now_iso8601();
    UnifiedHost {
        primary_mac_address: owned_str_at(raw, "display_mac_address"),
        cloud_instance_id: owned_str_at(raw, "aws_ec2_instance_id"),
        source_ids,
        hostname: owned_str_at(raw, "host_name"),
        os_name: Some(os_name),
        os_platform: Some(os_platform),
        kernel_version,
        last_boot_timestamp: None,
        manufacturer: None,
        product_model: None,
        processor_info: None,
        total_memory_mb: None,
        public_ip: owned_str_at(raw, "display_ipv4_address"),
        private_ip,
        default_gateway: None,
        network_interfaces,
        cloud_context: Some(cloud_context),
        qualys_security: None,
        crowdstrike_security: None,
        tenable_security: Some(tenable_security),
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
    fn parses_os_with_kernel_prefix() {
        let (name, platform, kernel) = parse_os("Linux Kernel 5.4.0 on Ubuntu 20.04");
        assert_eq!(name, "Ubuntu 20.04");
        assert_eq!(platform, "Linux");
        assert_eq!(kernel.as_deref(), Some("5.4.0"));
    }

    #[test]
    fn parses_os_without_on_separator() {
        let (name, platform, kernel) = parse_os("FreeBSD 13");
        assert_eq!(name, "FreeBSD 13");
        assert_eq!(platform, "Unknown");
        assert!(kernel.is_none());
    }

    #[test]
    fn parses_cpe_into_software() {
        let sw = parse_cpe("cpe:/a:microsoft:windows_server:2019").unwrap();
        assert_eq!(sw.vendor.as_deref(), Some("microsoft"));
        assert_eq!(sw.product, "windows_server");
        assert_eq!(sw.version.as_deref(), Some("2019"));
    }

    #[test]
    fn short_cpe_is_rejected() {
        assert!(parse_cpe("cpe:/a:vendor").is_none());
    }

    #[test]
    fn mitigation_last_detected_key_normalized() {
        let raw = json!({
            "id": "t1",
            "operating_systems": ["Linux Kernel 5.4 on Ubuntu"],
            "mitigations": [{"id": "m1", "last_Detected": "2024-01-01"}]
        });
        let host = normalize(&raw);
        let security = host.tenable_security.unwrap();
        assert_eq!(security.mitigations[0].last_detected.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn private_ip_excludes_display_ip() {
        let raw = json!({
            "id": "t1",
            "operating_systems": ["Linux on Ubuntu"],
            "display_ipv4_address": "203.0.113.9",
            "ipv4_addresses": ["203.0.113.9", "10.0.0.5"]
        });
        let host = normalize(&raw);
        assert_eq!(host.private_ip.as_deref(), Some("10.0.0.5"));
    }
}
