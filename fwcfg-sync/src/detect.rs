use serde::Serialize;
use xml_doc_core::XmlNode;

use crate::version::SoftwareVersion;

/// Detected device family of a configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFlavor {
    Firewall,
    Panorama,
    /// Not a `<config>` document.
    Unknown,
}

/// Detected version value with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDetection {
    pub value: String,
    pub source: String,
    pub confidence: String,
}

fn local_device(node: &XmlNode) -> Option<&XmlNode> {
    node.get_child("devices")?
        .get_children("entry")
        .into_iter()
        .find(|e| e.name() == Some("localhost.localdomain"))
}

/// Detect the device family from the document layout.
///
/// Panorama keeps device groups and templates below the local device entry,
/// a firewall keeps virtual systems there.
pub fn detect_config(node: &XmlNode) -> DeviceFlavor {
    if node.tag != "config" {
        return DeviceFlavor::Unknown;
    }
    let panorama_markers = ["device-group", "template", "template-stack"];
    match local_device(node) {
        Some(device) if panorama_markers.iter().any(|m| device.get_child(m).is_some()) => {
            DeviceFlavor::Panorama
        }
        _ if node.get_child("panorama").is_some() && local_device(node).is_none() => {
            DeviceFlavor::Panorama
        }
        _ => DeviceFlavor::Firewall,
    }
}

/// Return the `<config version="...">` attribute if present.
pub fn detect_version(node: &XmlNode) -> Option<&str> {
    node.attributes.get("version").map(String::as_str)
}

/// Detect the software version with source metadata.
pub fn detect_version_info(node: &XmlNode) -> VersionDetection {
    if let Some(v) = detect_version(node).filter(|v| !v.trim().is_empty()) {
        return VersionDetection {
            value: v.to_string(),
            source: format!("{}@version", node.tag),
            confidence: "high".to_string(),
        };
    }

    if let Some(v) = local_device(node)
        .and_then(|d| d.get_text(&["deviceconfig", "system", "sw-version"]))
        .filter(|v| !v.trim().is_empty())
    {
        return VersionDetection {
            value: v.to_string(),
            source: "deviceconfig.system.sw-version".to_string(),
            confidence: "medium".to_string(),
        };
    }

    VersionDetection {
        value: "unknown".to_string(),
        source: "not found".to_string(),
        confidence: "low".to_string(),
    }
}

/// Parsed software version, when one can be detected.
pub fn software_version(node: &XmlNode) -> Option<SoftwareVersion> {
    detect_version_info(node).value.parse().ok()
}
