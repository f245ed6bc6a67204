use std::collections::BTreeMap;

/// Per-process identifiers used to correlate logs and capability
/// announcements across restarts (§3, §9).
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub built_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProtocolInfo {
    pub name: String,
    pub version: u32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DependencyDecl {
    pub name: String,
    pub required: bool,
    pub min_protocol_version: u32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceLimits {
    pub max_payload_bytes: u64,
    pub rate_limit_per_minute: u32,
    pub max_video_size_bytes: u64,
}

/// The capabilities descriptor (§3): the unit of compatibility checking
/// against downstream services, emitted at startup / readiness / feature
/// toggles (§4.3).
#[derive(Debug, Clone, serde::Serialize)]
pub struct CapabilitiesDescriptor {
    pub schema_version: u32,
    pub service_name: String,
    pub run_id: RunId,
    pub instance_id: String,
    pub build: BuildInfo,
    pub protocol: ProtocolInfo,
    pub endpoints: Vec<String>,
    pub feature_flags: BTreeMap<String, FeatureValue>,
    pub events_produced: Vec<String>,
    pub events_consumed: Vec<String>,
    pub dependencies: Vec<DependencyDecl>,
    pub limits: ServiceLimits,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Text(String),
}
