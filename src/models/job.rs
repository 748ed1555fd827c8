use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::Record;

/// A unit of work pulled from the deletes queue.
///
/// Jobs are JSON objects tagged by `type`. Unrecognised tags parse to
/// [`Job::Unknown`] rather than failing, so older workers complete jobs
/// introduced by newer producers as no-ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawJob", into = "Value")]
pub enum Job {
    /// A resource was deleted; remove what depended on it.
    Document(DocumentDelete),
    /// Remove aged records older than a threshold.
    Purge(PurgeJob),
    /// Remove the certificate files of a domain.
    Certificates(CertificatePurge),
    /// A job type this worker does not handle.
    Unknown { kind: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDelete {
    /// Snapshot of the resource as it was before deletion.
    pub document: Record,
    /// Tenant the resource belonged to. Projects are their own tenant.
    #[serde(default, alias = "projectId", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeKind {
    /// Function execution records, per tenant.
    Executions,
    /// Audit log entries, per tenant via the audit retention adapter.
    Audit,
    /// Abuse/rate-limit log entries, per tenant via the abuse retention adapter.
    Abuse,
    /// Realtime connection records in the console namespace.
    Realtime,
}

impl PurgeKind {
    pub const ALL: [PurgeKind; 4] = [
        PurgeKind::Executions,
        PurgeKind::Audit,
        PurgeKind::Abuse,
        PurgeKind::Realtime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PurgeKind::Executions => "executions",
            PurgeKind::Audit => "audit",
            PurgeKind::Abuse => "abuse",
            PurgeKind::Realtime => "realtime",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl std::fmt::Display for PurgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeJob {
    pub kind: PurgeKind,
    /// Unix seconds. Records strictly older than this are purged. Zero means unset.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePurge {
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Deserialize)]
struct Threshold {
    #[serde(default)]
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct RawJob {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

const DOCUMENT: &str = "document";
const CERTIFICATES: &str = "certificates";

impl TryFrom<RawJob> for Job {
    type Error = serde_json::Error;

    fn try_from(raw: RawJob) -> Result<Self, Self::Error> {
        let payload = Value::Object(raw.payload);
        let job = match raw.kind.as_str() {
            DOCUMENT => Job::Document(serde_json::from_value(payload)?),
            CERTIFICATES => Job::Certificates(serde_json::from_value(payload)?),
            tag => match PurgeKind::from_tag(tag) {
                Some(kind) => {
                    let threshold: Threshold = serde_json::from_value(payload)?;
                    Job::Purge(PurgeJob {
                        kind,
                        timestamp: threshold.timestamp,
                    })
                }
                None => Job::Unknown { kind: raw.kind },
            },
        };
        Ok(job)
    }
}

impl From<Job> for Value {
    fn from(job: Job) -> Self {
        match job {
            Job::Document(delete) => {
                let mut value = json!({ "type": DOCUMENT, "document": delete.document });
                if let Some(tenant_id) = delete.tenant_id {
                    value["tenantId"] = Value::String(tenant_id);
                }
                value
            }
            Job::Purge(purge) => json!({ "type": purge.kind.as_str(), "timestamp": purge.timestamp }),
            Job::Certificates(purge) => json!({ "type": CERTIFICATES, "domain": purge.domain }),
            Job::Unknown { kind } => json!({ "type": kind }),
        }
    }
}

impl Job {
    /// Parse a job from its JSON wire form.
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    pub fn purge(kind: PurgeKind, timestamp: i64) -> Self {
        Job::Purge(PurgeJob { kind, timestamp })
    }

    pub fn document(document: Record, tenant_id: Option<String>) -> Self {
        Job::Document(DocumentDelete {
            document,
            tenant_id,
        })
    }

    /// The job's `type` tag.
    pub fn kind(&self) -> &str {
        match self {
            Job::Document(_) => DOCUMENT,
            Job::Purge(purge) => purge.kind.as_str(),
            Job::Certificates(_) => CERTIFICATES,
            Job::Unknown { kind } => kind,
        }
    }
}
