pub mod capabilities;
pub mod dto;
mod error;
mod id;
mod job;
mod ledger;

pub use capabilities::{
    BuildInfo, CapabilitiesDescriptor, DependencyDecl, FeatureValue, ProtocolInfo, RunId,
    ServiceLimits,
};
pub use dto::{
    BatchSubmitRequest, CompleteJobCallback, DownloadResponse, JobDescriptorResponse, JobOutcome,
    PlatformDescriptor, SubmitJobRequest, SubmitJobResponse,
};
pub use error::{ApiError, ErrorKind};
pub use id::{InvalidJobId, JobId};
pub use job::{
    CropPosition, EffectiveBackend, Job, JobStatus, Platform, PlatformPreset, ProcessingMode,
};
pub use ledger::{Balance, LedgerEntry, LedgerEntryKind};
