use std::path::{Component, Path};

use super::{context::JobContext, error::JobResult, report::JobReport};
use crate::{
    models::CertificatePurge,
    storage::{Device, StorageError},
};

/// Remove the certificate directory of a domain.
///
/// The directory is only touched when its canonical path is exactly
/// `{certificates root}/{domain}`. A domain that resolves anywhere else
/// (traversal sequences, symlinks) is handled like a missing directory:
/// nothing is deleted and the job succeeds.
pub(super) async fn delete_certificates(
    ctx: &JobContext,
    purge: &CertificatePurge,
) -> JobResult<JobReport> {
    let mut report = JobReport::default();
    let domain = purge.domain.as_str();
    if domain.is_empty() {
        tracing::debug!("Certificate purge without a domain, nothing to do");
        return Ok(report);
    }
    let dir = Path::new(domain);
    if !dir.components().all(|c| matches!(c, Component::Normal(_))) {
        tracing::warn!(domain, "Domain is not a plain relative path, ignoring");
        return Ok(report);
    }

    let device = ctx.certificates();
    let Some(root) = device.real_path(Path::new("")).await? else {
        tracing::debug!(root = %device.root().display(), "No certificates root, nothing to do");
        return Ok(report);
    };
    let expected = root.join(domain);

    let real = match device.real_path(dir).await {
        Ok(Some(real)) => real,
        Ok(None) => {
            tracing::debug!(domain, "No certificates stored for domain");
            return Ok(report);
        }
        Err(StorageError::OutsideRoot { .. }) => {
            tracing::warn!(domain, "Domain escapes the certificates root, ignoring");
            return Ok(report);
        }
        Err(e) => return Err(e.into()),
    };

    if real != expected || !device.is_dir(dir).await? {
        tracing::warn!(
            domain,
            expected = %expected.display(),
            resolved = %real.display(),
            "Certificate path does not resolve to its own directory, ignoring"
        );
        return Ok(report);
    }

    for file in device.files(dir).await? {
        if device.delete(&file, false).await? {
            report.files_deleted += 1;
        }
    }
    // Leftover subdirectories keep the domain directory around.
    if let Err(e) = device.delete(dir, false).await {
        tracing::warn!(domain, error = %e, "Failed to remove certificate directory");
    }

    tracing::info!(
        domain,
        files = report.files_deleted,
        path = %real.display(),
        "Deleted domain certificates"
    );
    Ok(report)
}
