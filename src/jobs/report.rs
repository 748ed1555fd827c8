use std::time::Duration;

use serde::Serialize;

/// Results from one grouped bulk delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupDeleteReport {
    /// Fetched pages that returned at least one record.
    pub pages: u64,
    /// Records removed by this call.
    pub deleted: u64,
    /// Records whose delete failed; they were logged and skipped.
    pub failed: u64,
    pub elapsed: Duration,
}

/// Results from one job, summed over every step it ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub records_deleted: u64,
    pub records_failed: u64,
    pub files_deleted: u64,
    pub files_failed: u64,
    /// Tenants visited by a fan-out purge.
    pub tenants: u64,
    pub pages: u64,
}

impl JobReport {
    pub fn absorb(&mut self, group: &GroupDeleteReport) {
        self.records_deleted += group.deleted;
        self.records_failed += group.failed;
        self.pages += group.pages;
    }

    pub fn merge(&mut self, other: JobReport) {
        self.records_deleted += other.records_deleted;
        self.records_failed += other.records_failed;
        self.files_deleted += other.files_deleted;
        self.files_failed += other.files_failed;
        self.tenants += other.tenants;
        self.pages += other.pages;
    }

    /// Check if the job removed anything.
    pub fn has_deletions(&self) -> bool {
        self.records_deleted > 0 || self.files_deleted > 0
    }
}

impl From<GroupDeleteReport> for JobReport {
    fn from(group: GroupDeleteReport) -> Self {
        let mut report = Self::default();
        report.absorb(&group);
        report
    }
}

/// How a job that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(JobReport),
    /// Nothing in this worker handles the job; it is complete as a no-op.
    Skipped { reason: String },
}

impl Outcome {
    pub fn report(&self) -> Option<&JobReport> {
        match self {
            Outcome::Completed(report) => Some(report),
            Outcome::Skipped { .. } => None,
        }
    }
}
