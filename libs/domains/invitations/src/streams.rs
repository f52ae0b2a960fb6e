//! Redis stream definitions for deferred invitation jobs.

/// Stream carrying [`InvitationJob`](crate::jobs::InvitationJob)s.
///
/// Written by [`RedisJobQueue`](crate::queue::RedisJobQueue) and read by the
/// invitations worker.
pub struct InvitationJobStream;

impl InvitationJobStream {
    /// Stream name for invitation jobs.
    pub const STREAM_NAME: &'static str = "invitations:jobs";

    /// Consumer group for invitation workers.
    pub const CONSUMER_GROUP: &'static str = "invitation_workers";

    /// Field holding the serialized job in each stream entry.
    pub const JOB_FIELD: &'static str = "job";

    /// Approximate cap applied with `XADD MAXLEN ~`.
    pub const MAX_LENGTH: i64 = 100_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_job_stream_def() {
        assert_eq!(InvitationJobStream::STREAM_NAME, "invitations:jobs");
        assert_eq!(InvitationJobStream::CONSUMER_GROUP, "invitation_workers");
        assert_eq!(InvitationJobStream::JOB_FIELD, "job");
        assert_eq!(InvitationJobStream::MAX_LENGTH, 100_000);
    }
}
