//! GCP side of the pipeline: gcloud command rendering and execution
//!
//! The bucket, topic and subscription are created with the `gcloud` CLI.
//! Commands are values so they can be printed as a shell script by
//! `gsp plan` or executed by `gsp provision` through a [`CommandRunner`].

pub mod runner;

pub use runner::{CommandOutput, CommandRunner, ProcessRunner};

use crate::manifest::PipelineManifest;
use serde::{Serialize, Serializer};

/// Role granted to the storage integration's service account on the bucket.
pub const STORAGE_READ_ROLE: &str = "roles/storage.objectViewer";

/// Role granted to the notification integration's service account on the subscription.
pub const PUBSUB_SUBSCRIBER_ROLE: &str = "roles/pubsub.subscriber";

/// Role granted to the notification integration's service account on the project.
pub const MONITORING_VIEWER_ROLE: &str = "roles/monitoring.viewer";

/// One gcloud invocation (arguments after the executable)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcloudCommand {
    pub args: Vec<String>,
}

impl GcloudCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Render as a POSIX shell line
    pub fn to_shell(&self, program: &str) -> String {
        std::iter::once(program)
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for GcloudCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_shell("gcloud"))
    }
}

impl Serialize for GcloudCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.args.serialize(serializer)
    }
}

/// Quote a word for a POSIX shell if it needs quoting
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// `gcloud pubsub topics create`
pub fn create_topic(manifest: &PipelineManifest) -> GcloudCommand {
    GcloudCommand::new([
        "pubsub".to_string(),
        "topics".to_string(),
        "create".to_string(),
        manifest.gcp.topic.clone(),
        format!("--project={}", manifest.gcp.project_id),
    ])
}

/// `gcloud storage buckets notifications create`: OBJECT_FINALIZE events as JSON
pub fn create_bucket_notification(manifest: &PipelineManifest) -> GcloudCommand {
    let mut args = vec![
        "storage".to_string(),
        "buckets".to_string(),
        "notifications".to_string(),
        "create".to_string(),
        format!("gs://{}", manifest.gcp.bucket),
        format!("--topic={}", manifest.topic_path()),
        "--event-types=OBJECT_FINALIZE".to_string(),
        "--payload-format=json".to_string(),
    ];
    let prefix = gsp_common::names::normalize_prefix(&manifest.gcp.prefix);
    if !prefix.is_empty() {
        args.push(format!("--object-prefix={}", prefix));
    }
    GcloudCommand::new(args)
}

/// `gcloud pubsub subscriptions create`
pub fn create_subscription(manifest: &PipelineManifest) -> GcloudCommand {
    GcloudCommand::new([
        "pubsub".to_string(),
        "subscriptions".to_string(),
        "create".to_string(),
        manifest.gcp.subscription.clone(),
        format!("--topic={}", manifest.gcp.topic),
        format!("--project={}", manifest.gcp.project_id),
    ])
}

/// Bucket-level read grant for the storage integration's service account
pub fn grant_bucket_read(manifest: &PipelineManifest, service_account: &str) -> GcloudCommand {
    GcloudCommand::new([
        "storage".to_string(),
        "buckets".to_string(),
        "add-iam-policy-binding".to_string(),
        format!("gs://{}", manifest.gcp.bucket),
        format!("--member=serviceAccount:{}", service_account),
        format!("--role={}", STORAGE_READ_ROLE),
    ])
}

/// Subscriber grant on the subscription for the notification integration
pub fn grant_subscriber(manifest: &PipelineManifest, service_account: &str) -> GcloudCommand {
    GcloudCommand::new([
        "pubsub".to_string(),
        "subscriptions".to_string(),
        "add-iam-policy-binding".to_string(),
        manifest.gcp.subscription.clone(),
        format!("--member=serviceAccount:{}", service_account),
        format!("--role={}", PUBSUB_SUBSCRIBER_ROLE),
        format!("--project={}", manifest.gcp.project_id),
    ])
}

/// Project-level monitoring viewer grant for the notification integration
pub fn grant_monitoring_viewer(manifest: &PipelineManifest, service_account: &str) -> GcloudCommand {
    GcloudCommand::new([
        "projects".to_string(),
        "add-iam-policy-binding".to_string(),
        manifest.gcp.project_id.clone(),
        format!("--member=serviceAccount:{}", service_account),
        format!("--role={}", MONITORING_VIEWER_ROLE),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn manifest() -> PipelineManifest {
        let mut m = PipelineManifest::new("orders-ingest", "acme-data").unwrap();
        m.gcp.prefix = "orders".to_string();
        m
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("--topic=projects/p/topics/t"), "--topic=projects/p/topics/t");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_bucket_notification() {
        let cmd = create_bucket_notification(&manifest());
        assert_eq!(
            cmd.to_shell("gcloud"),
            "gcloud storage buckets notifications create gs://snowpipe-orders \
             --topic=projects/acme-data/topics/snowpipe-orders-topic \
             --event-types=OBJECT_FINALIZE --payload-format=json --object-prefix=orders/"
        );
    }

    #[test]
    fn test_bucket_notification_without_prefix() {
        let mut m = manifest();
        m.gcp.prefix.clear();
        let cmd = create_bucket_notification(&m);
        assert!(!cmd.args.iter().any(|a| a.starts_with("--object-prefix")));
    }

    #[test]
    fn test_topic_and_subscription() {
        let m = manifest();
        assert_eq!(
            create_topic(&m).to_string(),
            "gcloud pubsub topics create snowpipe-orders-topic --project=acme-data"
        );
        assert_eq!(
            create_subscription(&m).to_string(),
            "gcloud pubsub subscriptions create snowpipe-orders-sub --topic=snowpipe-orders-topic --project=acme-data"
        );
    }

    #[test]
    fn test_iam_grants() {
        let m = manifest();
        let sa = "abc123@gcpuscentral1-1dfa.iam.gserviceaccount.com";
        let read = grant_bucket_read(&m, sa);
        assert!(read.args.contains(&format!("--member=serviceAccount:{}", sa)));
        assert!(read.args.contains(&"--role=roles/storage.objectViewer".to_string()));

        let sub = grant_subscriber(&m, sa);
        assert_eq!(sub.args[3], "snowpipe-orders-sub");
        assert!(sub.args.contains(&"--role=roles/pubsub.subscriber".to_string()));

        let mon = grant_monitoring_viewer(&m, sa);
        assert_eq!(mon.args[..3], ["projects", "add-iam-policy-binding", "acme-data"]);
    }

    #[test]
    fn test_serializes_as_arg_list() {
        let json = serde_json::to_value(create_topic(&manifest())).unwrap();
        assert_eq!(json[0], "pubsub");
        assert_eq!(json.as_array().unwrap().len(), 5);
    }
}
