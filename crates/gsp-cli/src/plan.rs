//! Provisioning plan
//!
//! A plan is the ordered list of Snowflake statements and gcloud commands
//! that bring the pipeline up (or tear it down). Each step depends on the
//! objects created by the steps before it, so steps are applied strictly in
//! order.
//!
//! Provisioning runs in two phases. The pipe binds to the subscription
//! through the notification integration, so the integrations' service
//! accounts must hold their IAM grants before `CREATE PIPE` runs:
//!
//! 1. table, storage integration, stage, topic, bucket notification,
//!    subscription, notification integration
//! 2. (IAM grants from `DESC INTEGRATION`) then the pipe

use crate::ddl::{self, CreateMode};
use crate::error::Result;
use crate::gcp::{self, CommandRunner, GcloudCommand};
use crate::manifest::PipelineManifest;
use crate::snowflake::SqlExecutor;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Kind of object a step creates or drops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Table,
    StorageIntegration,
    Stage,
    Topic,
    BucketNotification,
    Subscription,
    NotificationIntegration,
    Pipe,
    IamBinding,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Table => "table",
            StepKind::StorageIntegration => "storage integration",
            StepKind::Stage => "stage",
            StepKind::Topic => "topic",
            StepKind::BucketNotification => "bucket notification",
            StepKind::Subscription => "subscription",
            StepKind::NotificationIntegration => "notification integration",
            StepKind::Pipe => "pipe",
            StepKind::IamBinding => "iam binding",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a step runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", content = "statement", rename_all = "snake_case")]
pub enum Action {
    Snowflake(String),
    Gcloud(GcloudCommand),
}

/// One provisioning step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub kind: StepKind,
    pub name: String,
    #[serde(flatten)]
    pub action: Action,
}

impl Step {
    fn sql(kind: StepKind, name: impl Into<String>, statement: String) -> Self {
        Self {
            kind,
            name: name.into(),
            action: Action::Snowflake(statement),
        }
    }

    fn gcloud(kind: StepKind, name: impl Into<String>, command: GcloudCommand) -> Self {
        Self {
            kind,
            name: name.into(),
            action: Action::Gcloud(command),
        }
    }

    pub fn is_gcloud(&self) -> bool {
        matches!(self.action, Action::Gcloud(_))
    }

    /// Statement or command line as displayed to the user
    pub fn describe(&self, gcloud_bin: &str) -> String {
        match &self.action {
            Action::Snowflake(sql) => sql.clone(),
            Action::Gcloud(cmd) => cmd.to_shell(gcloud_bin),
        }
    }

    /// Run the step against Snowflake or gcloud
    pub async fn apply(&self, sql: &dyn SqlExecutor, runner: &dyn CommandRunner) -> Result<()> {
        info!(kind = %self.kind, name = %self.name, "Applying step");
        match &self.action {
            Action::Snowflake(statement) => {
                if self.kind == StepKind::Table {
                    ddl::check_sql(statement)?;
                }
                sql.execute(statement).await?;
            }
            Action::Gcloud(command) => {
                runner.run(command).await?;
            }
        }
        Ok(())
    }
}

/// Output format of a rendered plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PlanFormat {
    /// SQL script; gcloud steps appear as comments
    #[default]
    Sql,
    /// Shell script; Snowflake steps appear as comments
    Shell,
    Json,
}

/// Ordered provisioning or teardown steps
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProvisioningPlan {
    pub steps: Vec<Step>,
}

impl ProvisioningPlan {
    /// Steps that create the pipeline described by `manifest`
    pub fn from_manifest(manifest: &PipelineManifest, mode: CreateMode) -> Result<Self> {
        let sf = &manifest.snowflake;
        let location = manifest.location()?;
        let table = manifest.table_fqn();
        let stage = manifest.stage_fqn();
        let pipe = manifest.pipe_fqn();

        let steps = vec![
            Step::sql(
                StepKind::Table,
                &table,
                ddl::create_table(&table, &manifest.landing_schema(), mode),
            ),
            Step::sql(
                StepKind::StorageIntegration,
                sf.storage_integration.as_str(),
                ddl::create_storage_integration(&sf.storage_integration, &location, mode),
            ),
            Step::sql(
                StepKind::Stage,
                &stage,
                ddl::create_stage(&stage, &location, &sf.storage_integration, mode),
            ),
            Step::gcloud(StepKind::Topic, &manifest.gcp.topic, gcp::create_topic(manifest)),
            Step::gcloud(
                StepKind::BucketNotification,
                location.bucket_url(),
                gcp::create_bucket_notification(manifest),
            ),
            Step::gcloud(
                StepKind::Subscription,
                &manifest.gcp.subscription,
                gcp::create_subscription(manifest),
            ),
            Step::sql(
                StepKind::NotificationIntegration,
                sf.notification_integration.as_str(),
                ddl::create_notification_integration(
                    &sf.notification_integration,
                    &manifest.subscription_path(),
                    mode,
                ),
            ),
            Step::sql(
                StepKind::Pipe,
                &pipe,
                ddl::create_pipe(
                    &pipe,
                    &sf.notification_integration,
                    &table,
                    &stage,
                    &sf.file_format,
                    mode,
                ),
            ),
        ];

        Ok(Self { steps })
    }

    /// Index of the first step that needs the IAM grants in place
    fn grant_point(&self) -> usize {
        self.steps
            .iter()
            .position(|s| s.kind == StepKind::Pipe)
            .unwrap_or(self.steps.len())
    }

    /// Steps before and from the grant point
    pub fn phases(&self) -> (&[Step], &[Step]) {
        self.steps.split_at(self.grant_point())
    }

    /// Drop the Snowflake objects in reverse dependency order
    ///
    /// The landing table holds loaded data and is only dropped on request.
    pub fn teardown(manifest: &PipelineManifest, include_table: bool) -> Self {
        let sf = &manifest.snowflake;
        let mut steps = vec![
            Step::sql(StepKind::Pipe, manifest.pipe_fqn(), ddl::drop_object("PIPE", &manifest.pipe_fqn())),
            Step::sql(
                StepKind::NotificationIntegration,
                sf.notification_integration.as_str(),
                ddl::drop_object("INTEGRATION", sf.notification_integration.as_str()),
            ),
            Step::sql(StepKind::Stage, manifest.stage_fqn(), ddl::drop_object("STAGE", &manifest.stage_fqn())),
            Step::sql(
                StepKind::StorageIntegration,
                sf.storage_integration.as_str(),
                ddl::drop_object("INTEGRATION", sf.storage_integration.as_str()),
            ),
        ];
        if include_table {
            steps.push(Step::sql(
                StepKind::Table,
                manifest.table_fqn(),
                ddl::drop_object("TABLE", &manifest.table_fqn()),
            ));
        }
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Drop gcloud steps (GCP side managed elsewhere)
    pub fn without_gcloud(mut self) -> Self {
        self.steps.retain(|s| !s.is_gcloud());
        self
    }

    pub fn render(&self, format: PlanFormat, gcloud_bin: &str) -> Result<String> {
        Ok(match format {
            PlanFormat::Sql => self.render_sql(gcloud_bin),
            PlanFormat::Shell => self.render_shell(gcloud_bin),
            PlanFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }

    /// Grants can only be rendered once the integrations exist
    fn grant_note(&self, index: usize) -> Option<&'static str> {
        let pending = index == self.grant_point()
            && self.steps[..index]
                .iter()
                .any(|s| s.kind == StepKind::NotificationIntegration);
        pending.then_some(
            "grant the service accounts from `gsp describe` (storage.objectViewer on the bucket, \
             pubsub.subscriber on the subscription) before creating the pipe",
        )
    }

    fn render_sql(&self, gcloud_bin: &str) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            if let Some(note) = self.grant_note(i) {
                out.push_str(&format!("-- NOTE: {}\n\n", note));
            }
            out.push_str(&format!("-- {}. {} {}\n", i + 1, step.kind, step.name));
            match &step.action {
                Action::Snowflake(sql) => out.push_str(&format!("{};\n\n", sql)),
                Action::Gcloud(cmd) => out.push_str(&format!("-- run: {}\n\n", cmd.to_shell(gcloud_bin))),
            }
        }
        out
    }

    fn render_shell(&self, gcloud_bin: &str) -> String {
        let mut out = String::from("#!/usr/bin/env bash\nset -euo pipefail\n\n");
        for (i, step) in self.steps.iter().enumerate() {
            if let Some(note) = self.grant_note(i) {
                out.push_str(&format!("# NOTE: {}\n\n", note));
            }
            out.push_str(&format!("# {}. {} {}\n", i + 1, step.kind, step.name));
            match &step.action {
                Action::Snowflake(sql) => {
                    for line in sql.lines() {
                        out.push_str(&format!("#   {}\n", line));
                    }
                    out.push('\n');
                }
                Action::Gcloud(cmd) => out.push_str(&format!("{}\n\n", cmd.to_shell(gcloud_bin))),
            }
        }
        out
    }
}

/// Grants for whichever service accounts are known
pub fn iam_grants(
    manifest: &PipelineManifest,
    storage_account: Option<&str>,
    pubsub_account: Option<&str>,
) -> Vec<Step> {
    let mut steps = Vec::new();
    if let Some(sa) = storage_account {
        steps.push(Step::gcloud(
            StepKind::IamBinding,
            format!("{} on gs://{}", gcp::STORAGE_READ_ROLE, manifest.gcp.bucket),
            gcp::grant_bucket_read(manifest, sa),
        ));
    }
    if let Some(sa) = pubsub_account {
        steps.push(Step::gcloud(
            StepKind::IamBinding,
            format!("{} on {}", gcp::PUBSUB_SUBSCRIBER_ROLE, manifest.gcp.subscription),
            gcp::grant_subscriber(manifest, sa),
        ));
        steps.push(Step::gcloud(
            StepKind::IamBinding,
            format!("{} on {}", gcp::MONITORING_VIEWER_ROLE, manifest.gcp.project_id),
            gcp::grant_monitoring_viewer(manifest, sa),
        ));
    }
    steps
}
