//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use elastic_upstream::config::{Config, GroupConfig};
use elastic_upstream::registry::{ReloadError, ReloadOutput, Reloader};

/// Reloader that counts invocations and can be told to fail.
#[derive(Default)]
pub struct FakeReloader {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    /// Artificial reload latency, to widen race windows.
    pub delay: Option<Duration>,
}

impl FakeReloader {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Reloader for FakeReloader {
    async fn reload(&self) -> Result<ReloadOutput, ReloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            Err(ReloadError::NonZeroExit {
                code: Some(1),
                output: "nginx: [emerg] test failure".into(),
            })
        } else {
            Ok(ReloadOutput::default())
        }
    }
}

/// Reloader that, after a delay, records the artifact it was asked to load.
pub struct SnapshotReloader {
    artifact: PathBuf,
    delay: Duration,
    pub snapshots: std::sync::Mutex<Vec<String>>,
}

impl SnapshotReloader {
    pub fn new(artifact: PathBuf, delay: Duration) -> Self {
        Self {
            artifact,
            delay,
            snapshots: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Reloader for SnapshotReloader {
    async fn reload(&self) -> Result<ReloadOutput, ReloadError> {
        tokio::time::sleep(self.delay).await;
        let content = tokio::fs::read_to_string(&self.artifact).await.unwrap_or_default();
        self.snapshots.lock().unwrap().push(content);
        Ok(ReloadOutput::default())
    }
}

pub const TOPIC: &str = "arn:test";

/// Group `backend-<i>` keyed `arn:asg-<i>`, stored under `root`.
pub fn group(root: &Path, i: usize) -> GroupConfig {
    let name = format!("backend-{i}");
    GroupConfig {
        key: format!("arn:asg-{i}"),
        artifact_path: root.join(format!("{name}.upstream")),
        member_dir: root.join(&name),
        name,
    }
}

pub fn groups(root: &Path, count: usize) -> Vec<GroupConfig> {
    (0..count).map(|i| group(root, i)).collect()
}

/// Two groups, admin enabled with key `secret`, addresses from a template.
pub fn test_config(root: &Path) -> Config {
    let mut config = Config {
        topic_arn: TOPIC.into(),
        groups: groups(root, 2),
        ..Config::default()
    };
    config.admin.enabled = true;
    config.admin.api_key = "secret".into();
    config.resolver.template = Some("{member_id}.internal.invalid".into());
    config
}

pub fn artifact_path(root: &Path, i: usize) -> PathBuf {
    root.join(format!("backend-{i}.upstream"))
}

pub fn read_artifact(root: &Path, i: usize) -> String {
    std::fs::read_to_string(artifact_path(root, i)).unwrap()
}

/// Envelope carrying a lifecycle message.
pub fn notification(topic: &str, group_arn: &str, event: &str, instance: &str) -> Vec<u8> {
    let message = serde_json::json!({
        "AutoScalingGroupARN": group_arn,
        "Event": event,
        "EC2InstanceId": instance,
    });
    serde_json::to_vec(&serde_json::json!({
        "Type": "Notification",
        "TopicArn": topic,
        "Message": message.to_string(),
    }))
    .unwrap()
}

pub fn launch(group_arn: &str, instance: &str) -> Vec<u8> {
    notification(TOPIC, group_arn, "autoscaling:EC2_INSTANCE_LAUNCH", instance)
}

pub fn terminate(group_arn: &str, instance: &str) -> Vec<u8> {
    notification(TOPIC, group_arn, "autoscaling:EC2_INSTANCE_TERMINATE", instance)
}

/// Start a programmable mock HTTP endpoint; `f` runs once per request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}
