//! Real-socket serving, startup wiring and graceful shutdown.

mod common;

use std::time::Duration;

use tokio::net::TcpListener;

use common::{launch, read_artifact, test_config};
use elastic_upstream::lifecycle::{bootstrap, startup, Shutdown};
use elastic_upstream::HttpServer;

#[cfg(unix)]
#[tokio::test]
async fn test_serves_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.reload.command = vec!["true".into()];

    let services = bootstrap(&config).unwrap();
    startup::resync_on_start(&services.engine).await;
    assert_eq!(read_artifact(dir.path(), 0), "upstream backend-0 {\n}\n");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = tokio::spawn(
        HttpServer::new(&config, services.dispatcher).run(listener, shutdown.subscribe()),
    );

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .post(format!("http://{addr}/"))
        .body(launch("arn:asg-0", "i-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "Added instance \"i-1\" to group \"backend-0\".");
    assert!(read_artifact(dir.path(), 0).contains("i-1.internal.invalid"));

    drop(client);

    assert_eq!(shutdown.trigger(), 1);
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

#[test]
fn test_bootstrap_rejects_empty_reload_command() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.reload.command.clear();
    assert!(bootstrap(&config).is_err());
}
