use hana_testsupport::*;
use reqwest::StatusCode;

#[tokio::test(flavor = "multi_thread")]
async fn admin_lifecycle_over_http() -> anyhow::Result<()> {
    let daemon = spawn_daemon(None).await?;
    let mut admin = HanaClient::new(daemon.base_url.clone());
    admin.login(TEST_ADMIN, TEST_ADMIN_PASSWORD).await?;

    let created = admin.create_user("worker", "worker-pass").await?;
    assert_eq!(created["msg"], "user added");

    let mut worker = HanaClient::new(daemon.base_url.clone());
    worker.login("worker", "worker-pass").await?;
    assert_eq!(worker.verify().await?["user"], "worker");

    // Plain users cannot reach the admin routes.
    let res = worker.get("/admin/users").await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let promoted = admin.promote("worker").await?;
    assert_eq!(promoted["msg"], "worker promoted");
    let res = worker.get("/admin/users").await?;
    assert_eq!(res.status(), StatusCode::OK);

    let listed = admin.list_users().await?;
    let names: Vec<&str> = listed["users"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["name"].as_str())
        .collect();
    assert_eq!(names, vec!["admin", "worker"]);

    admin.delete_user("worker").await?;
    let res = worker.get("/verify").await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    daemon.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_login_is_rejected() -> anyhow::Result<()> {
    let daemon = spawn_daemon(None).await?;
    let mut client = HanaClient::new(daemon.base_url.clone());

    let err = client.login(TEST_ADMIN, "wrong").await.unwrap_err();
    assert!(err.to_string().contains("Bad creds"));
    assert!(client.token().is_none());

    daemon.stop().await?;
    Ok(())
}
