use hana_testsupport::*;
use reqwest::StatusCode;

#[tokio::test(flavor = "multi_thread")]
async fn csv_round_trip_through_the_server() -> anyhow::Result<()> {
    let daemon = spawn_daemon(None).await?;
    let client = HanaClient::new(daemon.base_url.clone());

    let res = client.get("/download/wholefoods/latest").await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let uploaded = client
        .upload_csv("wholefoods", "prices.csv", b"sku,price\n1,2.00\n")
        .await?;
    assert_eq!(uploaded["ok"], true);
    let stored_as = uploaded["stored_as"].as_str().unwrap().to_string();
    assert!(daemon.data_dir.path().join(&stored_as).exists());

    let bytes = client.download_latest("wholefoods").await?;
    assert_eq!(bytes, b"sku,price\n1,2.00\n");

    let err = client
        .upload_csv("wholefoods", "prices.txt", b"x")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("CSV only"));

    daemon.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn protected_exports_need_a_token() -> anyhow::Result<()> {
    let daemon = spawn_daemon(Some(ConfigOverride {
        require_auth: Some(true),
        ..Default::default()
    }))
    .await?;

    let anonymous = HanaClient::new(daemon.base_url.clone());
    assert!(anonymous
        .upload_csv("safeway", "prices.csv", b"a,b\n")
        .await
        .is_err());

    let mut client = HanaClient::new(daemon.base_url.clone());
    client.login(TEST_ADMIN, TEST_ADMIN_PASSWORD).await?;
    client.upload_csv("safeway", "prices.csv", b"a,b\n").await?;
    assert_eq!(client.download_latest("safeway").await?, b"a,b\n");

    daemon.stop().await?;
    Ok(())
}
