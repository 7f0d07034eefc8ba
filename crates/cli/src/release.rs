use anyhow::{bail, Context, Result};
use chrono::Utc;
use hana_models::{is_valid_release_version, Config, ReleaseInfo, ReleaseManifest};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info, warn};

pub const DEFAULT_VERIFY_URL: &str = "https://hana-auth.fly.dev";
const DEPLOY_SETTLE: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct ReleaseParams {
    pub version: String,
    pub changelog: String,
    pub manifest_path: PathBuf,
    pub deploy: bool,
    pub verify_url: Option<String>,
    pub assume_yes: bool,
}

pub async fn run(config: &Config, params: ReleaseParams) -> Result<()> {
    if !is_valid_release_version(&params.version) {
        bail!("Version should be in format X.Y.Z (e.g. 1.0.1), got {}", params.version);
    }
    if params.deploy && !Path::new("fly.toml").exists() {
        bail!("fly.toml not found. Run the release from the server directory");
    }
    if params.deploy && !params.assume_yes && !confirm(&params)? {
        println!("Deployment cancelled.");
        return Ok(());
    }

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let manifest = write_manifest(
        &params.manifest_path,
        config.fallback_release(),
        &params.version,
        &params.changelog,
        &today,
    )
    .await?;
    println!(
        "Updated {} to v{} ({})",
        params.manifest_path.display(),
        manifest.version,
        manifest.download_url()
    );

    if params.deploy {
        deploy(&params).await?;
    }

    let verify_url = match (&params.verify_url, params.deploy) {
        (Some(url), _) => Some(url.clone()),
        (None, true) => Some(DEFAULT_VERIFY_URL.to_string()),
        (None, false) => None,
    };
    if let Some(url) = verify_url {
        if params.deploy {
            info!("Waiting {}s for the deployment to settle", DEPLOY_SETTLE.as_secs());
            tokio::time::sleep(DEPLOY_SETTLE).await;
        }
        verify(&url, &params.version).await;
    }

    Ok(())
}

/// Loads the current manifest (or `fallback` when none exists yet), stamps the new
/// release onto it and writes it back.
pub async fn write_manifest(
    path: &Path,
    fallback: ReleaseManifest,
    version: &str,
    changelog: &str,
    release_date: &str,
) -> Result<ReleaseManifest> {
    let mut manifest = match tokio::fs::read_to_string(path).await {
        Ok(raw) => ReleaseManifest::from_toml(&raw)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => fallback,
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };

    manifest.version = version.to_string();
    manifest.changelog = changelog.to_string();
    manifest.release_date = release_date.to_string();

    tokio::fs::write(path, manifest.to_toml()?)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(manifest)
}

fn confirm(params: &ReleaseParams) -> Result<bool> {
    println!("About to deploy server for version {}", params.version);
    println!("Changelog: {}", params.changelog);
    println!("Make sure the desktop build and its GitHub release for v{} exist.", params.version);
    print!("Continue with server deployment? (y/N): ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

async fn deploy(params: &ReleaseParams) -> Result<()> {
    let manifest = params.manifest_path.display().to_string();
    let message = format!("Update server to support v{}", params.version);

    // Git problems (nothing to commit, no remote) do not block the deploy.
    for args in [
        vec!["add", manifest.as_str()],
        vec!["commit", "-m", message.as_str()],
        vec!["push"],
    ] {
        match run_command("git", &args).await {
            Ok(true) => {}
            Ok(false) => warn!("git {} exited with a failure status", args[0]),
            Err(e) => warn!("git {} could not run: {}", args[0], e),
        }
    }

    if !run_command("fly", &["deploy"]).await? {
        error!("fly deploy failed");
        bail!("Failed to deploy to Fly.io");
    }
    info!("fly deploy finished");
    Ok(())
}

async fn run_command(program: &str, args: &[&str]) -> Result<bool> {
    println!("Running: {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("spawning {program}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        println!("{}", stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        eprintln!("{}", stderr.trim_end());
    }
    Ok(output.status.success())
}

/// Problems here are reported, never fatal: the server may still be starting.
async fn verify(base_url: &str, expected: &str) {
    let url = format!("{}/version", base_url.trim_end_matches('/'));
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Could not build HTTP client: {}", e);
            return;
        }
    };

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Could not verify server deployment: {}. Check manually: curl {}", e, url);
            return;
        }
    };
    if !response.status().is_success() {
        warn!("Server returned status {} for {}", response.status(), url);
        return;
    }

    match response.json::<ReleaseInfo>().await {
        Ok(info) if info.version == expected => {
            println!("Server deployed successfully: {} serves v{}", url, info.version);
            println!("Download URL: {}", info.download_url);
        }
        Ok(info) => warn!(
            "Server shows version {}, expected {}. It may still be rolling out",
            info.version, expected
        ),
        Err(e) => warn!("Unexpected /version response: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> ReleaseManifest {
        ReleaseManifest {
            version: "0.1.65".into(),
            download_url_template: "https://example.com/v{version}/HanaTool-{version}.zip".into(),
            release_date: "2025-11-13".into(),
            required: false,
            changelog: "old".into(),
        }
    }

    #[tokio::test]
    async fn first_release_starts_from_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");

        let manifest = write_manifest(&path, fallback(), "0.1.66", "New export", "2026-01-02")
            .await
            .unwrap();
        assert_eq!(manifest.version, "0.1.66");
        assert_eq!(manifest.release_date, "2026-01-02");
        assert_eq!(
            manifest.download_url(),
            "https://example.com/v0.1.66/HanaTool-0.1.66.zip"
        );

        let on_disk = ReleaseManifest::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, manifest);
    }

    #[tokio::test]
    async fn existing_manifest_keeps_its_template_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");

        let mut existing = fallback();
        existing.required = true;
        existing.download_url_template = "https://mirror.example/{version}.zip".into();
        std::fs::write(&path, existing.to_toml().unwrap()).unwrap();

        let manifest = write_manifest(&path, fallback(), "0.2.0", "Quoted \"notes\"", "2026-02-03")
            .await
            .unwrap();
        assert!(manifest.required);
        assert_eq!(manifest.changelog, "Quoted \"notes\"");
        assert_eq!(manifest.download_url(), "https://mirror.example/0.2.0.zip");
    }

    #[tokio::test]
    async fn rejects_malformed_versions_before_touching_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");
        let params = ReleaseParams {
            version: "1.0.x".into(),
            changelog: "nope".into(),
            manifest_path: path.clone(),
            deploy: false,
            verify_url: None,
            assume_yes: true,
        };

        assert!(run(&Config::default(), params).await.is_err());
        assert!(!path.exists());
    }
}
