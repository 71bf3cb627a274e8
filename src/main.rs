// main.rs
use crate::config::Config;
use crate::fetch::HttpFetcher;
use crate::mirror::{MirrorError, Outcome};
use crate::storage::S3Bucket;
use std::process::ExitCode;
use tracing::{error, info};

mod config;
mod fetch;
mod logging;
mod mirror;
mod progress;
mod storage;
mod transform;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init()?;
    let cfg: Config = config::load_config()?;

    let bucket = S3Bucket::new(&cfg.storage);
    let fetcher = HttpFetcher::new();

    let result = mirror::run(&bucket, &fetcher, &cfg.mirror).await;
    log_result(&result, &cfg);
    Ok(ExitCode::from(exit_status(&result, cfg.strict)))
}

/// Failures are soft unless `--strict` is given.
fn exit_status(result: &Result<Outcome, MirrorError>, strict: bool) -> u8 {
    match result {
        Err(_) if strict => 1,
        _ => 0,
    }
}

fn log_result(result: &Result<Outcome, MirrorError>, cfg: &Config) {
    match result {
        Ok(Outcome::Skipped { key }) => info!("Skipping {} - already exists", key),
        Ok(Outcome::Published { key, bytes }) => info!(
            "Finished uploading {} bytes to {} ({})",
            bytes, key, cfg.mirror.acl
        ),
        Err(MirrorError::Fetch { key, source }) => {
            error!("There was an error downloading for {}: {}", key, source)
        }
        Err(MirrorError::Check { key, source } | MirrorError::Publish { key, source }) => {
            error!("There was an error uploading to {}: {}", key, source)
        }
        Err(MirrorError::Compress { key, source }) => {
            error!("There was an error compressing for {}: {}", key, source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;

    fn fetch_failure() -> Result<Outcome, MirrorError> {
        Err(MirrorError::Fetch {
            key: "feed.js".into(),
            source: FetchError::Status {
                url: "http://origin.test/feed".into(),
                status: reqwest::StatusCode::NOT_FOUND,
            },
        })
    }

    fn publish_failure() -> Result<Outcome, MirrorError> {
        Err(MirrorError::Publish {
            key: "feed.js".into(),
            source: "403 AccessDenied".into(),
        })
    }

    #[test]
    fn test_soft_failures_exit_zero() {
        assert_eq!(exit_status(&fetch_failure(), false), 0);
        assert_eq!(exit_status(&publish_failure(), false), 0);
    }

    #[test]
    fn test_strict_failures_exit_one() {
        assert_eq!(exit_status(&fetch_failure(), true), 1);
        assert_eq!(exit_status(&publish_failure(), true), 1);
    }

    #[test]
    fn test_success_and_skip_exit_zero() {
        let published = Ok(Outcome::Published {
            key: "feed.js".into(),
            bytes: 5,
        });
        let skipped = Ok(Outcome::Skipped {
            key: "feed.js".into(),
        });
        for strict in [false, true] {
            assert_eq!(exit_status(&published, strict), 0);
            assert_eq!(exit_status(&skipped, strict), 0);
        }
    }
}
