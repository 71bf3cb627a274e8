use bytes::Bytes;
use tracing::{debug, info};

use crate::config::MirrorParams;
use crate::fetch::{Fetch, FetchError};
use crate::progress::ProgressBody;
use crate::storage::{BoxError, Bucket};
use crate::transform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Published { key: String, bytes: usize },
    Skipped { key: String },
}

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("could not check whether {key} exists: {source}")]
    Check { key: String, source: BoxError },
    #[error("could not download for {key}: {source}")]
    Fetch { key: String, source: FetchError },
    #[error("could not compress payload for {key}: {source}")]
    Compress { key: String, source: std::io::Error },
    #[error("could not upload to {key}: {source}")]
    Publish { key: String, source: BoxError },
}

/// Downloads `params.source_url` and republishes it under `params.dest_key`.
pub async fn run<B, F>(
    bucket: &B,
    fetcher: &F,
    params: &MirrorParams,
) -> Result<Outcome, MirrorError>
where
    B: Bucket + ?Sized,
    F: Fetch + ?Sized,
{
    let key = params.dest_key.clone();

    // 1. existence check
    let found = bucket
        .exists(&key)
        .await
        .map_err(|source| MirrorError::Check {
            key: key.clone(),
            source,
        })?;
    if found && !params.overwrite {
        return Ok(Outcome::Skipped { key });
    }

    // 2. download into memory
    info!("Downloading from {}", params.source_url);
    let body = fetcher
        .fetch(&params.source_url)
        .await
        .map_err(|source| MirrorError::Fetch {
            key: key.clone(),
            source,
        })?;
    debug!("Downloaded {} bytes", body.len());

    // 3. jsonp, then gzip
    info!("Uploading to {}", key);
    let payload = prepare(body, params).map_err(|source| MirrorError::Compress {
        key: key.clone(),
        source,
    })?;
    let headers = transform::upload_headers(&params.mime_type, params.compress);

    // 4. publish, progress is logged as the client reads the body
    let bytes = payload.len();
    bucket
        .put(&key, ProgressBody::new(payload), &headers, params.acl)
        .await
        .map_err(|source| MirrorError::Publish {
            key: key.clone(),
            source,
        })?;

    Ok(Outcome::Published { key, bytes })
}

fn prepare(body: Bytes, params: &MirrorParams) -> std::io::Result<Bytes> {
    let body = match &params.jsonp_callback {
        Some(name) => Bytes::from(transform::jsonp_wrap(name, &body)),
        None => body,
    };
    if params.compress {
        Ok(Bytes::from(transform::gzip(&body)?))
    } else {
        Ok(body)
    }
}
