// config.rs
use clap::Parser;
use dotenv::dotenv;
use ini::Ini;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const DEFAULTS_SECTION: &str = "Defaults";
const DEFAULT_REGION: &str = "us-east-1";

/// Environment fallbacks, consulted after flags and the config file.
const ENV_FALLBACKS: &[(&str, &str)] = &[
    ("key", "AWS_ACCESS_KEY_ID"),
    ("secret", "AWS_SECRET_ACCESS_KEY"),
    ("region", "AWS_REGION"),
    ("endpoint", "AWS_ENDPOINT_URL"),
];

/// Downloads a file from a URL and uploads it to Amazon S3.
#[derive(Parser, Debug, Default)]
#[command(version, about)]
pub struct Args {
    /// Specify a config file
    #[arg(short = 'c', long = "conf_file", value_name = "FILE")]
    pub conf_file: Option<PathBuf>,

    /// The URL to be downloaded.
    #[arg(short = 'i', long = "input_file")]
    pub input_file: Option<String>,

    /// The S3 key where the data will be stored.
    #[arg(short = 'o', long = "output_key")]
    pub output_key: Option<String>,

    /// The S3 bucket where files will be stored.
    #[arg(short = 'b', long = "bucket")]
    pub bucket: Option<String>,

    /// The key for accessing S3.
    #[arg(short = 'k', long = "key")]
    pub key: Option<String>,

    /// The secret for accessing S3.
    #[arg(short = 's', long = "secret")]
    pub secret: Option<String>,

    /// The mimetype of the file stored on S3.
    #[arg(short = 'm', long = "mime_type")]
    pub mime_type: Option<String>,

    /// The access control permissions for the file stored on S3.
    #[arg(short = 'a', long = "acl")]
    pub acl: Option<String>,

    /// Overwrite an existing key.
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Compress the output before placing it on S3.
    #[arg(short = 'z', long = "compress")]
    pub compress: bool,

    /// If set, the contents of the downloaded file are passed to the named function via jsonp.
    #[arg(long = "jsonp_callback_function")]
    pub jsonp_callback_function: Option<String>,

    /// Region of the bucket.
    #[arg(long = "region")]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint.
    #[arg(long = "endpoint")]
    pub endpoint: Option<String>,

    /// Exit with a non-zero status when the mirror fails.
    #[arg(long = "strict")]
    pub strict: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: ini::Error,
    },
    #[error("config file {0} has no [Defaults] section")]
    NoDefaults(PathBuf),
    #[error("missing required argument --{0}")]
    Missing(&'static str),
    #[error("invalid boolean for {key}: {value}")]
    Bool { key: &'static str, value: String },
    #[error("unknown acl: {0}")]
    Acl(String),
}

/// Canned ACLs accepted by S3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    AwsExecRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
    LogDeliveryWrite,
}

impl CannedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
            CannedAcl::AwsExecRead => "aws-exec-read",
            CannedAcl::BucketOwnerRead => "bucket-owner-read",
            CannedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
            CannedAcl::LogDeliveryWrite => "log-delivery-write",
        }
    }
}

impl FromStr for CannedAcl {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "private" => CannedAcl::Private,
            "public-read" => CannedAcl::PublicRead,
            "public-read-write" => CannedAcl::PublicReadWrite,
            "authenticated-read" => CannedAcl::AuthenticatedRead,
            "aws-exec-read" => CannedAcl::AwsExecRead,
            "bucket-owner-read" => CannedAcl::BucketOwnerRead,
            "bucket-owner-full-control" => CannedAcl::BucketOwnerFullControl,
            "log-delivery-write" => CannedAcl::LogDeliveryWrite,
            other => return Err(ConfigError::Acl(other.to_string())),
        })
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to reach the destination bucket.
#[derive(Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub access_key: String,
    pub secret: String,
    pub region: String,
    pub endpoint: Option<String>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret", &"***")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Parameters of a single mirror run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorParams {
    pub source_url: String,
    pub dest_key: String,
    pub mime_type: String,
    pub acl: CannedAcl,
    pub overwrite: bool,
    pub compress: bool,
    pub jsonp_callback: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub mirror: MirrorParams,
    pub strict: bool,
}

/// `[Defaults]` values from the config file, keyed by long flag name.
#[derive(Debug, Default, Clone)]
pub struct Defaults(HashMap<String, String>);

impl Defaults {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let section = ini
            .section(Some(DEFAULTS_SECTION))
            .ok_or_else(|| ConfigError::NoDefaults(path.to_path_buf()))?;
        Ok(Defaults(
            section
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
        ))
    }

    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }

    fn flag(&self, key: &'static str) -> Result<bool, ConfigError> {
        match self.0.get(key) {
            None => Ok(false),
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Bool {
                    key,
                    value: v.clone(),
                }),
            },
        }
    }
}

impl FromIterator<(String, String)> for Defaults {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Defaults(iter.into_iter().collect())
    }
}

/// Picks each value from the flags, then the config file, then the environment.
pub fn resolve(
    args: Args,
    defaults: &Defaults,
    env: &HashMap<String, String>,
) -> Result<Config, ConfigError> {
    let lookup = |value: Option<String>, name: &'static str| {
        if value.is_some() {
            return value;
        }
        if let Some(v) = defaults.get(name) {
            debug!("Using {} from config file", name);
            return Some(v);
        }
        let var = ENV_FALLBACKS
            .iter()
            .find(|(flag, _)| *flag == name)
            .and_then(|(_, var)| env.get(*var).map(|v| (*var, v.clone())));
        var.map(|(var, v)| {
            debug!("Using {} from ${}", name, var);
            v
        })
    };
    let required = |value: Option<String>, name: &'static str| {
        lookup(value, name).ok_or(ConfigError::Missing(name))
    };

    let source_url = required(args.input_file, "input_file")?;
    let dest_key = required(args.output_key, "output_key")?;
    let bucket = required(args.bucket, "bucket")?;
    let access_key = required(args.key, "key")?;
    let secret = required(args.secret, "secret")?;
    let mime_type = required(args.mime_type, "mime_type")?;
    let acl = required(args.acl, "acl")?.parse()?;

    let region = lookup(args.region, "region").unwrap_or_else(|| DEFAULT_REGION.to_string());
    let endpoint = lookup(args.endpoint, "endpoint");
    let jsonp_callback = lookup(args.jsonp_callback_function, "jsonp_callback_function")
        .filter(|name| !name.is_empty());

    Ok(Config {
        storage: StorageConfig {
            bucket,
            access_key,
            secret,
            region,
            endpoint,
        },
        mirror: MirrorParams {
            source_url,
            dest_key,
            mime_type,
            acl,
            overwrite: args.force || defaults.flag("force")?,
            compress: args.compress || defaults.flag("compress")?,
            jsonp_callback,
        },
        strict: args.strict || defaults.flag("strict")?,
    })
}

pub fn load_config() -> anyhow::Result<Config> {
    dotenv().ok();
    let args = Args::parse();
    let defaults = match &args.conf_file {
        Some(path) => Defaults::load(path)?,
        None => Defaults::default(),
    };
    let env: HashMap<String, String> = std::env::vars().collect();
    Ok(resolve(args, &defaults, &env)?)
}
