use clap::builder::TypedValueParser as _;
use clap::Parser;
use log::LevelFilter;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;
use webhook_auth::SanitizationOptions;

/// Providers that can be configured through dedicated secret flags.
pub const CONFIGURABLE_PROVIDERS: [&str; 4] = ["stripe", "clerk", "github", "paypal"];

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Signing secret for Stripe webhooks (stripe-signature header).
    #[arg(long, env)]
    stripe_webhook_secret: Option<SecretString>,

    /// Signing secret for Clerk webhooks, delivered through Svix (svix-signature header).
    #[arg(long, env)]
    clerk_webhook_secret: Option<SecretString>,

    /// Signing secret for GitHub webhooks (x-hub-signature-256 header).
    #[arg(long, env)]
    github_webhook_secret: Option<SecretString>,

    /// Signing secret for PayPal webhooks (paypal-transmission-sig header).
    #[arg(long, env)]
    paypal_webhook_secret: Option<SecretString>,

    /// Accepted distance in seconds between a signed timestamp and now, for every provider
    #[arg(long, env, default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub webhook_timestamp_tolerance_secs: u64,

    /// Nesting depth beyond which payload values are replaced by a placeholder
    #[arg(long, env, default_value_t = 10)]
    pub sanitizer_max_depth: usize,

    /// Maximum characters kept from any payload string
    #[arg(long, env, default_value_t = 10_000)]
    pub sanitizer_max_string_length: usize,

    /// Maximum elements kept from any payload array
    #[arg(long, env, default_value_t = 1000)]
    pub sanitizer_max_array_length: usize,

    /// Maximum keys kept from any payload object
    #[arg(long, env, default_value_t = 100)]
    pub sanitizer_max_object_keys: usize,

    /// Additional payload keys to drop, case-insensitively.
    #[arg(long, env, value_delimiter = ',', use_value_delimiter = true)]
    pub sanitizer_blocked_keys: Vec<String>,

    /// When set, only these payload keys are kept.
    #[arg(long, env, value_delimiter = ',', use_value_delimiter = true)]
    pub sanitizer_allowed_keys: Option<Vec<String>>,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Config {
    pub fn set_webhook_secret(mut self, provider: &str, secret: String) -> Self {
        let secret = Some(SecretString::new(secret));
        match provider {
            "stripe" => self.stripe_webhook_secret = secret,
            "clerk" => self.clerk_webhook_secret = secret,
            "github" => self.github_webhook_secret = secret,
            "paypal" => self.paypal_webhook_secret = secret,
            _ => {}
        }
        self
    }

    /// Returns the signing secret configured for `provider`, if any.
    pub fn webhook_secret(&self, provider: &str) -> Option<&str> {
        let secret = match provider {
            "stripe" => self.stripe_webhook_secret.as_ref(),
            "clerk" => self.clerk_webhook_secret.as_ref(),
            "github" => self.github_webhook_secret.as_ref(),
            "paypal" => self.paypal_webhook_secret.as_ref(),
            _ => None,
        };
        secret.map(|s| s.expose_secret().as_str())
    }

    /// Returns the sanitizer bounds assembled from the `sanitizer_*` settings.
    pub fn sanitization_options(&self) -> SanitizationOptions {
        SanitizationOptions {
            max_depth: self.sanitizer_max_depth,
            max_string_length: self.sanitizer_max_string_length,
            max_array_length: self.sanitizer_max_array_length,
            max_object_keys: self.sanitizer_max_object_keys,
            allowed_keys: self.sanitizer_allowed_keys.clone(),
            blocked_keys: self.sanitizer_blocked_keys.clone(),
        }
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
