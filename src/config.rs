//! Process configuration.
//!
//! Every flag can also be supplied through a `GATEWAY_*` environment variable.

use crate::membership::scheduler::DEFAULT_REFRESH_PERIOD;
use crate::membership::types::ReputationMetric;
use crate::selection::policy::SelectionPolicy;
use crate::selection::types::{ReputationCeiling, TieBreak};

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "inference-gateway")]
#[command(about = "Fan text-detection requests out to the worker roster")]
#[command(version)]
pub struct GatewayConfig {
    /// Address the HTTP server listens on.
    #[arg(long, env = "GATEWAY_BIND", default_value = "0.0.0.0:18889")]
    pub bind: SocketAddr,

    /// Shared key expected in the `Auth` header.
    #[arg(long, env = "GATEWAY_AUTH_KEY", hide_env_values = true)]
    pub auth_key: Option<String>,

    /// Serve without authentication. Required when no auth key is set.
    #[arg(long, env = "GATEWAY_NO_AUTH")]
    pub no_auth: bool,

    /// Roster service URL (http/https) or path to a JSON roster file.
    #[arg(long, env = "GATEWAY_REGISTRY")]
    pub registry: String,

    /// Subnet whose roster is served.
    #[arg(long, env = "GATEWAY_NETUID", default_value_t = 32)]
    pub netuid: u16,

    /// Minutes between roster refreshes.
    #[arg(
        long,
        env = "GATEWAY_RESYNC_MINUTES",
        default_value_t = DEFAULT_REFRESH_PERIOD.as_secs() / 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub resync_minutes: u64,

    /// Also select workers that do not advertise a serving endpoint.
    #[arg(long, env = "GATEWAY_INCLUDE_IDLE")]
    pub include_idle: bool,

    /// Validators with more stake than this are never selected.
    #[arg(long, env = "GATEWAY_VALIDATOR_STAKE_CEILING", default_value_t = 1_000.0)]
    pub validator_stake_ceiling: f64,

    /// Disable the validator stake ceiling entirely.
    #[arg(long, env = "GATEWAY_NO_VALIDATOR_CEILING")]
    pub no_validator_ceiling: bool,

    /// Ordering of workers with equal ranking scores.
    #[arg(long, env = "GATEWAY_TIE_BREAK", value_enum, default_value_t = TieBreak::AscendingUid)]
    pub tie_break: TieBreak,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl GatewayConfig {
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.resync_minutes * 60)
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        let ceiling = if self.no_validator_ceiling {
            None
        } else {
            Some(ReputationCeiling {
                metric: ReputationMetric::Stake,
                threshold: self.validator_stake_ceiling,
            })
        };

        SelectionPolicy {
            require_serving: !self.include_idle,
            ceiling,
            tie_break: self.tie_break,
        }
    }

    /// The key every request must carry, or `None` when auth was explicitly
    /// disabled. Starting without either is refused.
    pub fn required_auth_key(&self) -> anyhow::Result<Option<&str>> {
        match (self.auth_key.as_deref(), self.no_auth) {
            (Some(_), true) => anyhow::bail!("--auth-key and --no-auth cannot be combined"),
            (Some(""), false) => anyhow::bail!("--auth-key must not be empty"),
            (Some(key), false) => Ok(Some(key)),
            (None, true) => Ok(None),
            (None, false) => {
                anyhow::bail!(
                    "No auth key configured: pass --auth-key, or --no-auth to serve openly"
                )
            }
        }
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug,hyper=info,reqwest=info"
        } else {
            "info"
        }
    }
}
