//! Pawlink Server: headless signaling relay
//!
//! Brokers offers, answers and ICE candidates between pet camera base
//! stations and remote viewers, and optionally serves the browser UI.
//!
//! ## Usage
//!
//! ```bash
//! # Start server (port 3000)
//! pawlink-server
//!
//! # Custom port, reject second answers
//! PAWLINK_WEB_PORT=8080 PAWLINK_ANSWER_POLICY=reject pawlink-server
//!
//! # Verbose logging
//! RUST_LOG=pawlink=debug pawlink-server
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use pawlink::relay::{AnswerPolicy, RelayConfig, SignalingRelay};

/// Server configuration from environment
struct Config {
    bind_addr: IpAddr,
    web_port: u16,
    /// 0 disables the idle reaper
    session_idle_secs: u64,
    reap_interval_secs: u64,
    answer_policy: AnswerPolicy,
    ui_path: Option<PathBuf>,
}

impl Config {
    fn from_env() -> Result<Self> {
        let bind_addr: IpAddr = std::env::var("PAWLINK_BIND_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let web_port: u16 = std::env::var("PAWLINK_WEB_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let session_idle_secs: u64 = std::env::var("PAWLINK_SESSION_IDLE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600);

        let reap_interval_secs: u64 = std::env::var("PAWLINK_REAP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(60);

        let answer_policy = match std::env::var("PAWLINK_ANSWER_POLICY") {
            Ok(raw) => raw.parse::<AnswerPolicy>().context("Invalid PAWLINK_ANSWER_POLICY")?,
            Err(_) => AnswerPolicy::default(),
        };

        let ui_path = std::env::var("PAWLINK_UI_PATH")
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                // Auto-detect: check common locations relative to binary
                let candidates = ["./ui/build", "../ui/build", "./out"];
                candidates.iter()
                    .map(PathBuf::from)
                    .find(|p| p.exists())
            });

        Ok(Self {
            bind_addr,
            web_port,
            session_idle_secs,
            reap_interval_secs,
            answer_policy,
            ui_path,
        })
    }

    fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            answer_policy: self.answer_policy,
            session_idle_timeout: Duration::from_secs(self.session_idle_secs),
            reap_interval: Duration::from_secs(self.reap_interval_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::from_env()?;

    info!("Pawlink signaling server starting");
    info!("  Bind: {}:{}", config.bind_addr, config.web_port);
    info!("  Answer policy: {:?}", config.answer_policy);
    if config.session_idle_secs > 0 {
        info!(
            "  Idle sessions reaped after {}s (sweep every {}s)",
            config.session_idle_secs, config.reap_interval_secs
        );
    } else {
        info!("  Idle reaping: disabled (set PAWLINK_SESSION_IDLE_SECS to enable)");
    }
    if let Some(ref ui_path) = config.ui_path {
        info!("  UI path: {:?}", ui_path);
    }

    let relay = SignalingRelay::new(config.relay_config());

    // Graceful shutdown
    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();

    // Spawn idle-session reaper
    let reaper_relay = relay.clone();
    let reaper_cancel = cancel.clone();
    tracker.spawn(async move {
        reaper_relay.run_reaper(reaper_cancel).await;
    });

    // Spawn web server
    let web_relay = relay.clone();
    let web_bind = SocketAddr::new(config.bind_addr, config.web_port);
    let web_ui_path = config.ui_path.clone();
    let web_cancel = cancel.clone();
    tracker.spawn(async move {
        tokio::select! {
            result = pawlink::web::start(web_relay, web_bind, web_ui_path) => {
                if let Err(e) = result {
                    error!("Web server error: {:#}", e);
                    web_cancel.cancel();
                }
            }
            _ = web_cancel.cancelled() => {
                info!("Web server: shutting down");
            }
        }
    });

    tracker.close();

    run_headless(relay, cancel, tracker).await
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pawlink=info,pawlink_server=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Headless mode: log stats periodically, shut down on SIGINT or a fatal task error
async fn run_headless(
    relay: SignalingRelay,
    cancel: CancellationToken,
    tracker: TaskTracker,
) -> Result<()> {
    info!("Waiting for peers...");
    let mut stats_interval = interval(Duration::from_secs(30));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                cancel.cancel();
                break;
            }
            _ = cancel.cancelled() => {
                warn!("A server task stopped, shutting down");
                break;
            }
            _ = stats_interval.tick() => {
                let stats = relay.stats();
                let sessions = match relay.sessions().await {
                    Ok(n) => n,
                    Err(e) => {
                        warn!("Could not count sessions: {}", e);
                        0
                    }
                };
                info!(
                    "Stats: {} sessions, {} offers, {} answers, {} candidates in, {} out, {} reaped",
                    sessions, stats.offers_published, stats.answers_published,
                    stats.candidates_published, stats.candidates_delivered, stats.sessions_reaped
                );
            }
        }
    }

    if tokio::time::timeout(Duration::from_secs(5), tracker.wait()).await.is_err() {
        warn!("Shutdown timed out after 5s");
    }
    Ok(())
}
