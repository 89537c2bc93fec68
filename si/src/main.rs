//! # Safety Interlock core — binary entry point
//!
//! CLI parsing, config load, startup self-test, tick-thread supervisor, and
//! cooperative shutdown (spec §5, §6, SPEC_FULL.md §2.2/§4.5).

mod selftest;

use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use selftest::SelfTestSource;
use si_common::config::{ConfigError, ConfigLoader, SiConfig};
use si_common::dictionary::ConnectionRole;
use si_common::events::EventId;
use si_icm::connection::{ChannelFrameConnection, FrameConnection, TcpFrameConnection};
use si_icm::{cycle_updater, receive, transmit};
use si_itcom::connection::ConnectionState;
use si_itcom::context::{Itcom, SharedContext};
use si_fm::log_sink::LogSink;
use si_fm::persistence::PersistenceRecord;
use si_fm::processor::{FaultNotifier, FmProcessor};

/// Safety Interlock core — interface communication manager and fault manager.
#[derive(Parser, Debug)]
#[command(name = "si")]
#[command(version)]
#[command(about = "Safety Interlock: message integrity and fault-event core")]
struct Args {
    /// Path to the SI configuration file (TOML).
    #[arg(short, long, default_value = "si.toml")]
    config: PathBuf,

    /// VAM-side TCP address to connect to (e.g. 127.0.0.1:7001). If unset,
    /// the VAM connection stays disconnected and receive/transmit to VAM
    /// are no-ops, same as any other unreachable peer (spec §4.1).
    #[arg(long)]
    vam_addr: Option<String>,

    /// CM-side TCP address to connect to (e.g. 127.0.0.1:7002).
    #[arg(long)]
    cm_addr: Option<String>,

    /// Enable verbose (DEBUG) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

/// Bridges `ErrorEvent` notifications to the ambient `tracing` transport
/// (spec §9's "small set of notification handlers" — the actual SM/external
/// system collaborators are outside this core's scope).
struct TracingNotifier;

impl FaultNotifier for TracingNotifier {
    fn notify_sm(&mut self, event: &si_itcom::error_event::ErrorEvent) {
        warn!(event = event.event_id.name(), "notifying state machine of fault event");
    }

    fn notify_external_system(&mut self, event: &si_itcom::error_event::ErrorEvent) {
        info!(event = event.event_id.name(), "notifying external system of event");
    }
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn connect(role: ConnectionRole, addr: Option<&str>, itcom: &Itcom) -> Box<dyn FrameConnection + Send> {
    let Some(addr) = addr else {
        return Box::new(ChannelFrameConnection::new());
    };
    match TcpStream::connect(addr) {
        Ok(stream) => match TcpFrameConnection::new(stream) {
            Ok(conn) => {
                itcom.with(|ctx| ctx.connections.set_state(role, ConnectionState::Connected));
                info!(?role, addr, "connected");
                Box::new(conn)
            }
            Err(e) => {
                error!(?role, addr, error = %e, "failed to configure connection as non-blocking");
                Box::new(ChannelFrameConnection::new())
            }
        },
        Err(e) => {
            error!(?role, addr, error = %e, "failed to connect");
            Box::new(ChannelFrameConnection::new())
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(&args);

    info!("safety interlock core v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match SiConfig::load(&args.config) {
        Ok(c) => c,
        Err(ConfigError::FileNotFound(path)) => {
            warn!(path, "config file not found, using defaults");
            SiConfig::default()
        }
        Err(e) => return Err(e.into()),
    };
    config.validate()?;

    let report = selftest::StubSelfTestSource.run();
    if report.failed() {
        error!(?report, "startup self-test failed");
    }

    let itcom = Itcom::new(SharedContext::new(&config, now_unix_secs() * 1000));
    if report.failed() {
        itcom.with(|ctx| ctx.raise_event(EventId::FaultStartupMemError));
    }

    let persistence_path = PathBuf::from(&config.persistence_path);
    let restored = PersistenceRecord::read_or_cold_start(&persistence_path)?;
    let mut fm_processor = FmProcessor::restore(&itcom, restored);

    let mut log_sink = LogSink::open(&config.event_log_path, config.log_rotate_bytes, config.log_generations)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!("received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let mut vam_conn = connect(ConnectionRole::Vam, args.vam_addr.as_deref(), &itcom);
    let mut cm_conn = connect(ConnectionRole::Cm, args.cm_addr.as_deref(), &itcom);

    let tick_period = Duration::from_millis(config.tick_period_ms as u64);
    let status_ticks = config.status_notification_ticks;

    let icm_itcom = itcom.clone();
    let icm_running = Arc::clone(&running);
    let icm_handle = std::thread::spawn(move || {
        info!("ICM tick worker started");
        while icm_running.load(Ordering::Relaxed) {
            let tick_start = Instant::now();
            let now_unix = now_unix_secs() as u32;
            let now_ms = now_unix_secs() * 1000;

            receive::receive_tick(&icm_itcom, ConnectionRole::Vam, vam_conn.as_mut());
            receive::receive_tick(&icm_itcom, ConnectionRole::Cm, cm_conn.as_mut());
            transmit::transmit_tick(&icm_itcom, now_unix, now_ms, vam_conn.as_mut(), cm_conn.as_mut());
            cycle_updater::cycle_tick(&icm_itcom, status_ticks);

            let elapsed = tick_start.elapsed();
            if elapsed < tick_period {
                std::thread::sleep(tick_period - elapsed);
            }
        }
        info!("ICM tick worker stopping");
    });

    let fm_itcom = itcom.clone();
    let fm_running = Arc::clone(&running);
    let fm_budget = Duration::from_millis(config.fm_budget_ms);
    let fm_handle = std::thread::spawn(move || {
        info!("FM tick worker started");
        let mut notifier = TracingNotifier;
        while fm_running.load(Ordering::Relaxed) {
            let tick_start = Instant::now();
            let yield_running = Arc::clone(&fm_running);
            if let Err(e) = fm_processor.tick(
                &fm_itcom,
                &mut log_sink,
                &persistence_path,
                &mut notifier,
                fm_budget,
                now_unix_secs(),
                || !yield_running.load(Ordering::Relaxed),
            ) {
                error!(error = %e, "fault manager tick failed");
            }

            let elapsed = tick_start.elapsed();
            if elapsed < tick_period {
                std::thread::sleep(tick_period - elapsed);
            }
        }
        info!("FM tick worker stopping, draining remaining queue");
        if let Err(e) = FmProcessor::shutdown(&fm_itcom, &mut log_sink, now_unix_secs()) {
            error!(error = %e, "failed to drain event queue on shutdown");
        }
    });

    icm_handle.join().map_err(|_| "ICM worker thread panicked")?;
    fm_handle.join().map_err(|_| "FM worker thread panicked")?;

    info!("safety interlock core shutdown complete");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("startup failed: {}", e);
        std::process::exit(1);
    }
}
