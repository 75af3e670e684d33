use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;

use crate::engine::EngineConfig;
use crate::limits::*;

/// Process settings, read from `SEATDESK_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: String,
    pub port: u16,
    pub metrics_port: Option<u16>,
    pub max_connections: usize,
    pub reaper_interval: Duration,
    /// Comma-separated user ids registered as admins at startup.
    pub admins: Vec<String>,
    pub engine: EngineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 7878,
            metrics_port: None,
            max_connections: 256,
            reaper_interval: Duration::from_secs(5),
            admins: Vec::new(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Some(bind) = lookup("SEATDESK_BIND") {
            cfg.bind = bind;
        }
        if let Some(port) = parse(&lookup, "SEATDESK_PORT")? {
            cfg.port = port;
        }
        cfg.metrics_port = parse(&lookup, "SEATDESK_METRICS_PORT")?;
        if let Some(max) = parse(&lookup, "SEATDESK_MAX_CONNECTIONS")? {
            cfg.max_connections = max;
        }
        if let Some(secs) = parse::<u64>(&lookup, "SEATDESK_REAPER_INTERVAL_SECS")? {
            if secs == 0 {
                return Err("SEATDESK_REAPER_INTERVAL_SECS must be positive".into());
            }
            cfg.reaper_interval = Duration::from_secs(secs);
        }
        if let Some(admins) = lookup("SEATDESK_ADMINS") {
            cfg.admins = admins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(minutes) = parse::<i32>(&lookup, "SEATDESK_UTC_OFFSET_MINUTES")? {
            cfg.engine.utc_offset = FixedOffset::east_opt(minutes * 60)
                .ok_or_else(|| format!("SEATDESK_UTC_OFFSET_MINUTES out of range: {minutes}"))?;
        }
        if let Some(seats) = parse(&lookup, "SEATDESK_SEATS")? {
            cfg.engine.seat_count = seats;
        }
        if let Some(floaters) = parse(&lookup, "SEATDESK_FLOATER_SEATS")? {
            cfg.engine.floater_seats = floaters;
        }
        if cfg.engine.seat_count == 0 || cfg.engine.seat_count > MAX_SEAT_COUNT {
            return Err(format!("SEATDESK_SEATS must be between 1 and {MAX_SEAT_COUNT}"));
        }
        if cfg.engine.floater_seats > cfg.engine.seat_count {
            return Err("SEATDESK_FLOATER_SEATS exceeds SEATDESK_SEATS".into());
        }
        Ok(cfg)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, String> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{key}: cannot parse {raw:?}")),
    }
}
