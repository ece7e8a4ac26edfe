//! Write engine: pushes context changes to the device's coils.
//!
//! Both strategies compare each bound output field with the entry's
//! `previous_value` and expect a poll to have run in the same cycle.
//!
//! - [`WriteStrategy::Differential`] writes one coil per changed field. A
//!   failed write is logged and the next entry is still attempted.
//! - [`WriteStrategy::Bulk`] writes the whole coil range `[0, max_address]` in
//!   one request when anything changed. Unbound addresses in the range are
//!   written as OFF. A failed write leaves every entry dirty for the next cycle.

use std::str::FromStr;

use tracing::{debug, error, info};

use crate::client::{BitClient, Connector};
use crate::context::ControlContext;
use crate::error::{Error, Result};
use crate::mapping::{Direction, MappingEntry};
use crate::registry::Registry;
use crate::session::Session;
use crate::utils::format_bits;

/// How context changes reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WriteStrategy {
    /// One single-coil write per changed field.
    #[default]
    Differential,
    /// One multi-coil write covering the whole output range.
    Bulk,
}

impl std::fmt::Display for WriteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteStrategy::Differential => write!(f, "differential"),
            WriteStrategy::Bulk => write!(f, "bulk"),
        }
    }
}

impl FromStr for WriteStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "differential" | "diff" => Ok(WriteStrategy::Differential),
            "bulk" | "all" => Ok(WriteStrategy::Bulk),
            other => Err(format!("unknown write strategy '{other}'")),
        }
    }
}

/// Live value of a bound entry whose field no longer matches `previous_value`.
fn pending<C: ControlContext>(entry: &MappingEntry, ctx: &C) -> Option<bool> {
    Registry::live_value(entry, ctx).filter(|&live| live != entry.previous_value)
}

fn log_update(entry: &MappingEntry, value: bool) {
    info!(
        name = %entry.name,
        address = entry.address,
        "Updated {}: {} -> {} at address {}",
        entry.name,
        u8::from(entry.previous_value),
        u8::from(value),
        entry.address
    );
}

/// Writes each changed output field with its own request.
///
/// Returns `Ok(true)` if at least one write succeeded. A failed write is
/// logged and its entry stays dirty. If the failure dropped the session, the
/// remaining changed entries are logged as failed too; no reconnect is
/// attempted within the call.
///
/// # Errors
///
/// Returns `Error::Connect` if changes are pending and no session can be
/// opened; nothing is written then.
pub(crate) fn write_changed<C, K>(
    registry: &mut Registry<C>,
    session: &mut Session<K>,
    ctx: &C,
) -> Result<bool>
where
    C: ControlContext,
    K: Connector,
{
    if !registry.outputs().iter().any(|entry| pending(entry, ctx).is_some()) {
        return Ok(false);
    }
    session.ensure_connected()?;

    let mut any_written = false;

    for entry in registry.table_mut(Direction::Output).iter_mut() {
        let Some(value) = pending(entry, ctx) else {
            continue;
        };

        let Some(client) = session.client_mut() else {
            error!(
                name = %entry.name,
                address = entry.address,
                "Failed to write bit at address {}: session lost",
                entry.address
            );
            continue;
        };

        let result = client.write_coil(entry.address, value);
        if let Err(source) = result {
            error!(
                name = %entry.name,
                address = entry.address,
                error = %source,
                "Failed to write bit at address {}",
                entry.address
            );
            session.discard_if_fatal(&source);
            continue;
        }

        log_update(entry, value);
        entry.previous_value = value;
        entry.value = value;
        any_written = true;
    }

    Ok(any_written)
}

/// Writes the whole output range in one request if any field changed.
///
/// Returns `Ok(false)` without touching the device when nothing changed.
///
/// # Errors
///
/// Returns `Error::Write` if the request fails; no entry is updated.
pub(crate) fn write_all<C, K>(
    registry: &mut Registry<C>,
    session: &mut Session<K>,
    ctx: &C,
) -> Result<bool>
where
    C: ControlContext,
    K: Connector,
{
    let outputs = registry.outputs();
    let mut buffer = vec![false; outputs.span()];
    let mut any_changed = false;

    for entry in outputs {
        let Some(live) = Registry::live_value(entry, ctx) else {
            continue;
        };
        if let Some(slot) = buffer.get_mut(usize::from(entry.address)) {
            *slot = live;
        }
        any_changed |= live != entry.previous_value;
    }

    if !any_changed {
        return Ok(false);
    }

    debug!(count = buffer.len(), bits = %format_bits(&buffer), "Writing output range");
    let result = session.ensure_connected()?.write_coils(0, &buffer);
    if let Err(source) = result {
        error!(count = buffer.len(), error = %source, "Failed to write outputs");
        session.discard_if_fatal(&source);
        return Err(Error::Write {
            address: 0,
            count: buffer.len(),
            source,
        });
    }

    for entry in registry.table_mut(Direction::Output).iter_mut() {
        if let Some(value) = pending(entry, ctx) {
            log_update(entry, value);
            entry.previous_value = value;
            entry.value = value;
        }
    }

    Ok(true)
}
