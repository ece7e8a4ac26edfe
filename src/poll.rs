//! Poll engine: rate-limited bulk reads fanned out into the context.
//!
//! A poll reads the whole discrete-input range and the whole coil range, each
//! starting at address 0 and covering `max_address + 1` bits, then copies the
//! bit at every entry's address into the entry and its bound field.
//!
//! Guarantees:
//! - Within the poll interval of the last successful poll nothing is read and
//!   nothing changes; stale values are acceptable in that window.
//! - Both reads complete before any entry or field is touched, so a failed
//!   connect or read leaves the last-known-good state in place.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace};

use crate::client::{BitClient, Connector};
use crate::context::ControlContext;
use crate::error::{ClientError, Error, Result};
use crate::mapping::{Direction, MappingTable};
use crate::memory::BitArea;
use crate::registry::Registry;
use crate::session::Session;
use crate::utils::bit_at;

/// Timestamp of the last successful poll.
#[derive(Debug, Clone)]
pub struct PollCache {
    interval: Duration,
    last_poll: Option<Instant>,
}

impl PollCache {
    /// Creates an empty cache; the first poll always reads.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: None,
        }
    }

    /// Returns whether a poll at `now` may reuse the current values.
    pub fn is_fresh(&self, now: Instant) -> bool {
        match self.last_poll {
            Some(last) => now.saturating_duration_since(last) < self.interval,
            None => false,
        }
    }

    /// Records a successful poll.
    pub fn stamp(&mut self, now: Instant) {
        self.last_poll = Some(now);
    }

    /// Forces the next poll to read.
    pub fn invalidate(&mut self) {
        self.last_poll = None;
    }

    /// Time of the last successful poll.
    pub fn last_poll(&self) -> Option<Instant> {
        self.last_poll
    }

    /// Minimum time between two reads.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Reads both bit ranges and updates every entry and bound field.
pub(crate) fn poll<C, K>(
    registry: &mut Registry<C>,
    session: &mut Session<K>,
    cache: &mut PollCache,
    ctx: &mut C,
) -> Result<()>
where
    C: ControlContext,
    K: Connector,
{
    let now = Instant::now();
    if cache.is_fresh(now) {
        trace!("Poll skipped, values still fresh");
        return Ok(());
    }

    session.ensure_connected()?;

    let inputs = read_table(session, registry.inputs())?;
    let outputs = read_table(session, registry.outputs())?;

    apply(registry.table_mut(Direction::Input), &inputs, ctx);
    apply(registry.table_mut(Direction::Output), &outputs, ctx);

    cache.stamp(now);
    Ok(())
}

/// Reads `[0, max_address]` from the area backing `table`.
fn read_table<K: Connector>(session: &mut Session<K>, table: &MappingTable) -> Result<Vec<bool>> {
    let area = table.direction().area();
    let span = table.span();
    let result = match u16::try_from(span) {
        Ok(count) => {
            let client = session.ensure_connected()?;
            match area {
                BitArea::DiscreteInputs => client.read_discrete_inputs(0, count),
                BitArea::Coils => client.read_coils(0, count),
            }
        }
        Err(_) => Err(ClientError::invalid_range(0, span, "range exceeds address space")),
    };

    result.map_err(|source| {
        error!(%area, count = span, error = %source, "Failed to read {}", area);
        session.discard_if_fatal(&source);
        Error::Poll {
            area,
            count: span,
            source,
        }
    })
}

fn apply<C: ControlContext>(table: &mut MappingTable, bits: &[bool], ctx: &mut C) {
    let direction = table.direction();
    for entry in table.iter_mut() {
        let value = bit_at(bits, entry.address);
        entry.previous_value = entry.value;
        entry.value = value;

        if let Some(id) = entry.field {
            ctx.set_field(id, value);
            debug!(
                name = %entry.name,
                value,
                address = entry.address,
                "Read {} value",
                direction.to_string().to_lowercase()
            );
            if entry.previous_value != value {
                info!(
                    name = %entry.name,
                    address = entry.address,
                    "{} {}: {} -> {}",
                    direction,
                    entry.name,
                    u8::from(entry.previous_value),
                    u8::from(value)
                );
            }
        }
    }
}
