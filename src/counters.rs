//! Standard interface counter registry.
//!
//! Maps the IF-MIB counter names accepted in the `mibs` configuration list to
//! their table OIDs, and records the properties the converter needs: counter
//! width (for wraparound), whether the counter is a byte counter reported as a
//! rate, and its traffic direction.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum value of a legacy 32-bit counter before it wraps.
pub const CEILING_32: u64 = u32::MAX as u64;
/// Maximum value of a 64-bit (high capacity) counter before it wraps.
pub const CEILING_64: u64 = u64::MAX;

/// Counters polled when a target does not list any.
pub const DEFAULT_COUNTERS: &[&str] = &["ifHCInOctets", "ifHCOutOctets"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterWidth {
    Bits32,
    Bits64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Receive,
    Transmit,
}

/// Static description of one standard counter.
#[derive(Debug, Clone, Copy)]
pub struct CounterSpec {
    pub name: &'static str,
    table: &'static str,
    column: u32,
    pub width: CounterWidth,
    pub direction: Direction,
    /// Byte counters are emitted as per-second rates; everything else as raw diffs.
    pub rate: bool,
}

const IF_TABLE: &str = "1.3.6.1.2.1.2.2.1";
const IF_X_TABLE: &str = "1.3.6.1.2.1.31.1.1.1";

const fn spec(
    name: &'static str,
    table: &'static str,
    column: u32,
    width: CounterWidth,
    direction: Direction,
    rate: bool,
) -> CounterSpec {
    CounterSpec {
        name,
        table,
        column,
        width,
        direction,
        rate,
    }
}

use CounterWidth::{Bits32, Bits64};
use Direction::{Receive, Transmit};

static COUNTERS: &[CounterSpec] = &[
    spec("ifInOctets", IF_TABLE, 10, Bits32, Receive, true),
    spec("ifInUcastPkts", IF_TABLE, 11, Bits32, Receive, false),
    spec("ifInNUcastPkts", IF_TABLE, 12, Bits32, Receive, false),
    spec("ifInDiscards", IF_TABLE, 13, Bits32, Receive, false),
    spec("ifInErrors", IF_TABLE, 14, Bits32, Receive, false),
    spec("ifInUnknownProtos", IF_TABLE, 15, Bits32, Receive, false),
    spec("ifOutOctets", IF_TABLE, 16, Bits32, Transmit, true),
    spec("ifOutUcastPkts", IF_TABLE, 17, Bits32, Transmit, false),
    spec("ifOutNUcastPkts", IF_TABLE, 18, Bits32, Transmit, false),
    spec("ifOutDiscards", IF_TABLE, 19, Bits32, Transmit, false),
    spec("ifOutErrors", IF_TABLE, 20, Bits32, Transmit, false),
    spec("ifInMulticastPkts", IF_X_TABLE, 2, Bits32, Receive, false),
    spec("ifInBroadcastPkts", IF_X_TABLE, 3, Bits32, Receive, false),
    spec("ifOutMulticastPkts", IF_X_TABLE, 4, Bits32, Transmit, false),
    spec("ifOutBroadcastPkts", IF_X_TABLE, 5, Bits32, Transmit, false),
    spec("ifHCInOctets", IF_X_TABLE, 6, Bits64, Receive, true),
    spec("ifHCInUcastPkts", IF_X_TABLE, 7, Bits64, Receive, false),
    spec("ifHCInMulticastPkts", IF_X_TABLE, 8, Bits64, Receive, false),
    spec("ifHCInBroadcastPkts", IF_X_TABLE, 9, Bits64, Receive, false),
    spec("ifHCOutOctets", IF_X_TABLE, 10, Bits64, Transmit, true),
    spec("ifHCOutUcastPkts", IF_X_TABLE, 11, Bits64, Transmit, false),
    spec("ifHCOutMulticastPkts", IF_X_TABLE, 12, Bits64, Transmit, false),
    spec("ifHCOutBroadcastPkts", IF_X_TABLE, 13, Bits64, Transmit, false),
];

static OID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.?[0-9]+(\.[0-9]+)*$").expect("static OID regex"));

/// Looks up a standard counter by name.
pub fn lookup(name: &str) -> Option<&'static CounterSpec> {
    COUNTERS.iter().find(|c| c.name == name)
}

/// Returns every counter name the registry knows about.
pub fn known_names() -> impl Iterator<Item = &'static str> {
    COUNTERS.iter().map(|c| c.name)
}

impl CounterSpec {
    /// Full dotted OID of the counter's table column.
    pub fn oid(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }

    pub fn ceiling(&self) -> u64 {
        match self.width {
            CounterWidth::Bits32 => CEILING_32,
            CounterWidth::Bits64 => CEILING_64,
        }
    }
}

/// Overflow ceiling for a counter name. Unknown names are treated as 64-bit.
pub fn ceiling(name: &str) -> u64 {
    lookup(name).map(CounterSpec::ceiling).unwrap_or(CEILING_64)
}

/// True for byte counters that are emitted as per-second rates.
pub fn is_rate(name: &str) -> bool {
    lookup(name).is_some_and(|c| c.rate)
}

/// True when the counter measures received traffic.
pub fn is_receive(name: &str) -> bool {
    lookup(name).is_some_and(|c| c.direction == Direction::Receive)
}

/// Validates a list of counter names, returning them sorted and deduplicated.
///
/// An empty list selects [`DEFAULT_COUNTERS`].
pub fn validate(names: &[String]) -> Result<Vec<String>, String> {
    if names.is_empty() {
        return Ok(DEFAULT_COUNTERS.iter().map(|s| s.to_string()).collect());
    }
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        if lookup(name).is_none() {
            return Err(name.clone());
        }
        out.push(name.clone());
    }
    out.sort();
    out.dedup();
    Ok(out)
}

/// Validates an operator supplied OID in dotted numeric form.
pub fn is_valid_oid(oid: &str) -> bool {
    OID_RE.is_match(oid)
}

/// Parses a dotted OID into its numeric components.
pub fn parse_oid(oid: &str) -> Option<Vec<u32>> {
    if !is_valid_oid(oid) {
        return None;
    }
    oid.trim_start_matches('.')
        .split('.')
        .map(|part| part.parse::<u32>().ok())
        .collect()
}
