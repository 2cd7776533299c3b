//! SNMP collector.
//!
//! Reads IF-MIB counters, custom OIDs and the interface inventory of one device
//! over SNMP v2c. The `snmp` crate session is synchronous, so every fetch runs on
//! the blocking pool while the connection lock for `host:port` is held.

use async_trait::async_trait;
use snmp::{SyncSession, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{Collector, CollectorError, CollectorFactory, ConnectionLocks, InterfaceInfo, RawSample};
use crate::config::{Credentials, InterfaceFilter, SnmpConnection, TargetConfig};
use crate::counters;

const IF_NUMBER: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 1, 0];
const IF_DESCR: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2];
const IF_PHYS_ADDRESS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 6];
const IF_OPER_STATUS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8];
const IP_AD_ENT_IF_INDEX: &[u32] = &[1, 3, 6, 1, 2, 1, 4, 20, 1, 2];

/// ifOperStatus value for an interface that is down.
const OPER_STATUS_DOWN: u64 = 2;

const MAX_REPETITIONS: u32 = 20;

/// Context tags of the v2 exception values noSuchObject, noSuchInstance and
/// endOfMibView. The client hands them back as constructed values.
const EXCEPTION_TAGS: std::ops::RangeInclusive<u8> = 0x80..=0x82;

/// Owned copy of a varbind value.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Unsigned(u64),
    Signed(i64),
    Bytes(Vec<u8>),
    Missing,
    Other,
}

impl Reading {
    fn from_value(value: &Value<'_>) -> Self {
        match value {
            Value::Counter32(v) | Value::Unsigned32(v) | Value::Timeticks(v) => {
                Reading::Unsigned(u64::from(*v))
            }
            Value::Counter64(v) => Reading::Unsigned(*v),
            Value::Integer(v) => Reading::Signed(*v),
            Value::OctetString(b) => Reading::Bytes(b.to_vec()),
            Value::Null => Reading::Missing,
            Value::Constructed(tag, _) if EXCEPTION_TAGS.contains(tag) => Reading::Missing,
            _ => Reading::Other,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Reading::Unsigned(v) => Some(*v),
            Reading::Signed(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Numeric value, accepting octet strings that hold a decimal number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Unsigned(v) => Some(*v as f64),
            Reading::Signed(v) => Some(*v as f64),
            Reading::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Reading::Bytes(b) => Some(
                String::from_utf8_lossy(b)
                    .trim_end_matches('\0')
                    .to_string(),
            ),
            _ => None,
        }
    }
}

/// One walked row: OID suffix below the walked column and its value.
pub type Row = (Vec<u32>, Reading);

struct Session {
    inner: SyncSession,
    target: String,
}

impl Session {
    fn open(conn: &SnmpConnection, timeout: Duration) -> Result<Self, CollectorError> {
        let target = conn.address();
        let community = match &conn.credentials {
            Credentials::V2c { community } => community.clone(),
            Credentials::V3(_) => return Err(CollectorError::UnsupportedVersion("v3".into())),
        };
        let inner = SyncSession::new(target.as_str(), community.as_bytes(), Some(timeout), 0)
            .map_err(|e| CollectorError::Request {
                target: target.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { inner, target })
    }

    fn get(&mut self, oid: &[u32]) -> Result<Reading, CollectorError> {
        let target = &self.target;
        let pdu = self.inner.get(oid).map_err(|e| CollectorError::Request {
            target: target.clone(),
            message: format!("{:?}", e),
        })?;
        match pdu.varbinds.into_iter().next() {
            Some((_, value)) => Ok(Reading::from_value(&value)),
            None => Err(CollectorError::Response {
                target: target.clone(),
                message: "empty varbind list".into(),
            }),
        }
    }

    /// Walks the subtree below `base` with GETBULK.
    fn walk(&mut self, base: &[u32]) -> Result<Vec<Row>, CollectorError> {
        let target = &self.target;
        let mut rows = Vec::new();
        let mut cursor = base.to_vec();

        loop {
            let pdu = self
                .inner
                .getbulk(&[cursor.as_slice()], 0, MAX_REPETITIONS)
                .map_err(|e| CollectorError::Request {
                    target: target.clone(),
                    message: format!("{:?}", e),
                })?;

            let mut advanced = false;
            let mut finished = false;
            for (name, value) in pdu.varbinds {
                let mut buf = [0u32; 128];
                let oid = name.read_name(&mut buf).map_err(|e| CollectorError::Response {
                    target: target.clone(),
                    message: format!("{:?}", e),
                })?;

                let reading = Reading::from_value(&value);
                if !oid.starts_with(base) || reading == Reading::Missing || oid <= cursor.as_slice() {
                    finished = true;
                    break;
                }
                rows.push((oid[base.len()..].to_vec(), reading));
                cursor = oid.to_vec();
                advanced = true;
            }

            if finished || !advanced {
                return Ok(rows);
            }
        }
    }
}

/// Maps ifIndex to interface name from an ifDescr walk.
pub fn interface_names(rows: &[Row]) -> BTreeMap<u64, String> {
    rows.iter()
        .filter_map(|(suffix, reading)| match suffix.as_slice() {
            [index] => Some((u64::from(*index), reading.as_text()?)),
            _ => None,
        })
        .collect()
}

/// ifIndexes reported down by an ifOperStatus walk.
pub fn down_interfaces(rows: &[Row]) -> HashSet<u64> {
    rows.iter()
        .filter_map(|(suffix, reading)| match suffix.as_slice() {
            [index] if reading.as_u64() == Some(OPER_STATUS_DOWN) => Some(u64::from(*index)),
            _ => None,
        })
        .collect()
}

/// Colon separated lowercase hex MAC address. Empty addresses yield `None`.
pub fn format_mac(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() || bytes.iter().all(|b| *b == 0) {
        return None;
    }
    Some(
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":"),
    )
}

/// Dotted IPv4 address from an ipAddrTable row suffix, skipping loopback.
pub fn ipv4_from_suffix(suffix: &[u32]) -> Option<String> {
    match suffix {
        [a, b, c, d] if *a != 127 && [a, b, c, d].iter().all(|o| **o <= 255) => {
            Some(format!("{}.{}.{}.{}", a, b, c, d))
        }
        _ => None,
    }
}

fn admitted_interfaces(
    names: BTreeMap<u64, String>,
    filter: &InterfaceFilter,
    down: &HashSet<u64>,
) -> BTreeMap<u64, String> {
    names
        .into_iter()
        .filter(|(index, name)| filter.admits(name) && !down.contains(index))
        .collect()
}

fn collect_counters(session: &mut Session, target: &TargetConfig) -> Result<Vec<RawSample>, CollectorError> {
    let if_number = session.get(IF_NUMBER)?.as_u64().unwrap_or(0);
    if if_number == 0 {
        return Ok(Vec::new());
    }

    let names = interface_names(&session.walk(IF_DESCR)?);
    let down = if target.skip_down_interfaces {
        down_interfaces(&session.walk(IF_OPER_STATUS)?)
    } else {
        HashSet::new()
    };
    let interfaces = admitted_interfaces(names, &target.interface_filter, &down);

    let mut samples = Vec::with_capacity(interfaces.len() * target.counters.len());
    for counter in &target.counters {
        let Some(spec) = counters::lookup(counter) else {
            continue;
        };
        let oid = counters::parse_oid(&spec.oid()).ok_or_else(|| CollectorError::InvalidOid(spec.oid()))?;
        for (suffix, reading) in session.walk(&oid)? {
            let [index] = suffix.as_slice() else {
                continue;
            };
            let index = u64::from(*index);
            let (Some(name), Some(value)) = (interfaces.get(&index), reading.as_u64()) else {
                continue;
            };
            samples.push(RawSample::new(index, counter.clone(), name.clone(), value));
        }
    }
    Ok(samples)
}

fn collect_custom_values(
    session: &mut Session,
    target: &TargetConfig,
) -> Result<HashMap<String, f64>, CollectorError> {
    let mut values = HashMap::with_capacity(target.custom_counters.len());
    for custom in &target.custom_counters {
        let oid = counters::parse_oid(&custom.oid).ok_or_else(|| CollectorError::InvalidOid(custom.oid.clone()))?;
        match session.get(&oid)?.as_f64() {
            Some(v) => {
                values.insert(custom.metric_name.clone(), v);
            }
            None => debug!("{} returned a non numeric value for {}", session.target, custom.oid),
        }
    }
    Ok(values)
}

fn collect_inventory(session: &mut Session, target: &TargetConfig) -> Result<Vec<InterfaceInfo>, CollectorError> {
    let names = admitted_interfaces(
        interface_names(&session.walk(IF_DESCR)?),
        &target.interface_filter,
        &HashSet::new(),
    );

    let mut addresses: BTreeMap<u64, Vec<String>> = BTreeMap::new();
    for (suffix, reading) in session.walk(IP_AD_ENT_IF_INDEX)? {
        if let (Some(ip), Some(index)) = (ipv4_from_suffix(&suffix), reading.as_u64()) {
            addresses.entry(index).or_default().push(ip);
        }
    }

    let mut macs: BTreeMap<u64, String> = BTreeMap::new();
    for (suffix, reading) in session.walk(IF_PHYS_ADDRESS)? {
        if let ([index], Reading::Bytes(bytes)) = (suffix.as_slice(), &reading) {
            if let Some(mac) = format_mac(bytes) {
                macs.insert(u64::from(*index), mac);
            }
        }
    }

    let mut inventory: Vec<InterfaceInfo> = names
        .into_iter()
        .map(|(index, name)| {
            let mut ip_addresses = addresses.remove(&index).unwrap_or_default();
            ip_addresses.sort();
            InterfaceInfo {
                name,
                ip_addresses,
                mac_address: macs.remove(&index),
            }
        })
        .collect();
    inventory.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(inventory)
}

/// SNMP collector bound to one target.
pub struct SnmpCollector {
    target: Arc<TargetConfig>,
    locks: ConnectionLocks,
    timeout: Duration,
}

impl SnmpCollector {
    pub fn new(target: Arc<TargetConfig>, locks: ConnectionLocks, timeout: Duration) -> Self {
        Self {
            target,
            locks,
            timeout,
        }
    }

    async fn with_session<T, F>(&self, f: F) -> Result<T, CollectorError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Session, &TargetConfig) -> Result<T, CollectorError> + Send + 'static,
    {
        let _guard = self.locks.acquire(&self.target.connection.address()).await;
        let target = Arc::clone(&self.target);
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || {
            let mut session = Session::open(&target.connection, timeout)?;
            f(&mut session, &target)
        })
        .await
        .map_err(|e| CollectorError::Task(e.to_string()))?
    }
}

#[async_trait]
impl Collector for SnmpCollector {
    async fn collect(&self) -> Result<Vec<RawSample>, CollectorError> {
        self.with_session(collect_counters).await
    }

    async fn collect_custom(&self) -> Result<HashMap<String, f64>, CollectorError> {
        if self.target.custom_counters.is_empty() {
            return Ok(HashMap::new());
        }
        self.with_session(collect_custom_values).await
    }

    async fn collect_interfaces(&self) -> Result<Vec<InterfaceInfo>, CollectorError> {
        self.with_session(collect_inventory).await
    }
}

/// Builds [`SnmpCollector`]s that share one connection lock registry.
#[derive(Clone)]
pub struct SnmpCollectorFactory {
    locks: ConnectionLocks,
    timeout: Duration,
}

impl SnmpCollectorFactory {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: ConnectionLocks::new(),
            timeout,
        }
    }
}

impl CollectorFactory for SnmpCollectorFactory {
    fn build(&self, target: &Arc<TargetConfig>) -> Arc<dyn Collector> {
        Arc::new(SnmpCollector::new(
            Arc::clone(target),
            self.locks.clone(),
            self.timeout,
        ))
    }
}
