//! Trace output for engine internals.
//!
//! Tracing is wired per channel through the `PALISADE_TRACE` environment
//! variable. The value is a comma-separated list of channel names, each
//! with an optional depth after a colon:
//!
//! ```text
//! PALISADE_TRACE=matcher          trace the matcher at depth 1
//! PALISADE_TRACE=parse,pool:2     two channels, pool at depth 2
//! PALISADE_TRACE=all:2            every channel at depth 2
//! ```
//!
//! Depth 1 carries the headline events; depth 2 adds per-step detail.
//! Lines go to stderr so traced runs still produce clean stdout.

use std::env;
use std::sync::OnceLock;

#[derive(Debug, PartialEq, Eq)]
struct TraceSpec {
    /// Depth applied to every channel, from an `all` entry.
    all: u8,
    channels: Vec<(String, u8)>,
}

impl TraceSpec {
    fn depth_of(&self, name: &str) -> u8 {
        self.channels
            .iter()
            .filter(|(channel, _)| channel == name)
            .map(|&(_, depth)| depth)
            .chain([self.all])
            .max()
            .unwrap_or(0)
    }
}

/// Parse a `PALISADE_TRACE` value. Unparseable depths fall back to 1;
/// empty entries are skipped.
fn parse_spec(value: &str) -> TraceSpec {
    let mut spec = TraceSpec {
        all: 0,
        channels: Vec::new(),
    };
    for entry in value.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, depth) = match entry.split_once(':') {
            Some((name, depth)) => (name, depth.parse::<u8>().unwrap_or(1)),
            None => (entry, 1),
        };
        if name == "all" {
            spec.all = spec.all.max(depth);
        } else {
            spec.channels.push((name.to_string(), depth));
        }
    }
    spec
}

fn spec() -> &'static TraceSpec {
    static SPEC: OnceLock<TraceSpec> = OnceLock::new();
    SPEC.get_or_init(|| parse_spec(&env::var("PALISADE_TRACE").unwrap_or_default()))
}

/// A handle on one trace channel. Construct once per component and keep
/// it; the depth is resolved from the environment at construction.
pub struct Tracer {
    name: &'static str,
    depth: u8,
}

impl Tracer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            depth: spec().depth_of(name),
        }
    }

    /// A tracer that never emits, for contexts built without a channel.
    pub const fn silent() -> Self {
        Self {
            name: "",
            depth: 0,
        }
    }

    /// True when this channel is enabled at `depth` or deeper.
    #[inline]
    pub fn at(&self, depth: u8) -> bool {
        self.depth >= depth
    }

    pub fn emit(&self, msg: &str) {
        eprintln!("palisade[{}]: {}", self.name, msg);
    }
}

/// Headline event, shown at depth 1. The format arguments are only
/// evaluated when the channel is on.
#[macro_export]
macro_rules! trace {
    ($tracer:expr, $($arg:tt)*) => {
        if $tracer.at(1) {
            $tracer.emit(&format!($($arg)*));
        }
    };
}

/// Per-step detail, shown at depth 2.
#[macro_export]
macro_rules! trace_detail {
    ($tracer:expr, $($arg:tt)*) => {
        if $tracer.at(2) {
            $tracer.emit(&format!($($arg)*));
        }
    };
}
