//! Native (host-implemented) functions exposed to NVMbr programs.
//!
//! `clock` is the only one: a zero-argument function returning the number
//! of seconds elapsed since an arbitrary, fixed epoch, for measuring
//! elapsed time between two calls. This supersedes the original's literal
//! `clock() / CLOCKS_PER_SEC`, which has no portable Rust equivalent - the
//! observable contract (a monotonically increasing count of seconds) is
//! the same.

use crate::value::Value;
use std::time::Instant;

/// `clock()` - seconds since the VM started.
pub fn clock(start: Instant) -> impl Fn(&[Value]) -> Value {
    move |_args: &[Value]| Value::number(start.elapsed().as_secs_f64())
}
