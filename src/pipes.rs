// src/pipes.rs
//
// Callback contract of the external execution protocol. The framework owns
// the process and drives these traits; the task code only sees them.

use crate::error::Result;
use crate::job_conf::JobConf;

/// Reader role: the framework pulls key/value pairs until `None`
pub trait RecordReader {
    fn next(&mut self) -> Result<Option<(String, String)>>;

    /// Monotonic fraction of the split consumed, 0 when unknown
    fn progress(&self) -> f32;
}

/// What a mapper sees for one input pair
pub trait MapContext {
    fn input_key(&self) -> &str;

    fn input_value(&self) -> &str;

    fn job_conf(&self) -> &JobConf;

    fn emit(&mut self, key: &str, value: &str) -> Result<()>;
}

/// What a reducer sees for one key group
pub trait ReduceContext {
    fn input_key(&self) -> &str;

    /// Advance to the next value of the group; false once exhausted
    fn next_value(&mut self) -> bool;

    /// Current value; only meaningful after `next_value` returned true
    fn input_value(&self) -> &str;

    fn job_conf(&self) -> &JobConf;

    fn emit(&mut self, key: &str, value: &str) -> Result<()>;
}

pub trait Mapper {
    fn map(&mut self, ctx: &mut dyn MapContext) -> Result<()>;
}

pub trait Reducer {
    fn reduce(&mut self, ctx: &mut dyn ReduceContext) -> Result<()>;
}
