mod job;
mod record;

pub use job::*;
pub use record::*;
