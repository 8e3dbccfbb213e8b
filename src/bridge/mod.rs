mod actor;
mod codec;
mod record;

pub use actor::*;
pub use codec::*;
pub use record::*;
