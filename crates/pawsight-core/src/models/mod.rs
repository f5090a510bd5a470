//! Domain models for the pawsight pipeline.

mod alert;
mod analysis;
mod assessment;
mod dog;
mod fact;
pub(crate) mod lenient;
mod pattern;

pub use alert::*;
pub use analysis::*;
pub use assessment::*;
pub use dog::*;
pub use fact::*;
pub use pattern::*;
