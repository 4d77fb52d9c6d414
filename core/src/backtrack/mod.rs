mod backtrack_trait;
mod trail;

pub use backtrack_trait::*;
pub use trail::{DecLvl, Trail};
