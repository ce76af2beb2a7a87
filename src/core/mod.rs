pub mod chunking;
pub mod driver;
pub mod export;
pub mod keypoints;
pub mod metadata;
pub mod playlist;
pub mod record;
pub mod summarize;
pub mod transcript;

pub use chunking::*;
pub use driver::*;
pub use export::*;
pub use keypoints::*;
pub use metadata::*;
pub use playlist::*;
pub use record::*;
pub use summarize::*;
pub use transcript::*;
