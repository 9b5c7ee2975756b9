pub mod phase1;
pub mod phase2;
pub mod phase3;
pub mod phase4;

pub use phase1::Phase1Pipeline;
pub use phase2::Phase2Pipeline;
pub use phase3::Phase3Pipeline;
pub use phase4::Phase4Pipeline;
