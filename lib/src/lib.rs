mod api;
pub mod clock;
mod club;
mod config;
mod error;
pub mod geo;
mod message;
pub mod placement;
pub mod proximity;
pub mod skill;
pub mod units;

pub use api::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use club::*;
pub use config::*;
pub use error::*;
pub use geo::Coordinate;
pub use message::*;
pub use placement::{
    AdvisoryOutcome, ClubRequest, CompletedShot, EngineSettings, LocationOutcome, PlacementState,
    ShotPlacement, ShotPlacementEngine, SkillContext,
};
pub use proximity::{CourseAnchor, NearestCourse, ProximityResult};
pub use skill::{ShotCategory, SkillTier, SkillVerdict};
pub use units::{Distance, UnitSystem};
