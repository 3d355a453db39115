pub mod stimulus;
pub mod timeline;
pub mod trial;

pub use stimulus::{DistractorCondition, DistractorSource, StimulusId};
pub use timeline::{BreakMarker, Timeline, TimelineEntry};
pub use trial::{BlockPlan, Categorized, TargetPresence, TrialSpec};
