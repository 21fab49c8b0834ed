pub mod feedback;
pub mod meditation;

pub use feedback::{
    FeedbackEntry, FeedbackSubmission, PreferenceData, PreferenceStats, Recommendations,
    SessionRecord, TrackRating,
};
pub use meditation::{
    FoundSource, GeneratedMeditation, MeditationRequest, Playback, QualityReport, SourceInfo,
};
