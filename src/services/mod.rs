pub mod archive_finder;
pub mod catalog;
pub mod downloader;
pub mod feedback;
pub mod finder;
pub mod openai;
pub mod openai_finder;
pub mod orchestrator;
pub mod quality;
pub mod script_pipeline;
pub mod store;

pub use archive_finder::ArchiveFinder;
pub use downloader::AudioDownloader;
pub use feedback::FeedbackCollector;
pub use finder::SourceFinder;
pub use openai::OpenAiClient;
pub use openai_finder::OpenAiFinder;
pub use orchestrator::{MeditationOrchestrator, PipelineVariant};
pub use quality::QualityChecker;
pub use script_pipeline::ScriptPipeline;
pub use store::{JsonFileStore, MeditationStore};
