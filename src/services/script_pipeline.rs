use crate::error::Result;
use crate::services::openai::OpenAiClient;
use std::path::PathBuf;

/// Alternate generation variant: write a guided meditation script with the
/// LLM, have the LLM revise it, then synthesize speech into the cache dir.
pub struct ScriptPipeline {
    client: OpenAiClient,
    cache_dir: PathBuf,
    voice: String,
}

impl ScriptPipeline {
    pub fn new(client: OpenAiClient, cache_dir: PathBuf) -> Self {
        Self {
            client,
            cache_dir,
            voice: "onyx".to_string(),
        }
    }

    pub async fn generate_script(&self, mood: &str, language: &str) -> Result<String> {
        let system = "You are a professional meditation instructor crafting guided meditation scripts.";
        let prompt = format!(
            "Create a 10-minute guided meditation script, in {}, for someone feeling {}.\n\
             The meditation should:\n\
             - Be approximately 10 minutes long when read aloud at a slow, calming pace\n\
             - Have a clear beginning, middle, and end structure\n\
             - Include appropriate breathing instructions\n\
             - Use natural, soothing language\n\
             - Be specific to the mood \"{}\"\n\
             - Include pauses (indicated by [pause] notations)\n\
             - Not include any timestamps or time indicators\n\n\
             Format the meditation script as plain text without additional explanations or summaries.",
            language, mood, mood
        );

        tracing::info!(mood = %mood, language = %language, "Generating meditation script");
        self.client.chat(system, &prompt, 2048, 0.8).await
    }

    pub async fn review_script(&self, script: &str, mood: &str) -> Result<String> {
        let system = "You are a professional meditation script editor.";
        let prompt = format!(
            "Review and improve the following meditation script. Your goal is to make it \
             natural, effective, and suited for audio narration.\n\n\
             The original script was created for someone feeling {}.\n\n\
             Original script:\n{}\n\n\
             Please review for:\n\
             - Natural flow and pacing, with appropriate [pause] markers\n\
             - Consistent tone that matches the stated mood\n\
             - Clear structure with beginning, middle, and ending\n\
             - Appropriate breathing instructions\n\
             - No repetitive phrases or awkward wording\n\
             - No timestamps or time markers\n\n\
             Return only the improved script, without explanations or comments.\n\
             Only make changes if they genuinely improve the script.",
            mood, script
        );

        tracing::info!(mood = %mood, "Reviewing meditation script");
        self.client.chat(system, &prompt, 2048, 0.4).await
    }

    /// Synthesize the script and write the MP3 into the cache dir. The
    /// filename is content-addressed on the script text.
    pub async fn synthesize(&self, script: &str, mood: &str, language: &str) -> Result<PathBuf> {
        let spoken = prepare_for_speech(script);
        let filename = format!("script_{}_{}_{:x}.mp3", mood, language, md5::compute(&spoken));
        let path = self.cache_dir.join(filename);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!("Synthesized audio already cached: {}", path.display());
            return Ok(path);
        }

        tracing::info!(mood = %mood, "Synthesizing meditation speech");
        let audio = self.client.speech(&spoken, &self.voice).await?;

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create cache dir: {}", e))?;
        tokio::fs::write(&path, &audio)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write synthesized audio: {}", e))?;

        Ok(path)
    }
}

/// The synthesis endpoint takes plain text, so [pause] markers become
/// ellipses the narrator naturally slows down on.
fn prepare_for_speech(script: &str) -> String {
    script.replace("[pause]", "...\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_markers_become_ellipses() {
        let script = "Breathe in. [pause] Breathe out. [pause]";
        let spoken = prepare_for_speech(script);
        assert!(!spoken.contains("[pause]"));
        assert!(spoken.contains("..."));
    }
}
