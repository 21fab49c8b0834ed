//! Static mood/language catalog. Incoming requests are validated against
//! these lists, and the mood drives the search queries the finders use.

pub const DEFAULT_LANGUAGE: &str = "english";

const MOODS: &[&str] = &[
    "calm",
    "focused",
    "relaxed",
    "energized",
    "grateful",
    "happy",
    "peaceful",
    "confident",
    "creative",
    "compassionate",
    "mindful",
    "balanced",
    "resilient",
    "hopeful",
    "serene",
];

const LANGUAGES: &[&str] = &["english", "french"];

pub fn moods() -> &'static [&'static str] {
    MOODS
}

pub fn languages() -> &'static [&'static str] {
    LANGUAGES
}

pub fn is_supported_mood(mood: &str) -> bool {
    MOODS.contains(&mood)
}

pub fn is_supported_language(language: &str) -> bool {
    LANGUAGES.contains(&language)
}

/// Search queries tried for a mood, in priority order. Non-English
/// languages get the language appended to each query.
pub fn queries_for(mood: &str, language: &str) -> Vec<String> {
    let base: &[&str] = match mood {
        "calm" => &["calm meditation music 10 minutes", "calm meditation 10 min"],
        "focused" => &[
            "focus meditation music 10 minutes",
            "concentration meditation 10 min",
        ],
        "relaxed" => &["relaxing meditation music 10 minutes", "relaxation 10 min"],
        "energized" => &[
            "energizing meditation music 10 minutes",
            "energy meditation 10 min",
        ],
        "grateful" => &[
            "gratitude meditation music 10 minutes",
            "gratitude meditation 10 min",
        ],
        "happy" => &["happiness meditation music 10 minutes", "joy meditation 10 min"],
        "peaceful" => &[
            "peaceful meditation music 10 minutes",
            "peace meditation 10 min",
        ],
        "confident" => &[
            "confidence meditation music 10 minutes",
            "self-esteem meditation 10 min",
        ],
        "creative" => &[
            "creativity meditation music 10 minutes",
            "creative meditation 10 min",
        ],
        "compassionate" => &[
            "compassion meditation music 10 minutes",
            "loving-kindness meditation 10 min",
        ],
        _ => &[
            "meditation music 10 minutes",
            "mindfulness meditation 10 min",
        ],
    };

    base.iter()
        .map(|q| {
            if language != DEFAULT_LANGUAGE {
                format!("{} {}", q, language)
            } else {
                q.to_string()
            }
        })
        .collect()
}

/// Pre-vetted known-good audio URLs, tried before any live search.
pub fn vetted_urls(mood: &str) -> Vec<&'static str> {
    let mood_specific: &[&str] = match mood {
        "calm" => &[
            "https://archive.org/download/10-minute-meditation-music/10%20Minute%20Meditation%20Music.mp3",
        ],
        "focused" => &[
            "https://cdn.pixabay.com/download/audio/2022/03/10/audio_c9d339a9c4.mp3?filename=ambient-piano-amp-strings-10711.mp3",
        ],
        "relaxed" => &[
            "https://archive.org/download/ambient-sleep-music-for-deep-sleep/Ambient%20Sleep%20Music%20for%20Deep%20Sleep.mp3",
        ],
        "energized" => &[
            "https://cdn.pixabay.com/download/audio/2022/01/18/audio_d0c6c29ab2.mp3?filename=morning-garden-acoustic-chill-7111.mp3",
        ],
        "peaceful" => &[
            "https://archive.org/download/RelaxingMeditationMusic_201611/Relaxing%20Meditation%20Music.mp3",
        ],
        _ => &[],
    };

    let mut urls: Vec<&'static str> = mood_specific.to_vec();
    urls.push(
        "https://archive.org/download/10-minute-meditation-music/10%20Minute%20Meditation%20Music.mp3",
    );
    urls.dedup();
    urls
}
