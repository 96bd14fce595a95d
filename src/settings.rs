//! Application settings storage
//!
//! Stores paths, header grammar bounds and exam presets in a JSON file in the
//! data directory. Missing fields fall back to defaults so older files keep
//! loading after new settings are added.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BankError, Result};

const SETTINGS_FILE: &str = "settings.json";

/// Numeric bounds and markers for the slide header grammar.
///
/// The bounds have differed between decks, so they live here rather than
/// inside the patterns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderConfig {
    #[serde(default = "default_topic_min")]
    pub topic_min: u32,
    #[serde(default = "default_topic_max")]
    pub topic_max: u32,
    /// Must be at least 1; question number 0 belongs to challenges
    #[serde(default = "default_question_min")]
    pub question_min: u32,
    #[serde(default = "default_question_max")]
    pub question_max: u32,
    /// Upper bound for `T<n>Q<m>: Solution` headers
    #[serde(default = "default_question_max")]
    pub solution_question_max: u32,
    /// Phrase marking a challenge question header, matched case-insensitively
    #[serde(default = "default_challenge_marker")]
    pub challenge_marker: String,
}

fn default_topic_min() -> u32 {
    1
}

fn default_topic_max() -> u32 {
    18
}

fn default_question_min() -> u32 {
    1
}

fn default_question_max() -> u32 {
    100
}

fn default_challenge_marker() -> String {
    "8 pt challenge".to_string()
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            topic_min: default_topic_min(),
            topic_max: default_topic_max(),
            question_min: default_question_min(),
            question_max: default_question_max(),
            solution_question_max: default_question_max(),
            challenge_marker: default_challenge_marker(),
        }
    }
}

impl HeaderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.topic_min > self.topic_max {
            return Err(BankError::Settings(format!(
                "topic range {}..={} is empty",
                self.topic_min, self.topic_max
            )));
        }
        if self.question_min == 0 {
            return Err(BankError::Settings(
                "question_min must be at least 1 (Q0 is reserved for challenges)".to_string(),
            ));
        }
        if self.question_min > self.question_max || self.question_min > self.solution_question_max {
            return Err(BankError::Settings(format!(
                "question range {}..={} (solutions ..={}) is empty",
                self.question_min, self.question_max, self.solution_question_max
            )));
        }
        if self.challenge_marker.split_whitespace().next().is_none() {
            return Err(BankError::Settings("challenge_marker is blank".to_string()));
        }
        Ok(())
    }

    pub fn topic_in_range(&self, topic: u32) -> bool {
        (self.topic_min..=self.topic_max).contains(&topic)
    }

    pub fn question_in_range(&self, qnum: u32) -> bool {
        (self.question_min..=self.question_max).contains(&qnum)
    }

    pub fn solution_in_range(&self, qnum: u32) -> bool {
        (self.question_min..=self.solution_question_max).contains(&qnum)
    }
}

/// Named inclusive topic range, e.g. "Exam 1" covering topics 1-6
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExamPresetConfig {
    pub name: String,
    pub first_topic: u32,
    pub last_topic: u32,
}

fn default_exam_presets() -> Vec<ExamPresetConfig> {
    [("Exam 1", 1, 6), ("Exam 2", 7, 12), ("Exam 3", 13, 18)]
        .into_iter()
        .map(|(name, first_topic, last_topic)| ExamPresetConfig {
            name: name.to_string(),
            first_topic,
            last_topic,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Slide deck the bank is built from (relative paths resolve against the data dir)
    #[serde(default = "default_source_pdf")]
    pub source_pdf: PathBuf,
    #[serde(default = "default_bank_path")]
    pub bank_path: PathBuf,
    /// Topic -> title/goals metadata, optional
    #[serde(default = "default_goals_path")]
    pub goals_path: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub header: HeaderConfig,
    /// Drop questions without a solution slide when selecting
    #[serde(default = "default_true")]
    pub require_solution_page: bool,
    #[serde(default = "default_exam_presets")]
    pub exam_presets: Vec<ExamPresetConfig>,
}

fn default_source_pdf() -> PathBuf {
    PathBuf::from("allclickerslides.pdf")
}

fn default_bank_path() -> PathBuf {
    PathBuf::from("question_bank.json")
}

fn default_goals_path() -> PathBuf {
    PathBuf::from("topic_learning_goals.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_pdf: default_source_pdf(),
            bank_path: default_bank_path(),
            goals_path: default_goals_path(),
            output_dir: default_output_dir(),
            header: HeaderConfig::default(),
            require_solution_page: true,
            exam_presets: default_exam_presets(),
        }
    }
}

impl Settings {
    /// Load settings from `<data_dir>/settings.json`, or defaults if the file is absent
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        let settings: Settings = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| BankError::io(&path, e))?;
            serde_json::from_str(&content).map_err(|e| BankError::schema(&path, e))?
        } else {
            Settings::default()
        };
        settings.header.validate()?;
        Ok(settings.resolved_against(data_dir))
    }

    /// Save settings to `<data_dir>/settings.json`
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| BankError::Serialize { what: "settings", source: e })?;

        fs::create_dir_all(data_dir).map_err(|e| BankError::io(data_dir, e))?;

        let path = data_dir.join(SETTINGS_FILE);
        fs::write(&path, content).map_err(|e| BankError::io(&path, e))?;
        Ok(())
    }

    fn resolved_against(mut self, data_dir: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { data_dir.join(p) } else { p };
        self.source_pdf = resolve(self.source_pdf);
        self.bank_path = resolve(self.bank_path);
        self.goals_path = resolve(self.goals_path);
        self.output_dir = resolve(self.output_dir);
        self
    }
}

/// Resolve the data directory: explicit override, else the platform data dir, else `./data`
pub fn data_dir(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    dirs::data_dir()
        .map(|p| p.join("exambank"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Default tracing filter for the binaries
pub fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "exambank_lib=debug,info"
    } else {
        "exambank_lib=info,warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.header, HeaderConfig::default());
        assert!(settings.require_solution_page);
        assert_eq!(settings.exam_presets.len(), 3);
        assert_eq!(settings.bank_path, dir.path().join("question_bank.json"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"header": {"question_max": 99}, "require_solution_page": false}"#,
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.header.question_max, 99);
        assert_eq!(settings.header.solution_question_max, 100);
        assert_eq!(settings.header.topic_max, 18);
        assert!(!settings.require_solution_page);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        assert!(matches!(Settings::load(dir.path()), Err(BankError::Schema { .. })));
    }

    #[test]
    fn test_question_min_zero_rejected() {
        let header = HeaderConfig { question_min: 0, ..HeaderConfig::default() };
        assert!(header.validate().is_err());
    }

    #[test]
    fn test_absolute_paths_kept() {
        let dir = tempfile::tempdir().unwrap();
        let abs = dir.path().join("elsewhere").join("deck.pdf");
        let settings = Settings { source_pdf: abs.clone(), ..Settings::default() };
        settings.save(dir.path()).unwrap();

        let loaded = Settings::load(dir.path()).unwrap();
        assert_eq!(loaded.source_pdf, abs);
    }
}
