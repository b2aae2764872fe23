use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::builder::{BuildOptions, DEFAULT_SEED};
use crate::formats::Format;
use crate::formats::random::RandomParams;

fn default_true() -> bool {
    true
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    pub genome: String,
    pub format: Format,
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub fasta_candidates: Vec<PathBuf>,
    #[serde(default = "default_true")]
    pub read_sequences: bool,
    #[serde(default)]
    pub random_sequences: bool,
    pub frame_correction: Option<bool>,
    #[serde(default)]
    pub frame_correction_min_non_zero: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub random: RandomParams,
    pub input_offset: Option<i64>,
}

impl BuildConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.genome.trim().is_empty() {
            bail!("'genome' must not be empty");
        }
        if self.format.needs_input() && self.input.is_none() {
            bail!("'input' is required for the {} format", self.format);
        }
        if !(0.0..1.0).contains(&self.frame_correction_min_non_zero) {
            bail!(
                "'frameCorrectionMinNonZero' must be in [0, 1), got {}",
                self.frame_correction_min_non_zero
            );
        }
        if let Some(offset) = self.input_offset.filter(|o| !(0..=1).contains(o)) {
            bail!("'inputOffset' must be 0 or 1, got {offset}");
        }
        if self.format == Format::Random {
            let r = &self.random;
            if r.max_gene_len <= 0 || r.max_transcripts <= 0 || r.max_exons <= 0 {
                bail!("'random' limits must be positive: {r:?}");
            }
        }
        Ok(())
    }

    /// The library-side form of these settings.
    #[must_use]
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            genome: self.genome.clone(),
            read_sequences: self.read_sequences,
            random_sequences: self.random_sequences,
            fasta_candidates: self.fasta_candidates.clone(),
            frame_correction: self.frame_correction,
            min_nonzero_frames: self.frame_correction_min_non_zero,
            seed: self.seed,
            input_offset: self.input_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn valid_config_all_fields() {
        let json = r#"{
            "genome": "GRCh38.mane",
            "format": "gff3",
            "input": "/data/genes.gff.gz",
            "fastaCandidates": ["/data/GRCh38.fa", "/data/sequences.fa"],
            "readSequences": true,
            "frameCorrection": false,
            "frameCorrectionMinNonZero": 0.25,
            "seed": 7,
            "inputOffset": 1
        }"#;
        let f = write_config(json);
        let config = BuildConfig::from_file(f.path()).unwrap();
        assert_eq!(config.format, Format::Gff3);
        assert_eq!(config.fasta_candidates.len(), 2);

        let options = config.options();
        assert_eq!(options.genome, "GRCh38.mane");
        assert_eq!(options.frame_correction, Some(false));
        assert!((options.min_nonzero_frames - 0.25).abs() < f64::EPSILON);
        assert_eq!(options.seed, 7);
        assert_eq!(options.input_offset, Some(1));
    }

    #[test]
    fn defaults_for_omitted_fields() {
        let json = r#"{ "genome": "test", "format": "knownGene", "input": "kg.txt" }"#;
        let f = write_config(json);
        let config = BuildConfig::from_file(f.path()).unwrap();
        assert!(config.read_sequences);
        assert!(!config.random_sequences);
        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.frame_correction, None);
        assert_eq!(config.random, RandomParams::default());
    }

    #[test]
    fn random_format_needs_no_input() {
        let json = r#"{
            "genome": "rand",
            "format": "random",
            "random": { "maxGeneLen": 500, "addUtrs": true }
        }"#;
        let f = write_config(json);
        let config = BuildConfig::from_file(f.path()).unwrap();
        assert_eq!(config.random.max_gene_len, 500);
        assert_eq!(config.random.max_exons, RandomParams::default().max_exons);
        assert!(config.random.add_utrs);
    }

    #[test]
    fn missing_input() {
        let f = write_config(r#"{ "genome": "test", "format": "gtf22" }"#);
        let err = BuildConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("'input' is required"));
    }

    #[test]
    fn unknown_format() {
        let f = write_config(r#"{ "genome": "test", "format": "bed", "input": "x" }"#);
        let err = BuildConfig::from_file(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains("unrecognized input format"));
    }

    #[test]
    fn bad_offset() {
        let f = write_config(r#"{ "genome": "test", "format": "gff2", "input": "x", "inputOffset": 3 }"#);
        let err = BuildConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("inputOffset"));
    }
}
