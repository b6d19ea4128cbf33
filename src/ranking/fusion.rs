//! Weighted fusion of text and image candidate sets

use crate::error::{LensError, Result};
use crate::ranking::{comparable_score, filter_results, RankingConfig};
use crate::search::SearchResult;
use ahash::{HashMap, HashMapExt};
use serde::{Deserialize, Serialize};

/// Allowed drift of `text + image` away from 1.0
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Default combined-score cut applied after fusion.
///
/// A single-modality hit that just clears the 0.2 similarity threshold scores
/// 0.1 at equal weights.
pub const DEFAULT_MIN_FUSED_SCORE: f64 = 0.1;

/// Channel weights for hybrid fusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub text: f64,
    pub image: f64,
}

impl FusionWeights {
    /// Create weights, rejecting pairs that do not sum to 1.0
    pub fn new(text: f64, image: f64) -> Result<Self> {
        let weights = Self { text, image };
        weights.validate()?;
        Ok(weights)
    }

    /// Derive the image weight as `1 - text`
    pub fn from_text(text: f64) -> Result<Self> {
        Self::new(text, 1.0 - text)
    }

    /// Both weights in `[0, 1]` and summing to 1.0 within tolerance
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [("text", self.text), ("image", self.image)] {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(LensError::InvalidConfiguration(format!(
                    "{} weight must be between 0.0 and 1.0, got {}",
                    name, weight
                )));
            }
        }

        let sum = self.text + self.image;
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(LensError::InvalidConfiguration(format!(
                "fusion weights must sum to 1.0, got {} + {} = {}",
                self.text, self.image, sum
            )));
        }

        Ok(())
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            text: 0.7,
            image: 0.3,
        }
    }
}

/// How candidates from the two modalities are matched up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionKey {
    /// Same `uid` means same entry, whichever modality reported it
    #[default]
    Uid,
    /// Key on `(modality, uid)`; equal uids across modalities stay separate
    ModalityQualified,
}

/// Threshold rule applied to fused candidates before ranking
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PostFusionFilter {
    /// Keep candidates whose fused score is at least `min_score`
    Combined { min_score: f64 },
    /// Re-apply the similarity/rerank OR test to the merged record
    PerAxis,
    /// Keep everything
    Disabled,
}

impl Default for PostFusionFilter {
    fn default() -> Self {
        PostFusionFilter::Combined {
            min_score: DEFAULT_MIN_FUSED_SCORE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Text,
    Image,
}

#[derive(Default)]
struct FusionSlot<'a> {
    text: Option<&'a SearchResult>,
    image: Option<&'a SearchResult>,
}

/// Fuse text and image candidates into one list with `fused_score` set.
///
/// Every distinct key from either input yields exactly one output entry. A
/// candidate missing from one modality contributes `0.0` for that channel.
/// When both records exist the text record's fields win and the image record
/// only fills what the text record lacks.
///
/// Weights are used as given. Callers check them with
/// [`FusionWeights::validate`] first.
///
/// The output follows first appearance (text list, then image-only entries)
/// and is not ranked.
pub fn fuse(
    text_results: &[SearchResult],
    image_results: &[SearchResult],
    weights: &FusionWeights,
    key: FusionKey,
) -> Vec<SearchResult> {
    let mut index: HashMap<(Option<Channel>, &str), usize> = HashMap::new();
    let mut slots: Vec<FusionSlot<'_>> = Vec::new();

    let inputs = [(Channel::Text, text_results), (Channel::Image, image_results)];
    for (channel, results) in inputs {
        for result in results {
            let slot_key = match key {
                FusionKey::Uid => (None, result.uid.as_str()),
                FusionKey::ModalityQualified => (Some(channel), result.uid.as_str()),
            };

            let position = *index.entry(slot_key).or_insert_with(|| {
                slots.push(FusionSlot::default());
                slots.len() - 1
            });

            // First record per modality wins; a response should not repeat a uid
            let slot = &mut slots[position];
            let target = match channel {
                Channel::Text => &mut slot.text,
                Channel::Image => &mut slot.image,
            };
            if target.is_none() {
                *target = Some(result);
            }
        }
    }

    let fused: Vec<SearchResult> = slots
        .into_iter()
        .filter_map(|slot| {
            let text_score = slot.text.map(comparable_score).unwrap_or(0.0);
            let image_score = slot.image.map(comparable_score).unwrap_or(0.0);
            let score = weights.text * text_score + weights.image * image_score;

            let mut merged = match (slot.text, slot.image) {
                (Some(text), Some(image)) => {
                    let mut merged = text.clone();
                    fill_missing(&mut merged, image);
                    merged
                }
                (Some(text), None) => text.clone(),
                (None, Some(image)) => image.clone(),
                (None, None) => return None,
            };
            merged.fused_score = Some(score);
            Some(merged)
        })
        .collect();

    tracing::debug!(
        "Fused {} text + {} image candidates into {} entries",
        text_results.len(),
        image_results.len(),
        fused.len()
    );

    fused
}

/// Apply the configured post-fusion rule, preserving order
pub fn apply_post_fusion_filter(
    fused: &[SearchResult],
    rule: &PostFusionFilter,
    config: &RankingConfig,
) -> Vec<SearchResult> {
    match rule {
        PostFusionFilter::Combined { min_score } => fused
            .iter()
            .filter(|result| comparable_score(result) >= *min_score)
            .cloned()
            .collect(),
        PostFusionFilter::PerAxis => filter_results(fused, config),
        PostFusionFilter::Disabled => fused.to_vec(),
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(other);
    }
}

fn fill_missing(target: &mut SearchResult, other: &SearchResult) {
    fill(&mut target.content_type, &other.content_type);
    fill(&mut target.similarity, &other.similarity);
    fill(&mut target.rerank_score, &other.rerank_score);
    fill(&mut target.locale, &other.locale);
    fill(&mut target.title, &other.title);
    fill(&mut target.description, &other.description);
    fill(&mut target.url, &other.url);
    fill(&mut target.filename, &other.filename);
    fill(&mut target.alt, &other.alt);

    for (key, value) in &other.extra {
        target
            .extra
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
}
