//! Page signature computation
//!
//! Turns the layout attributes of a page into the fixed-length feature
//! vector the store matches on. All components are normalized to [0.0, 1.0]:
//!
//! 1. Page dimensions ratio (width/height)
//! 2. Text area ratio (safe bbox area / page area)
//! 3. Character density inside the safe bbox
//! 4. Lateral stripe present
//! 5. Stripe cut position ratio
//! 6. Complexity score
//! 7. Recommended engine score
//! 8. Needs cleaning
//! 9. Page type (native = 0.0, raster = 1.0)
//! 10. Cleaning reason count (capped at 5)

use crate::error::Result;
use crate::types::{BBox, EngineType, PatternType, SignatureVector};
use serde::{Deserialize, Serialize};

/// Typical character density is around 0.01-0.1 chars per square point;
/// scaled by this factor before capping at 1.0.
const CHAR_DENSITY_SCALE: f64 = 10.0;

/// Default stripe position when a stripe was detected but its cut is unknown
const DEFAULT_STRIPE_RATIO: f64 = 0.85;

/// Visual complexity classification of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageComplexity {
    NativeClean,
    NativeWithArtifacts,
    RasterClean,
    RasterDirty,
    RasterDegraded,
}

impl PageComplexity {
    fn score(&self) -> f64 {
        match self {
            PageComplexity::NativeClean => 0.0,
            PageComplexity::NativeWithArtifacts => 0.25,
            PageComplexity::RasterClean => 0.5,
            PageComplexity::RasterDirty => 0.75,
            PageComplexity::RasterDegraded => 1.0,
        }
    }
}

/// Layout attributes of one page, as reported by the layout analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageProfile {
    pub page_num: u32,
    /// Page width in points (letter default)
    pub page_width: f64,
    /// Page height in points (letter default)
    pub page_height: f64,
    /// Region of the page that is safe to extract from
    pub safe_bbox: BBox,
    pub char_count: u32,
    /// Whether a lateral stripe (court watermark band) was detected
    pub has_stripe: bool,
    /// Horizontal cut position of the stripe, when known
    pub stripe_x_cut: Option<f64>,
    pub complexity: Option<PageComplexity>,
    pub recommended_engine: Option<EngineType>,
    pub needs_cleaning: bool,
    pub cleaning_reasons: u32,
    /// False for pages with a native text layer, true for rasterized ones
    pub is_raster: bool,
}

impl PageProfile {
    pub fn new(page_num: u32, safe_bbox: BBox) -> Self {
        Self {
            page_num,
            page_width: 612.0,
            page_height: 792.0,
            safe_bbox,
            char_count: 0,
            has_stripe: false,
            stripe_x_cut: None,
            complexity: None,
            recommended_engine: None,
            needs_cleaning: false,
            cleaning_reasons: 0,
            is_raster: false,
        }
    }
}

/// Compute the 10-component signature vector for a page.
pub fn compute_signature(profile: &PageProfile) -> Result<SignatureVector> {
    let mut features = Vec::with_capacity(10);

    // 1. Page dimensions ratio
    let dim_ratio = if profile.page_height > 0.0 {
        (profile.page_width / profile.page_height).min(2.0) / 2.0
    } else {
        0.5
    };
    features.push(dim_ratio);

    // 2. Text area ratio
    let page_area = profile.page_width * profile.page_height;
    let bbox_area = profile.safe_bbox.area();
    let area_ratio = if page_area > 0.0 {
        (bbox_area / page_area).min(1.0)
    } else {
        1.0
    };
    features.push(area_ratio);

    // 3. Character density
    let char_density = if bbox_area > 0.0 {
        (profile.char_count as f64 / bbox_area * CHAR_DENSITY_SCALE).min(1.0)
    } else {
        0.0
    };
    features.push(char_density);

    // 4. Stripe flag
    features.push(if profile.has_stripe { 1.0 } else { 0.0 });

    // 5. Stripe position ratio
    let stripe_ratio = match profile.stripe_x_cut {
        Some(cut) if profile.page_width > 0.0 => cut / profile.page_width,
        _ if profile.has_stripe => DEFAULT_STRIPE_RATIO,
        _ => 0.0,
    };
    features.push(stripe_ratio);

    // 6. Complexity score
    let complexity = profile.complexity.unwrap_or(if profile.is_raster {
        PageComplexity::RasterDirty
    } else {
        PageComplexity::NativeClean
    });
    features.push(complexity.score());

    // 7. Recommended engine score
    let engine_score = match profile.recommended_engine {
        Some(EngineType::Marker) => 1.0,
        Some(EngineType::Tesseract) => 0.5,
        Some(EngineType::Pdfplumber) | None => 0.0,
    };
    features.push(engine_score);

    // 8. Cleaning flag
    features.push(if profile.needs_cleaning { 1.0 } else { 0.0 });

    // 9. Page type
    features.push(if profile.is_raster { 1.0 } else { 0.0 });

    // 10. Cleaning reason count, capped at 5
    features.push((profile.cleaning_reasons as f64 / 5.0).min(1.0));

    SignatureVector::new(features)
}

/// Infer the most likely pattern type for a page, with a confidence guess.
///
/// Rules fire in order; the first match wins. Pages that match nothing fall
/// back to `TextBlock` at moderate confidence.
pub fn infer_pattern_type(profile: &PageProfile) -> (PatternType, f64) {
    if profile.char_count < 50 {
        return (PatternType::Image, 0.7);
    }
    if profile.has_stripe {
        return (PatternType::Header, 0.6);
    }
    if profile.complexity == Some(PageComplexity::NativeClean) {
        return (PatternType::TextBlock, 0.8);
    }
    (PatternType::TextBlock, 0.5)
}
