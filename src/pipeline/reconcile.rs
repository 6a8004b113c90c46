//! Reconciliation: decide the final text of every region on a page.
//!
//! A region takes the refined transcription when refinement succeeded, with
//! confidence pinned to 1.0; otherwise it keeps the detector's baseline text
//! and confidence. Refinement errors stop here: callers only ever see
//! [`ReconciledRegion`]s.

use crate::error::RefinementError;
use crate::model::{Page, ReconciledRegion, Region, TextSource};
use crate::pipeline::refine::RegionRefiner;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Combine one region with the outcome of its refinement.
pub fn reconcile(index: usize, region: Region, outcome: Result<String, RefinementError>) -> ReconciledRegion {
    match outcome {
        Ok(text) => ReconciledRegion {
            index,
            final_text: text,
            final_confidence: 1.0,
            source: TextSource::Refined,
            region,
        },
        Err(e) => ReconciledRegion {
            index,
            final_text: region.baseline_text.clone(),
            final_confidence: region.baseline_confidence,
            source: TextSource::Baseline {
                reason: e.to_string(),
            },
            region,
        },
    }
}

/// Refine and reconcile one region.
///
/// Degenerate regions never reach the refiner.
pub async fn reconcile_region(
    page: &Page,
    index: usize,
    region: Region,
    refiner: &dyn RegionRefiner,
) -> ReconciledRegion {
    let outcome = if region.is_degenerate() {
        let (width, height) = region
            .bounding_box()
            .map(|b| (b.width() as u32, b.height() as u32))
            .unwrap_or((0, 0));
        Err(RefinementError::Degenerate { width, height })
    } else {
        refiner.refine(page, &region).await
    };

    match &outcome {
        Ok(_) => debug!("Page {} region {}: refined", page.page_num, index),
        Err(RefinementError::Disabled) => {}
        Err(e) => warn!(
            "Page {} region {}: keeping baseline text ({})",
            page.page_num, index, e
        ),
    }

    reconcile(index, region, outcome)
}

/// Reconcile every region of a page with up to `concurrency` refinements in
/// flight. The result is ordered by detection index.
pub async fn reconcile_page(
    page: &Page,
    regions: Vec<Region>,
    refiner: &Arc<dyn RegionRefiner>,
    concurrency: usize,
) -> Vec<ReconciledRegion> {
    let mut out: Vec<ReconciledRegion> = stream::iter(regions.into_iter().enumerate())
        .map(|(index, region)| reconcile_region(page, index, region, refiner.as_ref()))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    out.sort_by_key(|r| r.index);
    out
}
