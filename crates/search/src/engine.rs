use std::cmp::Ordering;
use std::sync::Arc;

use store::{dot_product, EmbeddingStore, ImageId};

use crate::{AssetLibrary, SearchConfig, SearchError};

/// One ranked hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub id: ImageId,
    pub score: f32,
}

/// Brute-force ranking of a query embedding against every stored image.
///
/// Each call works on a snapshot of the store, so indexing can keep writing
/// while a search is running.
pub struct SearchEngine {
    store: Arc<EmbeddingStore>,
    cfg: SearchConfig,
}

impl SearchEngine {
    pub fn new(store: Arc<EmbeddingStore>, cfg: SearchConfig) -> Result<Self, SearchError> {
        cfg.validate()?;
        Ok(Self { store, cfg })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    /// Score `query` against every stored embedding and return the best `k`.
    ///
    /// Results are ordered by descending dot product. Equal scores fall back to
    /// ascending image id so the order is stable across runs.
    pub fn rank(&self, query: &[f32], k: usize) -> Result<Vec<ScoredResult>, SearchError> {
        let expected = self.store.dimension();
        if query.len() != expected {
            return Err(SearchError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let snapshot = self.store.all_entries();
        let candidates = snapshot.len();
        let mut results: Vec<ScoredResult> = snapshot
            .into_iter()
            .map(|(id, embedding)| ScoredResult {
                score: dot_product(query, &embedding),
                id,
            })
            .filter(|r| self.cfg.min_score.map_or(true, |min| r.score >= min))
            .collect();

        results.sort_unstable_by(compare_results);
        results.truncate(k);

        tracing::debug!(candidates, returned = results.len(), k, "ranked query");
        Ok(results)
    }

    /// Rank, then resolve each hit through `library` in rank order.
    ///
    /// Hits that fail to resolve are logged and left out; the remaining
    /// results keep their relative order.
    pub async fn search<L: AssetLibrary + ?Sized>(
        &self,
        query: &[f32],
        k: usize,
        library: &L,
    ) -> Result<Vec<L::Display>, SearchError> {
        let ranked = self.rank(query, k)?;
        let mut resolved = Vec::with_capacity(ranked.len());
        for hit in ranked {
            match library.resolve_display_image(&hit.id).await {
                Ok(display) => resolved.push(display),
                Err(err) => {
                    tracing::warn!(
                        image_id = %hit.id,
                        error = %err,
                        "dropping unresolvable search hit"
                    );
                }
            }
        }
        Ok(resolved)
    }
}

fn compare_results(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}
