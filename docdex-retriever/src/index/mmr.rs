//! Similarity math: cosine similarity and maximal marginal relevance.

use half::f16;

/// Cosine similarity between two f16 vectors, computed in f32.
///
/// Mismatched lengths and zero-norm vectors score 0.
pub fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        let a_f32 = a[i].to_f32();
        let b_f32 = b[i].to_f32();
        dot_product += a_f32 * b_f32;
        norm_a += a_f32 * a_f32;
        norm_b += b_f32 * b_f32;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Greedy maximal-marginal-relevance selection.
///
/// Returns up to `k` candidate indices, most relevant first. The first
/// pick is the candidate most similar to the query; each later pick
/// maximizes `lambda * sim(query, c) - (1 - lambda) * max sim(c, selected)`,
/// trading relevance against redundancy with what is already selected.
pub fn maximal_marginal_relevance(
    query: &[f16],
    candidates: &[Vec<f16>],
    k: usize,
    lambda: f32,
) -> Vec<usize> {
    let effective_k = k.min(candidates.len());
    if effective_k == 0 {
        return Vec::new();
    }

    let similarities: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut best_idx = 0;
    for (idx, &sim) in similarities.iter().enumerate().skip(1) {
        if sim > similarities[best_idx] {
            best_idx = idx;
        }
    }

    let mut selected = vec![best_idx];

    while selected.len() < effective_k {
        let mut best_score = f32::NEG_INFINITY;
        let mut idx_to_add = 0;

        for (i, &query_score) in similarities.iter().enumerate() {
            if selected.contains(&i) {
                continue;
            }

            let mut max_selected_sim = f32::NEG_INFINITY;
            for &s in &selected {
                let sim = cosine_similarity(&candidates[i], &candidates[s]);
                max_selected_sim = max_selected_sim.max(sim);
            }

            let mmr_score = lambda * query_score - (1.0 - lambda) * max_selected_sim;
            if mmr_score > best_score {
                best_score = mmr_score;
                idx_to_add = i;
            }
        }

        selected.push(idx_to_add);
    }

    selected
}
