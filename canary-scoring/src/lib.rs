// Copyright 2026 Canary Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pure heuristic scoring of prompt text. No I/O, no async,
//! no configuration — this is the one component of the engine that is a
//! total function of its input.

use serde::{Deserialize, Serialize};

const VAGUE_TERMS: [&str; 5] = ["maybe", "sort of", "kind of", "roughly", "approximately"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicScores {
    pub length: f64,
    pub clarity: f64,
    pub toxicity: f64,
}

/// Score a piece of prompt text on three axes, each in `[0, 1]`, rounded to
/// 3 decimal places.
pub fn score(text: &str) -> HeuristicScores {
    HeuristicScores {
        length: round3(length_score(text)),
        clarity: round3(clarity_score(text)),
        toxicity: 1.0,
    }
}

fn length_score(text: &str) -> f64 {
    let wordcount = text.split_whitespace().count() as f64;
    (1.0 - (wordcount - 40.0).abs() / 60.0).clamp(0.0, 1.0)
}

fn clarity_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let vague_count: usize = VAGUE_TERMS.iter().map(|term| lower.matches(term).count()).sum();
    (1.0 - 0.15 * vague_count as f64).max(0.0)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_the_fresh_analyze_fixture() {
        let scores = score("Summarize the article in 3 bullets.");
        assert_eq!(scores.length, 0.433);
        assert_eq!(scores.clarity, 1.0);
        assert_eq!(scores.toxicity, 1.0);
    }

    #[test]
    fn length_score_peaks_at_forty_words() {
        let text = "word ".repeat(40);
        let scores = score(text.trim());
        assert_eq!(scores.length, 1.0);
    }

    #[test]
    fn clarity_score_penalizes_vague_terms() {
        let scores = score("maybe we should roughly approximately sort of do this kind of thing");
        // 5 vague-term hits: maybe, roughly, approximately, sort of, kind of
        assert_eq!(scores.clarity, round3(1.0 - 0.15 * 5.0));
    }

    #[test]
    fn clarity_score_floors_at_zero() {
        let text = "maybe ".repeat(10);
        let scores = score(text.trim());
        assert_eq!(scores.clarity, 0.0);
    }
}
