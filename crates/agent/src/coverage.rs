use std::collections::BTreeSet;

use qualcel_core::domain::criterion::{Aspect, Criterion, PRICE_TYPES};

pub const MISSING_PRICE_QUESTION: &str =
    "Qual é a faixa de preço ou orçamento máximo que você deseja considerar?";
pub const MISSING_ASPECTS_QUESTION: &str =
    "Quais características são mais importantes para você? (Ex.: câmera, bateria, desempenho)";
pub const MORE_DETAIL_QUESTION: &str = "Preciso de mais detalhes sobre o que você prioriza \
     (câmera, bateria, desempenho) para refinar a busca. Pode me dizer?";

fn aspect_hint(kind: &str) -> Option<Aspect> {
    match kind {
        "battery" => Some(Aspect::Battery),
        "camera" | "main_camera" | "secondary_camera" | "tertiary_camera" | "front_camera" => {
            Some(Aspect::Camera)
        }
        "benchmark" | "ram" | "rom" | "processor" => Some(Aspect::Performance),
        _ => None,
    }
}

/// Which preference buckets a criteria list touches. Recomputed per request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CriteriaCoverage {
    pub has_price: bool,
    pub aspects: BTreeSet<Aspect>,
}

impl CriteriaCoverage {
    pub fn analyze(criteria: &[Criterion]) -> Self {
        criteria.iter().fold(Self::default(), |mut coverage, criterion| {
            let kind = criterion.kind.trim().to_lowercase();
            if PRICE_TYPES.contains(&kind.as_str()) {
                coverage.has_price = true;
            } else if let Some(aspect) = aspect_hint(&kind) {
                coverage.aspects.insert(aspect);
            }
            coverage
        })
    }

    /// Budget plus one preference, or two preferences without a budget.
    pub fn has_minimum(&self) -> bool {
        (self.has_price && !self.aspects.is_empty()) || self.aspects.len() >= 2
    }

    pub fn question(&self) -> &'static str {
        if !self.has_price {
            MISSING_PRICE_QUESTION
        } else if self.aspects.is_empty() {
            MISSING_ASPECTS_QUESTION
        } else {
            MORE_DETAIL_QUESTION
        }
    }
}

pub fn analyze_coverage(criteria: &[Criterion]) -> CriteriaCoverage {
    CriteriaCoverage::analyze(criteria)
}

pub fn has_minimum_coverage(coverage: &CriteriaCoverage) -> bool {
    coverage.has_minimum()
}

pub fn build_coverage_question(coverage: &CriteriaCoverage) -> &'static str {
    coverage.question()
}
