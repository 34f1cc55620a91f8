use saxsphase::analysis::PredictionRecord;
use saxsphase::{
    ConfidenceRecord,
    EnhancementComparison,
};
use tabled::settings::Style;
use tabled::{
    Table,
    Tabled,
};

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.*}", precision, v))
}

#[derive(Tabled)]
struct RankingRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Space group")]
    group: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
    #[tabled(rename = "Matched")]
    matched: String,
    #[tabled(rename = "Mean rel. error")]
    error: String,
}

pub fn ranking_table(ranking: &[ConfidenceRecord]) -> String {
    let rows = ranking.iter().enumerate().map(|(i, r)| RankingRow {
        rank: i + 1,
        group: r.space_group.to_string(),
        score: format!("{:.4}", r.score),
        verdict: r.interpretation.to_string(),
        matched: format!("{}/{}", r.matched_count, r.total_valid_predicted),
        error: opt(r.avg_relative_error, 5),
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct EnhancementRow {
    #[tabled(rename = "Enhancement")]
    name: String,
    #[tabled(rename = "Quality")]
    score: String,
    #[tabled(rename = "")]
    note: String,
}

pub fn comparison_table(comparison: &EnhancementComparison) -> String {
    let rows = comparison.reports.iter().map(|r| EnhancementRow {
        name: r.enhancement.to_string(),
        score: opt(r.score, 4),
        note: match (&r.error, comparison.best == Some(r.enhancement)) {
            (Some(err), _) => err.clone(),
            (None, true) => "best".to_string(),
            (None, false) => String::new(),
        },
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "k")]
    k: usize,
    #[tabled(rename = "hkl")]
    miller: String,
    #[tabled(rename = "q predicted")]
    q_predicted: String,
    #[tabled(rename = "in range")]
    in_range: bool,
    #[tabled(rename = "q matched")]
    matched: String,
    #[tabled(rename = "rel. error")]
    relative_error: String,
}

pub fn prediction_table(prediction: &PredictionRecord) -> String {
    let rows = prediction.peaks.iter().map(|p| PredictionRow {
        k: p.k,
        miller: p.miller.clone(),
        q_predicted: format!("{:.5}", p.q_predicted),
        in_range: p.in_range,
        matched: opt(p.matched_q, 5),
        relative_error: opt(p.relative_error, 5),
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use saxsphase::analysis::{
        MATCH_TOLERANCE,
        predict,
        score_all,
    };

    #[test]
    fn test_ranking_table_lists_every_group() {
        let ranking = score_all(&[0.1, 0.2, 0.3, 0.4, 0.5], 0.1, 5, 0.05, 0.55, MATCH_TOLERANCE)
            .unwrap();
        let table = ranking_table(&ranking);
        for group in ["lamellar", "hexagonal", "pn3m", "ia3d", "im3m"] {
            assert!(table.contains(group), "{}", table);
        }
        assert!(table.contains("5/5"));
    }

    #[test]
    fn test_prediction_table_marks_unmatched() {
        let prediction = predict(0.1, saxsphase::SpaceGroup::Lamellar, 5, 0.05, 0.35).unwrap();
        let table = prediction_table(&prediction);
        assert!(table.contains("0.50000"));
        assert!(table.contains("false"));
    }
}
