//! Discipline scores, question lookup, and signal-sharing diagnostics.

use std::collections::{BTreeMap, BTreeSet};

use super::control_graph::ControlGraph;
use super::types::{BundleSummary, DisciplineScore, GraphSummary, Question, StatusView};

#[derive(Default)]
struct Tally {
    weight_total: f64,
    pass_weight: f64,
    counted: usize,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

impl ControlGraph {
    /// Weighted 0-100 score per discipline.
    ///
    /// Every result adds its control's weight to the discipline total.
    /// Pass earns the full weight and Partial half; every other status,
    /// Deferred and the error statuses included, earns nothing.
    pub fn discipline_score(&self, results: &impl StatusView) -> BTreeMap<String, DisciplineScore> {
        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
        results.for_each_status(&mut |id, status| {
            let credit = status.score_credit().unwrap_or(0.0);
            let Some(node) = self.nodes.get(id) else {
                return;
            };
            for affect in node.affects() {
                let tally = tallies.entry(affect.discipline.clone()).or_default();
                tally.weight_total += affect.weight;
                tally.pass_weight += affect.weight * credit;
                tally.counted += 1;
            }
        });

        tallies
            .into_iter()
            .map(|(discipline, tally)| {
                let score = if tally.weight_total > 0.0 {
                    (tally.pass_weight / tally.weight_total * 100.0).round().clamp(0.0, 100.0) as u32
                } else {
                    0
                };
                let label = self.discipline_label(&discipline).to_string();
                let entry = DisciplineScore {
                    discipline: discipline.clone(),
                    label,
                    score,
                    weight_total: round3(tally.weight_total),
                    pass_weight: round3(tally.pass_weight),
                    controls_counted: tally.counted,
                };
                (discipline, entry)
            })
            .collect()
    }

    /// Question records attached to `control_ids`, sorted by question id.
    ///
    /// With `only_failed`, a question is kept only if it can resolve at
    /// least one control in that set.
    pub fn get_questions_for<S: AsRef<str>>(
        &self,
        control_ids: &[S],
        only_failed: Option<&BTreeSet<String>>,
    ) -> Vec<Question> {
        let qids: BTreeSet<&str> = control_ids
            .iter()
            .filter_map(|id| self.nodes.get(id.as_ref()))
            .flat_map(|node| node.question_resolvers().iter().map(String::as_str))
            .collect();

        qids.into_iter()
            .filter_map(|qid| {
                let def = self.questions.get(qid)?;
                if let Some(failed) = only_failed {
                    if !def.resolves_controls.iter().any(|c| failed.contains(c)) {
                        return None;
                    }
                }
                Some(Question {
                    id: qid.to_string(),
                    question: def.question.clone(),
                    resolves_controls: def.resolves_controls.clone(),
                    resolution_effect: def.resolution_effect.clone(),
                })
            })
            .collect()
    }

    /// Signal name -> controls (in input order) that need it.
    pub fn signal_sharing_analysis<S: AsRef<str>>(&self, control_ids: &[S]) -> BTreeMap<String, Vec<String>> {
        let mut sharing: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for id in control_ids {
            let Some(node) = self.nodes.get(id.as_ref()) else {
                continue;
            };
            for signal in node.required_signals() {
                sharing
                    .entry(signal.clone())
                    .or_default()
                    .push(node.control_id().to_string());
            }
        }
        sharing
    }

    pub fn summary(&self) -> GraphSummary {
        let all: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        GraphSummary {
            total_controls: self.nodes.len(),
            total_bundles: self.bundles.len(),
            total_questions: self.questions.len(),
            disciplines: self.disciplines.keys().cloned().collect(),
            bundles: self
                .bundles
                .iter()
                .map(|(name, bundle)| {
                    (
                        name.clone(),
                        BundleSummary {
                            count: bundle.controls.len(),
                            controls: bundle.controls.clone(),
                        },
                    )
                })
                .collect(),
            signal_sharing: self.signal_sharing_analysis(&all),
            cycles: self.cycles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::test_support::graph_from;
    use crate::taxonomy::ControlStatus;
    use std::collections::BTreeMap;

    #[test]
    fn partial_earns_half() {
        let graph = graph_from(&[("a", ""), ("b", ""), ("c", ""), ("d", "")]);
        let results = BTreeMap::from([
            ("a".to_string(), ControlStatus::Pass),
            ("b".to_string(), ControlStatus::Partial),
            ("c".to_string(), ControlStatus::Fail),
            ("d".to_string(), ControlStatus::Fail),
        ]);
        let scores = graph.discipline_score(&results);
        let gov = &scores["governance"];
        assert_eq!(gov.controls_counted, 4);
        assert_eq!(gov.weight_total, 4.0);
        assert_eq!(gov.pass_weight, 1.5);
        assert_eq!(gov.score, 38);
        assert_eq!(gov.label, "governance");
    }

    #[test]
    fn unscored_statuses_weigh_in_at_zero_credit() {
        let graph = graph_from(&[("a", ""), ("b", ""), ("c", ""), ("d", "")]);
        let results = BTreeMap::from([
            ("a".to_string(), ControlStatus::Pass),
            ("b".to_string(), ControlStatus::Manual),
            ("c".to_string(), ControlStatus::SignalError),
            ("d".to_string(), ControlStatus::NotApplicable),
        ]);
        let gov = &graph.discipline_score(&results)["governance"];
        assert_eq!(gov.controls_counted, 4);
        assert_eq!(gov.weight_total, 4.0);
        assert_eq!(gov.score, 25);
    }

    #[test]
    fn deferred_children_lower_the_score() {
        let graph = graph_from(&[("p", ""), ("a", ""), ("b", ""), ("c", "p"), ("d", "p"), ("e", "p")]);
        let mut results = BTreeMap::from([
            ("p".to_string(), ControlStatus::Fail),
            ("a".to_string(), ControlStatus::Pass),
            ("b".to_string(), ControlStatus::Pass),
        ]);
        let before = graph.discipline_score(&results)["governance"].score;
        for child in ["c", "d", "e"] {
            results.insert(child.to_string(), ControlStatus::Deferred);
        }
        let gov = &graph.discipline_score(&results)["governance"];
        assert_eq!(before, 67);
        assert_eq!(gov.weight_total, 6.0);
        assert_eq!(gov.controls_counted, 6);
        assert_eq!(gov.score, 33);
    }

    #[test]
    fn sharing_maps_signal_to_controls() {
        let graph = graph_from(&[("a", ""), ("b", "a")]);
        let sharing = graph.signal_sharing_analysis(&["a", "b", "nope"]);
        assert_eq!(sharing["sig:a"], vec!["a".to_string()]);
        assert_eq!(sharing.len(), 2);
        let summary = graph.summary();
        assert_eq!(summary.total_controls, 2);
        assert_eq!(summary.bundles["all"].count, 2);
    }
}
