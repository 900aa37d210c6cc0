//! Constraint table and score analysis.
//!
//! A constraint is a pure function from a solution to its matches. Every
//! match carries the ids of the entities involved and a multiplier; its
//! score impact is `weight * multiplier`, negated for penalties. The total
//! score is the fold of all impacts over the table, in registration order.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

use crate::planning::PlanningSolution;
use crate::score::Score;

/// Whether matches of a constraint lower or raise the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactType {
    Penalty,
    Reward,
}

/// One tuple of entities that a constraint matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Ids of the matched entities, in match order.
    pub justification: Vec<u64>,
    /// Times the constraint weight is applied.
    pub multiplier: i64,
}

impl Match {
    pub fn of(justification: Vec<u64>) -> Self {
        Self {
            justification,
            multiplier: 1,
        }
    }

    pub fn pair(a: u64, b: u64) -> Self {
        Self::of(vec![a, b])
    }

    pub fn with_multiplier(mut self, multiplier: i64) -> Self {
        self.multiplier = multiplier;
        self
    }
}

/// A named, weighted constraint.
pub struct Constraint<S: PlanningSolution> {
    name: &'static str,
    weight: S::Score,
    impact: ImpactType,
    matcher: fn(&S) -> Vec<Match>,
}

impl<S: PlanningSolution> Constraint<S> {
    /// Creates a constraint whose matches subtract `weight` from the score.
    pub fn penalize(name: &'static str, weight: S::Score, matcher: fn(&S) -> Vec<Match>) -> Self {
        Self {
            name,
            weight,
            impact: ImpactType::Penalty,
            matcher,
        }
    }

    /// Creates a constraint whose matches add `weight` to the score.
    pub fn reward(name: &'static str, weight: S::Score, matcher: fn(&S) -> Vec<Match>) -> Self {
        Self {
            name,
            weight,
            impact: ImpactType::Reward,
            matcher,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn weight(&self) -> S::Score {
        self.weight
    }

    pub fn impact(&self) -> ImpactType {
        self.impact
    }

    /// Runs the matcher against a solution.
    pub fn matches(&self, solution: &S) -> Vec<Match> {
        (self.matcher)(solution)
    }

    /// Score impact of a single match.
    pub fn impact_of(&self, m: &Match) -> S::Score {
        let impact = self.weight.multiply(m.multiplier);
        match self.impact {
            ImpactType::Penalty => -impact,
            ImpactType::Reward => impact,
        }
    }

    /// Sum of the impacts of every match in `solution`.
    pub fn evaluate(&self, solution: &S) -> S::Score {
        self.matches(solution)
            .iter()
            .fold(S::Score::zero(), |total, m| total + self.impact_of(m))
    }
}

/// The fixed-order table of constraints for one solution type.
pub struct ConstraintSet<S: PlanningSolution> {
    constraints: Vec<Constraint<S>>,
}

impl<S: PlanningSolution> ConstraintSet<S> {
    pub fn new(constraints: Vec<Constraint<S>>) -> Self {
        Self { constraints }
    }

    pub fn constraints(&self) -> &[Constraint<S>] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Looks up a constraint by name.
    pub fn get(&self, name: &str) -> Option<&Constraint<S>> {
        self.constraints.iter().find(|c| c.name == name)
    }

    /// Total score: the fold of every constraint's impact.
    pub fn score(&self, solution: &S) -> S::Score {
        self.constraints
            .iter()
            .fold(S::Score::zero(), |total, c| total + c.evaluate(solution))
    }

    /// Scores `solution` and stores the result on it.
    pub fn update_score(&self, solution: &mut S) -> S::Score {
        let score = self.score(solution);
        solution.set_score(Some(score));
        score
    }

    /// Per-constraint breakdown of the score, with every match.
    pub fn analyze(&self, solution: &S) -> ScoreAnalysis<S::Score> {
        let constraints: Vec<ConstraintAnalysis<S::Score>> = self
            .constraints
            .iter()
            .map(|c| {
                let matches: Vec<MatchAnalysis<S::Score>> = c
                    .matches(solution)
                    .into_iter()
                    .map(|m| MatchAnalysis {
                        score: c.impact_of(&m),
                        justification: m.justification,
                    })
                    .collect();
                let score = matches
                    .iter()
                    .fold(S::Score::zero(), |total, m| total + m.score);
                ConstraintAnalysis {
                    name: c.name.to_string(),
                    impact: c.impact,
                    weight: c.weight,
                    score,
                    match_count: matches.len(),
                    matches,
                }
            })
            .collect();
        let score = constraints
            .iter()
            .fold(S::Score::zero(), |total, c| total + c.score);
        ScoreAnalysis { score, constraints }
    }
}

/// Score contribution of a single match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAnalysis<Sc> {
    pub score: Sc,
    pub justification: Vec<u64>,
}

/// Analysis of a single constraint's contribution to the score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintAnalysis<Sc> {
    pub name: String,
    pub impact: ImpactType,
    pub weight: Sc,
    pub score: Sc,
    pub match_count: usize,
    pub matches: Vec<MatchAnalysis<Sc>>,
}

/// Result of analyzing a solution's constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreAnalysis<Sc> {
    pub score: Sc,
    pub constraints: Vec<ConstraintAnalysis<Sc>>,
}

/// Groups item indices by key, in first-occurrence order. Items whose key is
/// `None` are left out.
fn group_by_key<'a, T, K, F>(items: &'a [T], key: F) -> Vec<Vec<usize>>
where
    K: Hash + Eq,
    F: Fn(&'a T) -> Option<K>,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let Some(k) = key(item) else { continue };
        let slot = *slots.entry(k).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }
    groups
}

/// Every unordered pair of distinct items with equal keys, exactly once.
///
/// Pairs come out as `(earlier, later)` by position in `items`. Items whose
/// key is `None` never pair.
///
/// ```
/// use school_timetabling::constraint::unique_pairs;
///
/// let words = ["ant", "bee", "asp", "bat", "cow"];
/// let pairs = unique_pairs(&words, |w| w.chars().next());
/// assert_eq!(pairs, vec![(&"ant", &"asp"), (&"bee", &"bat")]);
/// ```
pub fn unique_pairs<'a, T, K, F>(items: &'a [T], key: F) -> Vec<(&'a T, &'a T)>
where
    K: Hash + Eq,
    F: Fn(&'a T) -> Option<K>,
{
    let mut pairs = Vec::new();
    for group in group_by_key(items, key) {
        for (n, &i) in group.iter().enumerate() {
            for &j in &group[n + 1..] {
                pairs.push((&items[i], &items[j]));
            }
        }
    }
    pairs
}

/// Every ordered pair `(a, b)` of distinct items with equal keys.
///
/// Used by directional rules (e.g. "b starts right after a ends") where each
/// direction is filtered separately.
pub fn ordered_pairs<'a, T, K, F>(items: &'a [T], key: F) -> Vec<(&'a T, &'a T)>
where
    K: Hash + Eq,
    F: Fn(&'a T) -> Option<K>,
{
    let mut pairs = Vec::new();
    for group in group_by_key(items, key) {
        for &i in &group {
            for &j in &group {
                if i != j {
                    pairs.push((&items[i], &items[j]));
                }
            }
        }
    }
    pairs
}
