use std::cmp::Reverse;
use std::collections::HashMap;

use itertools::Itertools;

use crate::model::{CandidateCount, Election, Vote};

#[derive(Debug)]
pub struct PositionTally {
    pub position: String,
    pub counts: Vec<CandidateCount>,
}

/// Counts votes per candidate for every position the election declares.
///
/// Pure function over the given votes. Every registered candidate appears
/// in the output, zero-voted ones included. Vote entries naming positions
/// or candidates outside the election's current definition are skipped:
/// votes are immutable, so after an admin edits the candidate list older
/// votes may carry orphaned selections. Within a position, counts sort
/// descending; the stable sort keeps candidate registration order as the
/// tie-break.
pub fn tally(election: &Election, votes: &[Vote]) -> Vec<PositionTally> {
    let counts: HashMap<(&str, &str), usize> = votes
        .iter()
        .flat_map(|v| v.votes.iter().map(|(p, c)| (p.as_str(), c.as_str())))
        .counts();

    election
        .positions
        .iter()
        .map(|position| {
            let mut position_counts: Vec<CandidateCount> = election
                .candidates_for(position)
                .map(|candidate| CandidateCount {
                    count: counts
                        .get(&(position.as_str(), candidate.id.as_str()))
                        .copied()
                        .unwrap_or(0),
                    candidate_id: candidate.id.clone(),
                })
                .collect();
            position_counts.sort_by_key(|c| Reverse(c.count));
            PositionTally {
                position: position.clone(),
                counts: position_counts,
            }
        })
        .collect()
}

/// The leading candidate of a position, or `None` when nobody has votes.
/// Whether a leader may be called a winner depends on the election status
/// and is the caller's decision.
pub fn leader(counts: &[CandidateCount]) -> Option<&CandidateCount> {
    counts.first().filter(|c| c.count > 0)
}

/// Results export in the shape the admin screen downloads.
pub fn results_csv(election: &Election, tallies: &[PositionTally]) -> String {
    let mut csv = String::from("Position,Candidate Name,Course,Votes\n");
    for position_tally in tallies {
        for candidate_count in &position_tally.counts {
            let candidate = election
                .candidates
                .iter()
                .find(|c| c.id == candidate_count.candidate_id);
            if let Some(candidate) = candidate {
                csv.push_str(&format!(
                    "{},{},{},{}\n",
                    quote(&position_tally.position),
                    quote(&candidate.name),
                    quote(&candidate.course),
                    candidate_count.count,
                ));
            }
        }
    }
    csv
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
