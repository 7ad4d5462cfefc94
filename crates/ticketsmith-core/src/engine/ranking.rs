//! Developer ranking
//!
//! Two tiers:
//! 1. Skill match: the developer whose distinct skills overlap the most
//!    distinct ticket tags (exact, case-sensitive).
//! 2. Load balance: when nobody overlaps, the developer with the fewest
//!    assigned tickets of any status.
//!
//! Candidates arrive oldest first (then by id) and ties keep the earliest
//! candidate in both tiers.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::Result;
use crate::commands::employee::{User, UserRepository};
use crate::commands::ticket::TicketRepository;
use crate::storage::Database;

/// A developer as seen by the ranking engine
#[derive(Debug, Clone)]
pub struct DeveloperCandidate {
    pub id: String,
    pub skills: Vec<String>,
    /// Tickets assigned to this developer, any status
    pub assigned_tickets: i64,
}

impl DeveloperCandidate {
    fn from_user(user: User, counts: &HashMap<String, i64>) -> Self {
        let assigned_tickets = counts.get(&user.id).copied().unwrap_or(0);
        Self {
            id: user.id,
            skills: user.skills,
            assigned_tickets,
        }
    }
}

/// Outcome of a ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum Assignment {
    SkillMatch {
        developer_id: String,
        matching_skills: usize,
    },
    LeastLoaded {
        developer_id: String,
        assigned_tickets: i64,
    },
    /// The organization has no developers
    Unassigned,
}

impl Assignment {
    pub fn developer_id(&self) -> Option<&str> {
        match self {
            Assignment::SkillMatch { developer_id, .. }
            | Assignment::LeastLoaded { developer_id, .. } => Some(developer_id),
            Assignment::Unassigned => None,
        }
    }
}

/// |distinct(skills) ∩ distinct(tags)|
pub fn matching_skills_count(skills: &[String], tags: &HashSet<&str>) -> usize {
    skills
        .iter()
        .map(String::as_str)
        .collect::<HashSet<&str>>()
        .intersection(tags)
        .count()
}

/// Pick a developer from an ordered candidate list
pub fn rank(candidates: &[DeveloperCandidate], tags: &[String]) -> Assignment {
    if let Some((developer_id, matching_skills)) = best_skill_match(candidates, tags) {
        return Assignment::SkillMatch {
            developer_id,
            matching_skills,
        };
    }
    match least_loaded(candidates) {
        Some(candidate) => Assignment::LeastLoaded {
            developer_id: candidate.id.clone(),
            assigned_tickets: candidate.assigned_tickets,
        },
        None => Assignment::Unassigned,
    }
}

/// Highest overlap above zero; the first candidate wins ties
fn best_skill_match(candidates: &[DeveloperCandidate], tags: &[String]) -> Option<(String, usize)> {
    let tags: HashSet<&str> = tags.iter().map(String::as_str).collect();
    let mut best: Option<(&DeveloperCandidate, usize)> = None;

    for candidate in candidates {
        let count = matching_skills_count(&candidate.skills, &tags);
        if count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((candidate, count)),
        }
    }

    best.map(|(candidate, count)| (candidate.id.clone(), count))
}

/// Fewest assigned tickets; the first candidate wins ties
fn least_loaded(candidates: &[DeveloperCandidate]) -> Option<&DeveloperCandidate> {
    let mut best: Option<&DeveloperCandidate> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.assigned_tickets >= current.assigned_tickets => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Reads the developer roster and workloads, then ranks
///
/// Read only. Nothing is locked between this read and the ticket write, so
/// two concurrent creations may see the same workload.
pub struct DeveloperRanker<'a> {
    db: &'a Database,
}

impl<'a> DeveloperRanker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn candidates(&self, organization_id: &str) -> Result<Vec<DeveloperCandidate>> {
        let developers = UserRepository::new(self.db)
            .list_developers(organization_id)
            .await?;
        if developers.is_empty() {
            return Ok(Vec::new());
        }

        let counts = TicketRepository::new(self.db)
            .assigned_counts(organization_id)
            .await?;

        Ok(developers
            .into_iter()
            .map(|user| DeveloperCandidate::from_user(user, &counts))
            .collect())
    }

    pub async fn select(&self, organization_id: &str, tags: &[String]) -> Result<Assignment> {
        let candidates = self.candidates(organization_id).await?;
        debug!(
            organization_id = %organization_id,
            candidates = candidates.len(),
            tags = tags.len(),
            "Ranking developers"
        );

        let assignment = rank(&candidates, tags);
        match &assignment {
            Assignment::SkillMatch {
                developer_id,
                matching_skills,
            } => info!(developer_id = %developer_id, matching_skills, "Assigned by skill match"),
            Assignment::LeastLoaded {
                developer_id,
                assigned_tickets,
            } => info!(developer_id = %developer_id, assigned_tickets, "Assigned by workload"),
            Assignment::Unassigned => info!(organization_id = %organization_id, "No developers to assign"),
        }

        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    fn candidate(id: &str, skills: &[&str], assigned: i64) -> DeveloperCandidate {
        DeveloperCandidate {
            id: id.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            assigned_tickets: assigned,
        }
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_matching_skills_count_distinct_and_case_sensitive() {
        let tag_set: HashSet<&str> = ["Go", "Go", "Docker"].into_iter().collect();
        let skills = tags(&["Go", "Go", "docker"]);
        assert_eq!(matching_skills_count(&skills, &tag_set), 1);
        assert_eq!(matching_skills_count(&[], &tag_set), 0);
    }

    #[test]
    fn test_skill_tier_picks_highest_overlap() {
        let candidates = vec![
            candidate("d1", &["Go"], 0),
            candidate("d2", &["Go", "Docker"], 9),
            candidate("d3", &["Python"], 0),
        ];
        assert_eq!(
            rank(&candidates, &tags(&["Go", "Docker"])),
            Assignment::SkillMatch {
                developer_id: "d2".to_string(),
                matching_skills: 2
            }
        );
    }

    #[test]
    fn test_skill_tier_tie_keeps_first() {
        let candidates = vec![
            candidate("d1", &["Go"], 5),
            candidate("d2", &["Go"], 0),
        ];
        assert_eq!(rank(&candidates, &tags(&["Go"])).developer_id(), Some("d1"));
    }

    #[test]
    fn test_go_developer_beats_python_developer() {
        let candidates = vec![candidate("d1", &["Go"], 0), candidate("d2", &["Python"], 0)];
        assert_eq!(rank(&candidates, &tags(&["Go"])).developer_id(), Some("d1"));
    }

    #[test]
    fn test_fallback_picks_least_loaded() {
        let candidates = vec![candidate("d1", &["Rust"], 3), candidate("d2", &["Rust"], 1)];
        assert_eq!(
            rank(&candidates, &tags(&["Go"])),
            Assignment::LeastLoaded {
                developer_id: "d2".to_string(),
                assigned_tickets: 1
            }
        );
    }

    #[test]
    fn test_fallback_tie_keeps_first_and_handles_empty_tags() {
        let candidates = vec![
            candidate("d1", &["Go"], 2),
            candidate("d2", &[], 1),
            candidate("d3", &["Go"], 1),
        ];
        assert_eq!(rank(&candidates, &[]).developer_id(), Some("d2"));
    }

    #[test]
    fn test_no_candidates_is_unassigned() {
        assert_eq!(rank(&[], &tags(&["Go"])), Assignment::Unassigned);
        assert_eq!(Assignment::Unassigned.developer_id(), None);
    }

    #[tokio::test]
    async fn test_select_reads_roster_and_workload() {
        let fx = Fixture::new().await;
        let d1 = fx.developer("Ken", &["Rust"]).await;
        let d2 = fx.developer("Rob", &["Rust"]).await;
        for _ in 0..3 {
            fx.ticket_for(Some(&d1.id)).await;
        }
        fx.ticket_for(Some(&d2.id)).await;

        let ranker = DeveloperRanker::new(&fx.db);
        let assignment = ranker.select(&fx.organization.id, &tags(&["Go"])).await.unwrap();
        assert_eq!(
            assignment,
            Assignment::LeastLoaded {
                developer_id: d2.id.clone(),
                assigned_tickets: 1
            }
        );

        let assignment = ranker.select(&fx.organization.id, &tags(&["Rust"])).await.unwrap();
        assert_eq!(assignment.developer_id(), Some(d1.id.as_str()));
    }

    #[tokio::test]
    async fn test_select_ignores_non_developers() {
        let fx = Fixture::new().await;
        fx.employee("Linus", crate::commands::employee::Role::Manager).await;

        let assignment = DeveloperRanker::new(&fx.db)
            .select(&fx.organization.id, &tags(&["Go"]))
            .await
            .unwrap();
        assert_eq!(assignment, Assignment::Unassigned);
    }

    #[tokio::test]
    async fn test_select_ties_go_to_earliest_developer() {
        let fx = Fixture::new().await;
        let first_go = fx.developer("Aaa", &["Go"]).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second_go = fx.developer("Bbb", &["Go"]).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        fx.developer("Ccc", &["Rust"]).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        fx.developer("Ddd", &["Rust"]).await;
        assert!(first_go.created_at < second_go.created_at);

        let ranker = DeveloperRanker::new(&fx.db);

        // Equal skill overlap, Aaa is older
        let assignment = ranker.select(&fx.organization.id, &tags(&["Go"])).await.unwrap();
        assert_eq!(
            assignment,
            Assignment::SkillMatch {
                developer_id: first_go.id.clone(),
                matching_skills: 1
            }
        );

        // Skill tier still ignores load
        fx.ticket_for(Some(&first_go.id)).await;
        let assignment = ranker.select(&fx.organization.id, &tags(&["Go"])).await.unwrap();
        assert_eq!(assignment.developer_id(), Some(first_go.id.as_str()));

        // Bbb, Ccc and Ddd all have zero tickets; Bbb is the oldest of them
        let assignment = ranker.select(&fx.organization.id, &tags(&["Java"])).await.unwrap();
        assert_eq!(
            assignment,
            Assignment::LeastLoaded {
                developer_id: second_go.id.clone(),
                assigned_tickets: 0
            }
        );
    }
}
