//! Issuer-link traversal.

use std::collections::HashSet;

use log::debug;

use super::types::CertificateNode;

/// Orders the certificates a server presented into an issuer chain.
///
/// Starting at the leaf (`presented[0]`), each step follows the issuer link to
/// a presented certificate whose subject equals the current issuer. The walk
/// stops at a self-signed node, when no issuer is presented, when the next
/// node was already visited, or after `max_depth` nodes.
pub fn walk_chain(presented: &[CertificateNode], max_depth: usize) -> Vec<CertificateNode> {
    let mut chain = Vec::new();
    let mut visited: HashSet<usize> = HashSet::new();
    let mut current = match presented.first() {
        Some(_) => 0,
        None => return chain,
    };

    while chain.len() < max_depth {
        visited.insert(current);
        let node = &presented[current];
        chain.push(node.clone());

        if node.is_self_signed() {
            debug!("Chain walk stopped at self-signed {}", node.subject);
            break;
        }

        let next = presented
            .iter()
            .enumerate()
            .find(|(i, candidate)| *i != current && candidate.subject == node.issuer)
            .map(|(i, _)| i);
        match next {
            Some(i) if visited.contains(&i) => {
                debug!("Chain walk stopped at revisited {}", presented[i].subject);
                break;
            }
            Some(i) => current = i,
            None => break,
        }
    }

    if chain.len() == max_depth {
        debug!("Chain walk stopped at depth {}", max_depth);
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn node(subject: &str, issuer: &str) -> CertificateNode {
        CertificateNode {
            subject: subject.to_string(),
            issuer: issuer.to_string(),
            sans: vec![],
            not_before: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            serial: "01".to_string(),
            issuer_provider: None,
        }
    }

    fn subjects(chain: &[CertificateNode]) -> Vec<&str> {
        chain.iter().map(|n| n.subject.as_str()).collect()
    }

    #[test]
    fn test_walk_full_chain_to_root() {
        let presented = vec![
            node("CN=leaf", "CN=intermediate"),
            node("CN=root", "CN=root"),
            node("CN=intermediate", "CN=root"),
        ];
        let chain = walk_chain(&presented, 10);
        assert_eq!(subjects(&chain), vec!["CN=leaf", "CN=intermediate", "CN=root"]);
    }

    #[test]
    fn test_walk_stops_without_presented_issuer() {
        let presented = vec![node("CN=leaf", "CN=intermediate")];
        assert_eq!(walk_chain(&presented, 10).len(), 1);
    }

    #[test]
    fn test_self_reference_yields_single_node() {
        let presented = vec![node("CN=self", "CN=self")];
        let chain = walk_chain(&presented, 10);
        assert_eq!(subjects(&chain), vec!["CN=self"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let presented = vec![node("CN=a", "CN=b"), node("CN=b", "CN=a")];
        let chain = walk_chain(&presented, 10);
        assert_eq!(subjects(&chain), vec!["CN=a", "CN=b"]);
    }

    #[test]
    fn test_depth_bound() {
        let presented: Vec<CertificateNode> = (0..15)
            .map(|i| node(&format!("CN={i}"), &format!("CN={}", i + 1)))
            .collect();
        assert_eq!(walk_chain(&presented, 10).len(), 10);
    }

    #[test]
    fn test_empty_presentation() {
        assert!(walk_chain(&[], 10).is_empty());
    }
}
