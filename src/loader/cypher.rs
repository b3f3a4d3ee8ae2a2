//! Cypher query generation from the graph schema tables.

use strum::IntoEnumIterator;

use crate::graph::data_type::{PropertyType, cypher_projection};
use crate::graph::{NodeKind, RelationshipKind};

/// Rows per load transaction.
pub const TRANSACTION_ROWS: usize = 300;

/// Link verbs recognized by the reference-extraction pass.
pub const LINK_VERBS: &str = "fix|close|closes|closed|fixes|fixed|resolve|resolves|resolved";

/// Key indexes for every node kind plus datetime indexes for every node
/// and relationship kind.
pub fn index_queries() -> Vec<String> {
    let mut queries = Vec::new();
    for kind in NodeKind::iter() {
        queries.push(format!(
            "CREATE INDEX {kind}_indices IF NOT EXISTS FOR (n:{kind}) ON (n.{key})",
            key = kind.key_name()
        ));
        for (name, property_type) in kind.properties() {
            if *property_type == PropertyType::Datetime {
                queries.push(format!(
                    "CREATE INDEX {kind}_{name}_indices IF NOT EXISTS FOR (n:{kind}) ON (n.{name})"
                ));
            }
        }
    }
    for kind in RelationshipKind::iter() {
        for (name, property_type) in kind.properties() {
            if *property_type == PropertyType::Datetime {
                queries.push(format!(
                    "CREATE INDEX {kind}_{name}_indices IF NOT EXISTS FOR ()-[r:{kind}]-() ON (r.{name})"
                ));
            }
        }
    }
    queries
}

/// Projection list `x: CASE row.x ... END, y: ...` for a node kind.
fn node_projection(kind: NodeKind) -> String {
    kind.properties()
        .iter()
        .map(|(name, property_type)| cypher_projection(name, *property_type))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Batched CSV node load. Shareable kinds MERGE so they deduplicate
/// across repositories; everything else CREATEs.
pub fn node_load_query(kind: NodeKind, file: &str) -> String {
    let operator = if kind.shareable() { "MERGE" } else { "CREATE" };
    format!(
        r#"
            LOAD CSV WITH HEADERS FROM '{file}' AS row
            CALL{{
                WITH row
                {operator} (:{kind} {{{projection}}})
            }} IN TRANSACTIONS OF {TRANSACTION_ROWS} ROWS
            "#,
        projection = node_projection(kind),
    )
}

/// Batched CSV relationship load. Source and destination are matched by
/// their kinds' key attributes; rows whose endpoints are missing simply
/// create no edge.
pub fn relationship_load_query(kind: RelationshipKind, file: &str) -> String {
    let (source, destination) = kind.endpoints();
    let match_clause = format!(
        "MATCH (s:{source} {{{source_key}: row.source_id}})\n                MATCH (d:{destination} {{{destination_key}: row.destination_id}})",
        source_key = source.key_name(),
        destination_key = destination.key_name(),
    );
    if kind.has_properties() {
        let projection = kind
            .properties()
            .iter()
            .map(|(name, property_type)| cypher_projection(name, *property_type))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"
            LOAD CSV WITH HEADERS FROM '{file}' AS row
            CALL{{
                WITH row
                {match_clause}
                CREATE (s)-[:{kind} {{{projection}}}]->(d)
            }} IN TRANSACTIONS OF {TRANSACTION_ROWS} ROWS
            "#,
        )
    } else {
        format!(
            r#"
            LOAD CSV WITH HEADERS FROM '{file}' AS row
            CALL{{
                WITH row
                {match_clause}
                WITH s, d
                CREATE (s)-[:{kind}]->(d)
            }} IN TRANSACTIONS OF {TRANSACTION_ROWS} ROWS
            "#,
        )
    }
}

/// Reference-extraction pass over every text-carrying node of the
/// project: `fixes #42` creates a LINKS_ISSUE or LINKS_PULL_REQUEST
/// edge with `action: "fixes"`, a bare `#42` one with `NO_ACTION`.
pub fn link_references_query(project_id: &str) -> String {
    let pattern = format!(r".*(?i)(?:({LINK_VERBS})? #(\d+)).*");
    format!(
        r#"
        MATCH (p:Project {{id: '{project_id}'}})
        CALL apoc.path.subgraphAll(p,{{
        labelFilter: '-Topic|-File|-Language|-Dependency|-User|-License|-Branch'
        }})
        YIELD nodes as nodes_list
        UNWIND nodes_list as n
        UNWIND apoc.text.regexGroups(n.message, '{pattern}') +
        apoc.text.regexGroups(n.title, '{pattern}') +
        apoc.text.regexGroups(n.body, '{pattern}') as g
        WITH n, g
        WHERE size(g) > 0
        CALL {{
            WITH n, g
            MATCH (:Project {{id: '{project_id}'}})-[:HAS_PULL_REQUEST_MONTH]->(pprm:ProjectPullRequestMonth),
            (pprm)<-[:PULL_REQUEST_IN_MONTH]-(pr:PullRequest)
            WHERE pr.number = toInteger(g[2])
            CREATE (n)-[:LINKS_PULL_REQUEST {{action: CASE g[1] WHEN null THEN "NO_ACTION" ELSE toString(g[1]) END}}]->(pr)
        }}
        CALL {{
            WITH n, g
            MATCH (:Project {{id: '{project_id}'}})-[:HAS_ISSUE_MONTH]->(pim:ProjectIssueMonth),
            (pim)<-[:ISSUE_IN_MONTH]-(i:Issue)
            WHERE i.number = toInteger(g[2])
            CREATE (n)-[:LINKS_ISSUE {{action: CASE g[1] WHEN null THEN "NO_ACTION" ELSE toString(g[1]) END}}]->(i)
        }}
        "#,
    )
}

/// Join each merged pull request's PullRequestFile rows to the File the
/// merge commit produced at the same path.
pub fn link_merge_files_query(project_id: &str) -> String {
    format!(
        r#"
        MATCH (p:Project {{id: '{project_id}'}})-[:HAS_PULL_REQUEST_MONTH]->(prm:ProjectPullRequestMonth)<-[:PULL_REQUEST_IN_MONTH]-(pr:PullRequest)-[:PROPOSES_CHANGE]->(prf:PullRequestFile),
        (pr)-[:HAS_EVENT]->(pre:PullRequestEvent {{__typename: 'MergedEvent'}})-[:LINKS_COMMIT]->(c:Commit)-[:PERFORMS]->(fc:FileAction)-[:AFTER_ACTION]->(f:File)
        WHERE f.path = prf.path
        CREATE (prf)-[:FILE_AFTER_MERGE]->(f)
        "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn every_node_kind_gets_a_key_index() {
        let queries = index_queries();
        for kind in NodeKind::iter() {
            let key = kind.key_name();
            assert!(
                queries
                    .iter()
                    .any(|q| q.contains(&format!("FOR (n:{kind}) ON (n.{key})"))),
                "missing key index for {kind}"
            );
        }
        // datetime relationship property example
        assert!(
            queries
                .iter()
                .any(|q| q.contains("()-[r:AUTHOR_OF]-() ON (r.authoredAt)"))
        );
    }

    #[test]
    fn shareable_kinds_merge_and_private_kinds_create() {
        let user = node_load_query(NodeKind::User, "file:///x_User.csv");
        assert!(user.contains("MERGE (:User"));
        let commit = node_load_query(NodeKind::Commit, "file:///x_Commit.csv");
        assert!(commit.contains("CREATE (:Commit"));
        assert!(commit.contains("IN TRANSACTIONS OF 300 ROWS"));
    }

    #[test]
    fn relationship_load_matches_declared_endpoints() {
        let query =
            relationship_load_query(RelationshipKind::AuthorOfCommit, "file:///x_AUTHOR_OF.csv");
        assert!(query.contains("MATCH (s:User {id: row.source_id})"));
        assert!(query.contains("MATCH (d:Commit {hash: row.destination_id})"));
        assert!(query.contains("CREATE (s)-[:AUTHOR_OF {"));

        let bare = relationship_load_query(RelationshipKind::ParentOf, "file:///x_PARENT_OF.csv");
        assert!(bare.contains("CREATE (s)-[:PARENT_OF]->(d)"));
    }

    /// The extraction regex itself, checked against the behavior the
    /// pass expects from the database's regex engine.
    #[test]
    fn link_pattern_captures_verb_and_number() {
        let pattern = format!(r"(?i)(?:({LINK_VERBS})? #(\d+))");
        let regex = Regex::new(&pattern).unwrap();

        let captures = regex.captures("this fixes #42 for good").unwrap();
        assert_eq!(captures.get(1).unwrap().as_str(), "fixes");
        assert_eq!(captures.get(2).unwrap().as_str(), "42");

        let bare = regex.captures("see #7").unwrap();
        assert!(bare.get(1).is_none());
        assert_eq!(bare.get(2).unwrap().as_str(), "7");

        assert!(regex.captures("no reference here").is_none());
    }

    #[test]
    fn merge_file_pass_walks_the_merge_event_chain() {
        let query = link_merge_files_query("P_1");
        assert!(query.contains("__typename: 'MergedEvent'"));
        assert!(query.contains("[:LINKS_COMMIT]"));
        assert!(query.contains("[:PERFORMS]"));
        assert!(query.contains("[:AFTER_ACTION]"));
        assert!(query.contains("FILE_AFTER_MERGE"));
        assert!(query.contains("f.path = prf.path"));
    }
}
