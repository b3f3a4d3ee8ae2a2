//! Project metadata query.

/// Inner selection fetching all project-level metadata in one call.
pub fn project_selection() -> String {
    r#"
        id
        url
        name
        description
        isArchived
        archivedAt
        isMirror
        mirrorUrl
        isLocked
        lockReason
        diskUsage
        visibility
        forkingAllowed
        hasWikiEnabled
        languages(first: 100) {
          nodes {
            name
          }
        }
        repositoryTopics(first: 100) {
          nodes {
            topic {
              id
              name
            }
          }
        }
        licenseInfo {
          spdxId
        }
        owner {
          ... on User {
            name
            email
            login
            id
            createdAt
          }
          ... on Organization {
            orgName: name
            organizationEmail: email
            orgDesc: description
            orgLogin: login
            orgId: id
            createdAt
          }
        }
    "#
    .to_string()
}
