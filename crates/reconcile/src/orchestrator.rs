//! Run orchestration - one session, one principal snapshot, every group

use crate::confirm::ConfirmationController;
use crate::context::{KeySource, Reporter};
use crate::directory::Directory;
use crate::error::RunError;
use crate::processor::GroupProcessor;
use crate::types::{Group, PrincipalSet, ProcessOptions, RunSummary, Scope};
use log::{debug, info, warn};

/// Everything a run needs besides its collaborators
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Bind identity
    pub bind_dn: String,
    /// Bind secret
    pub bind_secret: String,
    /// Base of both searches
    pub base_dn: String,
    /// Filter selecting every existing principal
    pub principal_filter: String,
    /// Filter selecting the groups to clean
    pub group_filter: String,
    /// Fail the run instead of degrading when the principal search fails
    pub strict_principals: bool,
    /// Per-group options
    pub process: ProcessOptions,
}

/// Attribute requested from principal entries; only the DN is used
const NO_ATTRIBUTES: &str = "1.1";

/// Connect, authenticate, snapshot the principals and clean every group
///
/// Groups are processed in the order the directory returns them, and the
/// confirmation mode chosen for one group carries over to the next.
pub fn run<D, K, R>(
    directory: &mut D,
    keys: &mut K,
    reporter: &mut R,
    settings: &RunSettings,
) -> Result<RunSummary, RunError>
where
    D: Directory + ?Sized,
    K: KeySource + ?Sized,
    R: Reporter + ?Sized,
{
    directory.connect_and_secure()?;
    directory.bind(&settings.bind_dn, &settings.bind_secret)?;
    debug!("Bound as {}", settings.bind_dn);

    let mut summary = RunSummary::default();
    let principals = load_principals(directory, reporter, settings)?;
    if principals.is_placeholder_only() {
        warn!("No principals known, every real member will be treated as stale");
        summary.principals_degraded = true;
    }
    let groups = load_groups(directory, reporter, settings);

    let mut controller = ConfirmationController::new();
    let mut processor = GroupProcessor::new(
        &mut *directory,
        &mut *keys,
        &mut *reporter,
        &settings.process,
    );

    for group in &groups {
        let report = processor.process(group, &principals, &mut controller)?;
        summary.add_outcome(report.outcome);
        summary.members_removed += report.removed;
    }

    info!(
        "Examined {} groups, removed {} members",
        summary.total(),
        summary.members_removed
    );
    reporter.on_run_complete(&summary);
    Ok(summary)
}

/// Build the principal snapshot, degrading to the placeholder on failure
fn load_principals<D, R>(
    directory: &mut D,
    reporter: &mut R,
    settings: &RunSettings,
) -> Result<PrincipalSet, RunError>
where
    D: Directory + ?Sized,
    R: Reporter + ?Sized,
{
    match directory.search(
        &settings.base_dn,
        &settings.principal_filter,
        Scope::Subtree,
        &[NO_ATTRIBUTES],
    ) {
        Ok(entries) => {
            reporter.on_principals_loaded(entries.len());
            Ok(PrincipalSet::from_identities(entries.iter().map(|e| &e.dn)))
        }
        Err(err) if settings.strict_principals => {
            reporter.on_principal_search_failed(&err, false);
            Err(RunError::PrincipalSearch(err))
        }
        Err(err) => {
            // Every real member will look stale from here on
            warn!("Principal search failed, continuing with placeholder only: {err}");
            reporter.on_principal_search_failed(&err, true);
            Ok(PrincipalSet::new())
        }
    }
}

fn load_groups<D, R>(directory: &mut D, reporter: &mut R, settings: &RunSettings) -> Vec<Group>
where
    D: Directory + ?Sized,
    R: Reporter + ?Sized,
{
    let attrs = &settings.process.attributes;
    match directory.search(
        &settings.base_dn,
        &settings.group_filter,
        Scope::Subtree,
        &attrs.projection(),
    ) {
        Ok(entries) => {
            reporter.on_groups_loaded(entries.len());
            entries.iter().map(|e| Group::from_entry(e, attrs)).collect()
        }
        Err(err) => {
            warn!("Group search failed: {err}");
            reporter.on_group_search_failed(&err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{ConfirmationMode, Decision};
    use crate::error::ConnectionError;
    use crate::testing::{FakeDirectory, RecordingReporter, ScriptedKeys, SearchCall};
    use crate::types::{AttributeChange, Outcome, PLACEHOLDER_MEMBER};

    fn settings() -> RunSettings {
        RunSettings {
            bind_dn: "cn=admin,dc=example,dc=org".into(),
            bind_secret: "secret".into(),
            base_dn: "dc=example,dc=org".into(),
            principal_filter: "(objectClass=person)".into(),
            group_filter: "(objectClass=groupOfNames)".into(),
            strict_principals: false,
            process: ProcessOptions::default(),
        }
    }

    fn run_with(
        directory: &mut FakeDirectory,
        keys: &str,
        settings: &RunSettings,
    ) -> (Result<RunSummary, RunError>, RecordingReporter, ScriptedKeys) {
        let mut keys = ScriptedKeys::new(keys);
        let mut reporter = RecordingReporter::default();
        let result = run(directory, &mut keys, &mut reporter, settings);
        (result, reporter, keys)
    }

    #[test]
    fn test_yes_to_all_stops_prompting() {
        let mut directory = FakeDirectory::new()
            .with_principals(&["uid=alice"])
            .with_group("cn=empty", &["uid=stale1", "uid=stale2"])
            .with_group("cn=mixed", &["uid=alice", "uid=stale3"])
            .with_group("cn=last", &["uid=stale4"]);

        let (result, reporter, keys) = run_with(&mut directory, "a", &settings());
        let summary = result.unwrap();

        assert_eq!(reporter.prompts, 1);
        assert!(keys.is_exhausted());
        assert_eq!(summary.applied, 3);
        assert_eq!(summary.members_removed, 4);

        let dns: Vec<_> = directory.calls.iter().map(|c| c.dn.as_str()).collect();
        assert_eq!(dns, vec!["cn=empty", "cn=empty", "cn=mixed", "cn=last", "cn=last"]);
        assert!(matches!(
            &directory.calls[0].changes[0],
            AttributeChange::Add { values, .. } if values == &[PLACEHOLDER_MEMBER.to_string()]
        ));
        assert_eq!(
            reporter.decisions.last(),
            Some(&(
                "cn=last".to_string(),
                Decision::Apply,
                ConfirmationMode::AutoApprove
            ))
        );
    }

    #[test]
    fn test_no_to_all_skips_the_rest() {
        let mut directory = FakeDirectory::new()
            .with_principals(&["uid=alice"])
            .with_group("cn=a", &["uid=alice", "uid=gone"])
            .with_group("cn=b", &["uid=gone"]);

        let (result, reporter, _) = run_with(&mut directory, "q", &settings());
        let summary = result.unwrap();

        assert_eq!(reporter.prompts, 1);
        assert_eq!(summary.skipped, 2);
        assert!(directory.calls.is_empty());
    }

    #[test]
    fn test_clean_groups_do_not_prompt() {
        let mut directory = FakeDirectory::new()
            .with_principals(&["uid=alice", "uid=bob"])
            .with_group("cn=a", &["uid=Alice"])
            .with_group("cn=b", &["uid=bob", "uid=gone"])
            .with_group("cn=c", &["UID=BOB"]);

        let (result, reporter, keys) = run_with(&mut directory, "n", &settings());
        let summary = result.unwrap();

        assert_eq!(reporter.prompts, 1);
        assert!(keys.is_exhausted());
        assert_eq!(summary.no_action, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(reporter.clean, vec!["cn=a", "cn=c"]);
    }

    #[test]
    fn test_groups_processed_in_directory_order() {
        let mut directory = FakeDirectory::new()
            .with_group("cn=zeta", &["uid=x"])
            .with_group("cn=alpha", &["uid=y"]);

        let (_, reporter, _) = run_with(&mut directory, "yy", &settings());

        let order: Vec<_> = reporter.outcomes.iter().map(|(dn, _)| dn.as_str()).collect();
        assert_eq!(order, vec!["cn=zeta", "cn=alpha"]);
    }

    #[test]
    fn test_searches_request_subtree_with_projection() {
        let mut directory = FakeDirectory::new()
            .with_principals(&["uid=alice"])
            .with_group("cn=devs", &["uid=alice"]);

        let (result, _, _) = run_with(&mut directory, "", &settings());
        result.unwrap();

        assert_eq!(
            directory.searches,
            vec![
                SearchCall {
                    base: "dc=example,dc=org".into(),
                    filter: "(objectClass=person)".into(),
                    scope: Scope::Subtree,
                    attributes: vec!["1.1".into()],
                },
                SearchCall {
                    base: "dc=example,dc=org".into(),
                    filter: "(objectClass=groupOfNames)".into(),
                    scope: Scope::Subtree,
                    attributes: vec!["cn".into(), "description".into(), "member".into()],
                },
            ]
        );
    }

    #[test]
    fn test_group_search_uses_configured_attributes() {
        let mut directory = FakeDirectory::new().with_principals(&["uid=alice"]);
        let mut settings = settings();
        settings.process.attributes.member = "uniqueMember".into();
        settings.process.attributes.label = "displayName".into();

        let (result, _, _) = run_with(&mut directory, "", &settings);
        result.unwrap();

        assert_eq!(
            directory.searches[1].attributes,
            vec!["displayName", "description", "uniqueMember"]
        );
    }

    #[test]
    fn test_empty_principal_search_marks_degraded() {
        let mut directory = FakeDirectory::new().with_group("cn=devs", &["uid=alice"]);

        let (result, reporter, _) = run_with(&mut directory, "n", &settings());
        let summary = result.unwrap();

        assert!(summary.principals_degraded);
        assert!(reporter.principal_failures.is_empty());
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_found_principals_are_not_degraded() {
        let mut directory = FakeDirectory::new()
            .with_principals(&["uid=alice"])
            .with_group("cn=devs", &["uid=alice"]);

        let (result, _, _) = run_with(&mut directory, "", &settings());

        assert!(!result.unwrap().principals_degraded);
    }

    #[test]
    fn test_principal_search_failure_degrades() {
        let mut directory = FakeDirectory::new()
            .with_principals(&["uid=alice"])
            .with_group("cn=devs", &["uid=alice", "uid=bob"]);
        directory.fail_principal_search = true;

        let (result, reporter, _) = run_with(&mut directory, "n", &settings());
        let summary = result.unwrap();

        assert!(summary.principals_degraded);
        assert_eq!(reporter.principal_failures, vec![true]);
        assert_eq!(
            reporter.stale,
            vec![(
                "cn=devs".to_string(),
                vec!["uid=alice".to_string(), "uid=bob".to_string()]
            )]
        );
    }

    #[test]
    fn test_principal_search_failure_strict() {
        let mut directory = FakeDirectory::new().with_group("cn=devs", &["uid=alice"]);
        directory.fail_principal_search = true;
        let mut settings = settings();
        settings.strict_principals = true;

        let (result, reporter, _) = run_with(&mut directory, "", &settings);

        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert_eq!(reporter.principal_failures, vec![false]);
        assert!(reporter.outcomes.is_empty());
    }

    #[test]
    fn test_group_search_failure_is_not_fatal() {
        let mut directory = FakeDirectory::new().with_principals(&["uid=alice"]);
        directory.fail_group_search = true;

        let (result, reporter, _) = run_with(&mut directory, "", &settings());
        let summary = result.unwrap();

        assert!(reporter.group_search_failed);
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_write_failures_do_not_abort_run() {
        let mut directory = FakeDirectory::new()
            .with_group("cn=a", &["uid=gone"])
            .with_group("cn=b", &["uid=gone"]);
        // Placeholder add on cn=a is rejected, cn=b goes through
        directory.modify_codes.push_back(65);

        let (result, _, _) = run_with(&mut directory, "a", &settings());
        let summary = result.unwrap();

        assert_eq!(summary.applied_with_errors, 1);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.members_removed, 1);
    }

    #[test]
    fn test_connection_failure_is_fatal() {
        let mut directory = FakeDirectory::new().with_group("cn=a", &["uid=gone"]);
        directory.connect_error = Some(|| ConnectionError::Timeout {
            url: "ldap://ldap.example.org".into(),
            secs: 10,
        });

        let (result, reporter, _) = run_with(&mut directory, "", &settings());

        assert_eq!(result.unwrap_err().exit_code(), 1);
        assert!(!directory.connected);
        assert!(!directory.bound);
        assert!(reporter.outcomes.is_empty());
    }

    #[test]
    fn test_bind_failure_is_fatal() {
        let mut directory = FakeDirectory::new().with_group("cn=a", &["uid=gone"]);
        directory.reject_bind = true;

        let (result, _, _) = run_with(&mut directory, "", &settings());

        assert_eq!(result.unwrap_err().exit_code(), 2);
        assert!(directory.calls.is_empty());
    }

    #[test]
    fn test_cancel_aborts_but_keeps_earlier_writes() {
        let mut directory = FakeDirectory::new()
            .with_group("cn=a", &["uid=gone"])
            .with_group("cn=b", &["uid=gone"]);
        let mut keys = ScriptedKeys::new("y").then_cancel();
        let mut reporter = RecordingReporter::default();

        let result = run(&mut directory, &mut keys, &mut reporter, &settings());

        assert!(matches!(result, Err(RunError::Cancelled)));
        assert_eq!(directory.calls.len(), 2);
        assert!(directory.calls.iter().all(|c| c.dn == "cn=a"));
        assert_eq!(reporter.outcomes, vec![("cn=a".to_string(), Outcome::Applied)]);
        assert!(reporter.summary.is_none());
    }

    #[test]
    fn test_dry_run_counts_without_writing() {
        let mut directory = FakeDirectory::new()
            .with_principals(&["uid=alice"])
            .with_group("cn=a", &["uid=alice", "uid=gone"])
            .with_group("cn=b", &["uid=alice"]);
        let mut settings = settings();
        settings.process.dry_run = true;

        let (result, reporter, _) = run_with(&mut directory, "", &settings);
        let summary = result.unwrap();

        assert_eq!(summary.would_apply, 1);
        assert_eq!(summary.no_action, 1);
        assert_eq!(reporter.prompts, 0);
        assert!(directory.calls.is_empty());
        assert_eq!(reporter.summary, Some(summary));
    }
}
