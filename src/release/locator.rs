use tracing::{debug, info, instrument};

use super::ReleaseError;
use crate::pr::{NewPullRequest, PullRequest, PullRequestService};

/// The release pull request and whether this run opened it.
#[derive(Debug, Clone)]
pub struct Located {
    pub pull_request: PullRequest,
    pub created: bool,
}

/// Find the release pull request, opening a draft one when none exists.
///
/// An explicit number is fetched directly, with no search and no creation.
/// Otherwise the most recently created open PR from `head` into `base` is
/// used, and a new draft titled `new_title` is opened if there is none.
#[instrument(skip(service))]
pub async fn locate_or_create(
    service: &dyn PullRequestService,
    base: &str,
    head: &str,
    explicit_number: Option<u64>,
    new_title: &str,
) -> Result<Located, ReleaseError> {
    if let Some(number) = explicit_number {
        debug!(number, "using configured release pull request");
        let pull_request = service.get_pull_request(number).await?;
        return Ok(Located {
            pull_request,
            created: false,
        });
    }

    let open = service.list_open_pull_requests(base, head).await?;
    debug!(count = open.len(), "open release candidates");
    if let Some(latest) = open.into_iter().next() {
        return Ok(Located {
            pull_request: latest,
            created: false,
        });
    }

    info!("creating new release pull request: {} -> {}", head, base);
    let request = NewPullRequest {
        title: new_title.to_string(),
        body: String::new(),
        base: base.to_string(),
        head: head.to_string(),
        draft: true,
    };
    let pull_request = service.create_pull_request(&request).await?;
    Ok(Located {
        pull_request,
        created: true,
    })
}

/// Attach `label` to the pull request. No-op when no label is configured.
#[instrument(skip(service, pr), fields(pr = pr.number))]
pub async fn apply_label(
    service: &dyn PullRequestService,
    pr: &PullRequest,
    label: Option<&str>,
) -> Result<(), ReleaseError> {
    let Some(label) = label.filter(|l| !l.trim().is_empty()) else {
        return Ok(());
    };

    info!(label, "adding label");
    service.add_label(pr.number, label).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::ServiceError;
    use crate::release::tests::{pull_request, Call, RecordingService};

    #[tokio::test]
    async fn test_explicit_number_skips_search() {
        let service = RecordingService::default().with_pull(pull_request(12, "[release]", None));
        let located = locate_or_create(&service, "release", "master", Some(12), "[release]")
            .await
            .unwrap();

        assert_eq!(located.pull_request.number, 12);
        assert!(!located.created);
        assert_eq!(service.calls(), vec![Call::Get(12)]);
    }

    #[tokio::test]
    async fn test_explicit_number_not_found() {
        let service = RecordingService::default();
        let err = locate_or_create(&service, "release", "master", Some(3), "[release]")
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseError::Service(ServiceError::NotFound(3))));
    }

    #[tokio::test]
    async fn test_returns_most_recent_open_pr() {
        let mut service = RecordingService::default();
        service.open = vec![
            pull_request(20, "newest", None),
            pull_request(10, "older", None),
        ];
        let located = locate_or_create(&service, "release", "master", None, "[release]")
            .await
            .unwrap();

        assert_eq!(located.pull_request.number, 20);
        assert!(!located.created);
        assert!(!service.calls().iter().any(|c| matches!(c, Call::Create(_))));
    }

    #[tokio::test]
    async fn test_creates_single_draft_when_none_open() {
        let mut service = RecordingService::default();
        service.created_number = 31;
        let located = locate_or_create(&service, "release", "master", None, "[リリース]")
            .await
            .unwrap();

        assert!(located.created);
        assert_eq!(located.pull_request.number, 31);
        assert_eq!(located.pull_request.title, "[リリース]");
        assert_eq!(
            service.calls(),
            vec![
                Call::ListOpen {
                    base: "release".to_string(),
                    head: "master".to_string()
                },
                Call::Create(NewPullRequest {
                    title: "[リリース]".to_string(),
                    body: String::new(),
                    base: "release".to_string(),
                    head: "master".to_string(),
                    draft: true,
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_apply_label_without_label_is_noop() {
        let service = RecordingService::default();
        let pr = pull_request(5, "[release]", None);
        apply_label(&service, &pr, None).await.unwrap();
        apply_label(&service, &pr, Some("")).await.unwrap();
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_apply_label() {
        let service = RecordingService::default();
        let pr = pull_request(5, "[release]", None);
        apply_label(&service, &pr, Some("release")).await.unwrap();
        assert_eq!(service.calls(), vec![Call::AddLabel(5, "release".to_string())]);
    }
}
