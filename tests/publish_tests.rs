mod common;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::common::{self, APP_ID, Call, FakeApi, FILE_ID, RecordingTransport, VERSION_ID};
    use intunewin_publisher::config::UploadConfig;
    use intunewin_publisher::error::{PublishError, UploadError};
    use intunewin_publisher::upload::{FILE_COMMITTED_TAG, UploadPhase, block_id};
    use intunewin_publisher::{DraftDefaults, Publisher};

    fn publisher(api: &Arc<FakeApi>, transport: &Arc<RecordingTransport>, block_size: usize) -> Publisher {
        common::init_logging();
        let config = UploadConfig {
            block_size,
            ..Default::default()
        };
        Publisher::new(api.clone(), transport.clone(), config).unwrap()
    }

    #[tokio::test]
    async fn test_publish_runs_full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = common::msi_package(&dir, 2500);
        let api = Arc::new(FakeApi::default());
        let transport = Arc::new(RecordingTransport::new());

        let report = publisher(&api, &transport, 1000).publish(&path).await.unwrap();

        assert_eq!(report.app_id, APP_ID);
        assert_eq!(report.content_version_id, VERSION_ID);
        assert_eq!(report.blocks, 3);
        assert_eq!(report.file.id, FILE_ID);
        assert_eq!(report.file.upload_state, FILE_COMMITTED_TAG);

        let calls = api.calls();
        assert_eq!(calls[0], Call::CreateApplication("Contoso Agent".to_string()));
        assert_eq!(calls[1], Call::CreateContentVersion(APP_ID.to_string()));
        assert_eq!(
            calls[2],
            Call::CreateContentFile(
                APP_ID.to_string(),
                VERSION_ID.to_string(),
                "IntunePackage.intunewin".to_string()
            )
        );
        assert_eq!(
            calls.last(),
            Some(&Call::PatchVersion(APP_ID.to_string(), VERSION_ID.to_string()))
        );

        let mut sizes: Vec<usize> = transport.puts().iter().map(|p| p.len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![500, 1000, 1000]);
        assert_eq!(
            transport.commits()[0].1,
            (0..3).map(block_id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_upload_package_into_existing_content_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = common::msi_package(&dir, 10);
        let api = Arc::new(FakeApi::default());
        let transport = Arc::new(RecordingTransport::new());

        let report = publisher(&api, &transport, 1024)
            .upload_package(&path, common::handle())
            .await
            .unwrap();

        assert_eq!(report.phase, UploadPhase::VersionCommitted);
        assert_eq!(report.blocks, 1);
        assert_eq!(api.count(|c| matches!(c, Call::CreateApplication(_))), 0);
    }

    #[tokio::test]
    async fn test_publish_with_empty_payload_fails_after_creation() {
        let dir = tempfile::tempdir().unwrap();
        let path = common::msi_package(&dir, 0);
        let api = Arc::new(FakeApi::default());
        let transport = Arc::new(RecordingTransport::new());

        let err = publisher(&api, &transport, 1024).publish(&path).await.unwrap_err();

        assert!(matches!(err, PublishError::Upload(UploadError::EmptyPayload)), "{err}");
        assert!(!err.is_recoverable());
        assert!(transport.puts().is_empty());
    }

    #[tokio::test]
    async fn test_custom_draft_defaults_reach_the_backend() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = "<ApplicationInfo><Name>Fabrikam Tool</Name><FileName>IntunePackage.intunewin</FileName><SetupFile>setup.exe</SetupFile></ApplicationInfo>";
        let path = common::write_package(&dir, "IntuneWinPackage/Metadata/Detection.xml", manifest, b"bytes");
        let api = Arc::new(FakeApi::default());
        let transport = Arc::new(RecordingTransport::new());

        let draft = publisher(&api, &transport, 1024)
            .with_draft_defaults(DraftDefaults {
                publisher: "Fabrikam".to_string(),
                ..Default::default()
            })
            .build_descriptor_from_archive(&path)
            .unwrap();

        assert_eq!(draft.display_name, "Fabrikam Tool");
        assert_eq!(draft.publisher, "Fabrikam");
        assert!(draft.msi_information.is_none());
    }

    #[test]
    fn test_invalid_upload_config_is_rejected() {
        let config = UploadConfig {
            block_size: 0,
            ..Default::default()
        };
        let result = Publisher::new(
            Arc::new(FakeApi::default()),
            Arc::new(RecordingTransport::new()),
            config,
        );
        assert!(matches!(result, Err(PublishError::Config(_))));
    }
}
