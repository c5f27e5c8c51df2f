use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing_test::traced_test;

use flock_blob::{
    BlobError, BlobResult, BlobStore, MemoryBlobStore, ObjectNameStrategy, PutOptions,
    UploadCoordinator, UploadOutcome, UploadRequest,
};
use flock_core::MediaReference;

/// Store whose puts fail with a fresh error from `fail`.
struct FailingStore {
    fail: fn() -> BlobError,
    puts: AtomicUsize,
}

impl FailingStore {
    fn new(fail: fn() -> BlobError) -> Arc<Self> {
        Arc::new(Self {
            fail,
            puts: AtomicUsize::new(0),
        })
    }

    fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FailingStore {
    async fn put(&self, _: &str, _: &str, _: Bytes, _: PutOptions) -> BlobResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Err((self.fail)())
    }

    fn public_url(&self, namespace: &str, object_name: &str) -> BlobResult<String> {
        Ok(format!("https://cdn.example.org/{namespace}/{object_name}"))
    }

    async fn remove(&self, _: &str, _: &[String]) -> BlobResult<()> {
        Ok(())
    }
}

/// Store that accepts puts but hands back relative URLs.
struct RelativeUrlStore;

#[async_trait]
impl BlobStore for RelativeUrlStore {
    async fn put(&self, _: &str, _: &str, _: Bytes, _: PutOptions) -> BlobResult<()> {
        Ok(())
    }

    fn public_url(&self, namespace: &str, object_name: &str) -> BlobResult<String> {
        Ok(format!("/{namespace}/{object_name}"))
    }

    async fn remove(&self, _: &str, _: &[String]) -> BlobResult<()> {
        Ok(())
    }
}

struct FixedName(&'static str);

impl ObjectNameStrategy for FixedName {
    fn object_name(&self, _file_name: &str, _extension: Option<&str>) -> String {
        self.0.to_string()
    }
}

fn png_request(namespace: &str) -> UploadRequest {
    UploadRequest::new(
        b"\x89PNG\r\n\x1a\nfake-image".to_vec(),
        "Sunday Choir.PNG",
        "image/png",
        namespace,
    )
}

fn assert_single_variant(outcome: &UploadOutcome) {
    match outcome.media() {
        Some(MediaReference::RemoteUrl { url }) => assert!(url.starts_with("http")),
        Some(MediaReference::InlineData { base64, .. }) => assert!(!base64.is_empty()),
        None => panic!("expected a media reference, got {outcome:?}"),
    }
}

#[tokio::test]
async fn stored_upload_resolves_to_its_public_url() {
    let store = Arc::new(MemoryBlobStore::new("https://cms.example.org/").with_namespace("gallery"));
    let uploads = UploadCoordinator::with_shared_store(store.clone());

    let outcome = uploads.upload(png_request("gallery")).await;

    assert_single_variant(&outcome);
    let UploadOutcome::Stored { media, namespace, object_name } = &outcome else {
        panic!("expected a stored upload, got {outcome:?}");
    };
    assert_eq!(namespace, "gallery");
    assert!(object_name.ends_with(".png"));
    assert_eq!(
        media.url().unwrap(),
        format!("https://cms.example.org/storage/v1/object/public/gallery/{object_name}")
    );
    assert_eq!(
        store.get("gallery", object_name).unwrap(),
        Bytes::from_static(b"\x89PNG\r\n\x1a\nfake-image")
    );
    assert_eq!(store.content_type("gallery", object_name).as_deref(), Some("image/png"));
}

#[tokio::test]
async fn network_error_inlines_the_exact_bytes() {
    let store = FailingStore::new(|| BlobError::unavailable("connection reset by peer"));
    let uploads = UploadCoordinator::with_shared_store(store.clone());
    let request = png_request("gallery");
    let original = request.file_bytes().clone();

    let outcome = uploads.upload(request).await;

    assert_single_variant(&outcome);
    let UploadOutcome::Inlined { media, cause, stranded_object } = &outcome else {
        panic!("expected inline fallback, got {outcome:?}");
    };
    assert_eq!(media.mime_type(), Some("image/png"));
    assert_eq!(media.decode_inline().unwrap(), original.to_vec());
    assert!(cause.contains("connection reset"));
    assert!(stranded_object.is_none());
    assert_eq!(store.puts(), 1);
}

#[tokio::test]
async fn missing_namespace_falls_back_after_one_attempt() {
    let store = Arc::new(MemoryBlobStore::new("https://cms.example.org"));
    let uploads = UploadCoordinator::with_shared_store(store.clone());

    let outcome = uploads.upload(png_request("rosters")).await;

    assert!(outcome.is_inlined());
    assert!(outcome.object_name().is_none());
    assert_eq!(store.put_attempts(), 1);
}

#[tokio::test]
async fn permission_error_falls_back() {
    let store = FailingStore::new(|| BlobError::permission_denied("new row violates row-level security policy"));
    let uploads = UploadCoordinator::with_shared_store(store.clone());

    let outcome = uploads.upload(png_request("team-photos")).await;

    assert!(outcome.is_inlined());
    assert_eq!(store.puts(), 1);
}

#[tokio::test]
async fn name_collision_falls_back_instead_of_overwriting() {
    let store = Arc::new(MemoryBlobStore::new("https://cms.example.org").with_namespace("gallery"));
    let uploads = UploadCoordinator::with_shared_store(store.clone()).with_name_strategy(FixedName("same.png"));

    let first = uploads.upload(png_request("gallery")).await;
    let second = uploads
        .upload(UploadRequest::new(b"other".to_vec(), "b.png", "image/png", "gallery"))
        .await;

    assert!(matches!(first, UploadOutcome::Stored { .. }));
    assert!(second.is_inlined());
    assert!(second.stranded_object().is_none());
    assert_eq!(
        store.get("gallery", "same.png").unwrap(),
        Bytes::from_static(b"\x89PNG\r\n\x1a\nfake-image")
    );
}

#[tokio::test]
async fn relative_public_url_is_treated_as_a_failed_upload() {
    let uploads = UploadCoordinator::new(RelativeUrlStore).with_name_strategy(FixedName("choir.png"));

    let outcome = uploads.upload(png_request("gallery")).await;

    assert!(outcome.is_inlined());
    assert_eq!(outcome.stranded_object(), Some("choir.png"));
    assert!(outcome.object_name().is_none());
}

#[tokio::test]
async fn mime_parameters_survive_the_inline_fallback() {
    let store = FailingStore::new(|| BlobError::unavailable("offline"));
    let uploads = UploadCoordinator::with_shared_store(store);
    let csv = b"name,role\nAma,Deacon\n".to_vec();
    let request = UploadRequest::new(csv.clone(), "roster.csv", "text/csv; charset=utf-8", "rosters");

    let outcome = uploads.upload(request).await;

    let Some(media) = outcome.media() else {
        panic!("expected inline fallback, got {outcome:?}");
    };
    assert!(outcome.is_inlined());
    assert_eq!(media.mime_type(), Some("text/csv; charset=utf-8"));
    assert_eq!(media.decode_inline().unwrap(), csv);
    assert_eq!(MediaReference::parse(&media.to_uri()).unwrap(), *media);
}

#[tokio::test]
async fn unusable_mime_type_inlines_as_octet_stream() {
    let store = FailingStore::new(|| BlobError::unavailable("offline"));
    let uploads = UploadCoordinator::with_shared_store(store);
    let request = UploadRequest::new(b"%PDF-1.7".to_vec(), "roster.pdf", "pdf", "rosters");

    let outcome = uploads.upload(request).await;

    let UploadOutcome::Inlined { media, cause, .. } = &outcome else {
        panic!("expected inline fallback, got {outcome:?}");
    };
    assert_eq!(media.mime_type(), Some("application/octet-stream"));
    assert_eq!(media.decode_inline().unwrap(), b"%PDF-1.7".to_vec());
    assert!(cause.contains("offline"));
}

#[tokio::test]
async fn oversized_inline_fallback_yields_the_failure_sentinel() {
    let store = FailingStore::new(|| BlobError::unavailable("offline"));
    let uploads = UploadCoordinator::with_shared_store(store).with_max_inline_bytes(8);

    let outcome = uploads.upload(png_request("gallery")).await;

    assert!(outcome.is_failed());
    assert!(outcome.media().is_none());
    let UploadOutcome::Failed { reason, .. } = outcome else { unreachable!() };
    assert!(reason.contains("offline"));
}

#[tokio::test]
async fn concurrent_uploads_decide_their_fallback_independently() {
    let store = Arc::new(MemoryBlobStore::new("https://cms.example.org").with_namespace("gallery"));
    let uploads = UploadCoordinator::with_shared_store(store.clone());

    let (a, b, c) = tokio::join!(
        uploads.upload(png_request("gallery")),
        uploads.upload(png_request("missing-bucket")),
        uploads.upload(png_request("gallery")),
    );

    assert!(matches!(a, UploadOutcome::Stored { .. }));
    assert!(b.is_inlined());
    assert!(matches!(c, UploadOutcome::Stored { .. }));
    assert_ne!(a.object_name(), c.object_name());
    assert_eq!(store.object_names("gallery").len(), 2);
}

#[tokio::test]
async fn outage_and_recovery() {
    let store = Arc::new(MemoryBlobStore::new("https://cms.example.org").with_namespace("gallery"));
    let uploads = UploadCoordinator::with_shared_store(store.clone());

    store.set_offline(true);
    assert!(uploads.upload(png_request("gallery")).await.is_inlined());

    store.set_offline(false);
    assert!(matches!(
        uploads.upload(png_request("gallery")).await,
        UploadOutcome::Stored { .. }
    ));
}

#[traced_test]
#[tokio::test]
async fn fallback_is_logged() {
    let store = FailingStore::new(|| BlobError::unavailable("dns lookup failed"));
    let uploads = UploadCoordinator::with_shared_store(store);

    uploads.upload(png_request("gallery")).await;

    assert!(logs_contain("upload failed, inlining file instead"));
    assert!(logs_contain("dns lookup failed"));
    assert!(logs_contain("TransportError"));
}

#[traced_test]
#[tokio::test]
async fn unusable_public_url_is_logged() {
    let uploads = UploadCoordinator::new(RelativeUrlStore).with_name_strategy(FixedName("choir.png"));

    uploads.upload(png_request("gallery")).await;

    assert!(logs_contain("stored object has no usable public url"));
    assert!(logs_contain("choir.png"));
}
